//! Progress bands of the three pipeline stages.
//!
//! | stage      | band      |
//! |------------|-----------|
//! | Simulation | 0 - 40    |
//! | Critique   | 40 - 70   |
//! | Debate     | 70 - 90   |
//! | finalise   | 90 - 100  |
//!
//! Sub-progress reported inside a stage stays strictly below the band end;
//! only the stage commit reaches it.

/// Progress after the simulation commits.
pub const SIMULATION_DONE: u8 = 40;

/// Progress after the critique commits.
pub const CRITIQUE_DONE: u8 = 70;

/// Progress after the debate commits.
pub const DEBATE_DONE: u8 = 90;

/// Progress of a COMPLETED scenario.
pub const COMPLETE: u8 = 100;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Monte Carlo simulation.
    Simulation,
    /// Adversarial critique.
    Critique,
    /// Optimist vs Skeptic debate.
    Debate,
}

impl Stage {
    /// Lower-case stage name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Simulation => "simulation",
            Stage::Critique => "critique",
            Stage::Debate => "debate",
        }
    }

    /// `(start, end)` of the stage's band.
    pub fn band(&self) -> (u8, u8) {
        match self {
            Stage::Simulation => (0, SIMULATION_DONE),
            Stage::Critique => (SIMULATION_DONE, CRITIQUE_DONE),
            Stage::Debate => (CRITIQUE_DONE, DEBATE_DONE),
        }
    }

    /// Progress for a completed `fraction` of this stage, never reaching the band end.
    pub fn within(&self, fraction: f64) -> u8 {
        let (start, end) = self.band();
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let span = f64::from(end - start - 1);
        start + (fraction * span).floor() as u8
    }
}
