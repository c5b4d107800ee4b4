//! Debate stage: a bounded adversarial dialogue between two analyst roles.
//!
//! Round `k` is one Optimist turn followed by one Skeptic turn. Each prompt
//! carries the full transcript so far. The debate stops early when both turns
//! of a round state the same recommendation; otherwise it runs to the round
//! limit and the outcome is derived from the tally of all recommendations:
//!
//! | agreement                 | confidence | final verdict        |
//! |---------------------------|------------|----------------------|
//! | converged in a round      | High       | `Buy`/`Hold`/`Sell`  |
//! | strict majority of turns  | Medium     | `Cautious Buy`/`Cautious Sell` (`Hold` stays `Hold`) |
//! | split                     | Low        | `Hold`               |
//!
//! The transcript is also mined for conceded points (agreements) and for
//! points still raised in the last two rounds (disagreements).

use std::collections::BTreeMap;
use std::sync::Arc;

use oracle_core::types::{
    AnalystRole, ConfidenceLevel, CriticVerdict, DebateResult, DebateRound, FinancialReport,
    Recommendation, SimulationResults,
};
use tracing::{debug, info};

use crate::error::StageError;
use crate::parse::parse_recommendation;
use crate::prompts::{debate_prompt, persona};
use crate::provider::{ReasoningProvider, ReasoningRequest};
use crate::retry::RetryPolicy;

/// Default number of rounds.
pub const DEFAULT_MAX_ROUNDS: u32 = 4;

/// Hard upper bound on rounds.
pub const MAX_ROUNDS_CAP: u32 = 5;

/// Callback receiving `(completed_rounds, max_rounds)` after each round.
pub type RoundProgressFn = dyn Fn(u32, u32) + Send + Sync;

/// Debate stage with one provider per role.
#[derive(Clone)]
pub struct DebateStage {
    optimist: Arc<dyn ReasoningProvider>,
    skeptic: Arc<dyn ReasoningProvider>,
    retry: RetryPolicy,
    max_rounds: u32,
}

impl DebateStage {
    /// Create the stage; `max_rounds` is clamped to `1..=MAX_ROUNDS_CAP`.
    pub fn new(
        optimist: Arc<dyn ReasoningProvider>,
        skeptic: Arc<dyn ReasoningProvider>,
        retry: RetryPolicy,
        max_rounds: u32,
    ) -> Self {
        Self {
            optimist,
            skeptic,
            retry,
            max_rounds: max_rounds.clamp(1, MAX_ROUNDS_CAP),
        }
    }

    /// Effective round limit.
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    fn provider(&self, role: AnalystRole) -> &dyn ReasoningProvider {
        match role {
            AnalystRole::Optimist => self.optimist.as_ref(),
            AnalystRole::Skeptic => self.skeptic.as_ref(),
        }
    }

    /// Run the debate without progress reporting.
    ///
    /// # Errors
    ///
    /// See [`DebateStage::debate_with_progress`].
    pub async fn debate(
        &self,
        baseline: &FinancialReport,
        simulation: &SimulationResults,
        critic_verdict: &CriticVerdict,
    ) -> Result<DebateResult, StageError> {
        self.debate_with_progress(baseline, simulation, critic_verdict, None)
            .await
    }

    /// Run the debate, calling `progress` after every completed round.
    ///
    /// # Errors
    ///
    /// The first turn whose model call fails after retries fails the whole
    /// stage; the partial transcript is discarded.
    pub async fn debate_with_progress(
        &self,
        baseline: &FinancialReport,
        simulation: &SimulationResults,
        critic_verdict: &CriticVerdict,
        progress: Option<&RoundProgressFn>,
    ) -> Result<DebateResult, StageError> {
        let mut transcript: Vec<DebateRound> = Vec::with_capacity(2 * self.max_rounds as usize);
        let mut convergence_round = None;

        for round in 1..=self.max_rounds {
            let mut stated = [Recommendation::Hold; 2];
            for (slot, role) in [AnalystRole::Optimist, AnalystRole::Skeptic].into_iter().enumerate() {
                let prompt = debate_prompt(
                    role,
                    round,
                    self.max_rounds,
                    baseline,
                    simulation,
                    critic_verdict,
                    &transcript,
                );
                let (argument, recommendation) = self.turn(role, round, prompt).await?;
                stated[slot] = recommendation;
                transcript.push(DebateRound::new(role, round, argument, recommendation));
            }

            debug!(
                round,
                optimist = stated[0].name(),
                skeptic = stated[1].name(),
                "debate round complete"
            );
            if let Some(report) = progress {
                report(round, self.max_rounds);
            }
            if stated[0] == stated[1] {
                convergence_round = Some(round);
                break;
            }
        }

        let result = conclude(transcript, convergence_round);
        info!(
            rounds = result.total_rounds(),
            converged = result.converged,
            confidence = result.confidence_level.as_str(),
            verdict = %result.final_verdict,
            "debate complete"
        );
        Ok(result)
    }

    async fn turn(
        &self,
        role: AnalystRole,
        round: u32,
        prompt: String,
    ) -> Result<(String, Recommendation), StageError> {
        let provider = self.provider(role);
        let request = ReasoningRequest::new(persona(role), prompt);
        let label = format!("debate:{}:round{}", role.name().to_lowercase(), round);

        self.retry
            .run(&label, |_| {
                let request = &request;
                async move {
                    let text = provider.complete(request).await?;
                    let recommendation = parse_recommendation(&text)?;
                    Ok((text.trim().to_string(), recommendation))
                }
            })
            .await
    }
}

/// Derive confidence and verdict from a finished transcript.
pub fn conclude(rounds: Vec<DebateRound>, convergence_round: Option<u32>) -> DebateResult {
    let (confidence_level, final_verdict) = match convergence_round {
        Some(round) => {
            let shared = rounds
                .iter()
                .rev()
                .find(|turn| turn.round() == round)
                .map(DebateRound::recommendation)
                .unwrap_or(Recommendation::Hold);
            (ConfidenceLevel::High, shared.name().to_string())
        }
        None => match majority(&rounds) {
            Some(Recommendation::Hold) => (ConfidenceLevel::Medium, Recommendation::Hold.name().to_string()),
            Some(rec) => (ConfidenceLevel::Medium, format!("Cautious {}", rec.name())),
            None => (ConfidenceLevel::Low, Recommendation::Hold.name().to_string()),
        },
    };

    let key_agreements = key_agreements(&rounds);
    let key_disagreements = key_disagreements(&rounds);
    let mut result = DebateResult {
        confidence_level,
        rounds,
        final_verdict,
        converged: convergence_round.is_some(),
        convergence_round,
        consensus_summary: String::new(),
        key_agreements,
        key_disagreements,
    };
    result.consensus_summary = summarize(&result);
    result
}

/// Phrases marking a concession to the other analyst.
const CONCESSION_MARKERS: [&str; 5] = ["i agree", "you're right", "you are right", "fair point", "concede"];

/// Words marking a point that is still contested.
const CONTENTION_MARKERS: [&str; 6] = ["however", "but", "concern", "risk", "disagree", "challenge"];

/// Most agreements kept.
pub const MAX_AGREEMENTS: usize = 5;

/// Most disagreements kept.
pub const MAX_DISAGREEMENTS: usize = 3;

/// Sentences of `text`, trimmed and non-empty.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Whether `sentence` contains `marker`: phrases by substring, single words
/// as a word prefix (`risk` matches `risks`, not `brisk`).
fn mentions(sentence: &str, marker: &str) -> bool {
    let lower = sentence.to_lowercase();
    if marker.contains(' ') || marker.contains('\'') {
        return lower.contains(marker);
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word.starts_with(marker))
}

fn first_marked<'a>(text: &'a str, markers: &[&str]) -> Option<&'a str> {
    sentences(text).find(|sentence| {
        !sentence.to_uppercase().starts_with("RECOMMENDATION")
            && markers.iter().any(|marker| mentions(sentence, marker))
    })
}

fn push_unique(points: &mut Vec<String>, point: String, limit: usize) {
    if points.len() < limit && !points.contains(&point) {
        points.push(point);
    }
}

/// Final turn of each role, if both spoke.
fn final_positions(rounds: &[DebateRound]) -> Option<(&DebateRound, &DebateRound)> {
    let last = |role: AnalystRole| rounds.iter().rev().find(|turn| turn.role() == role);
    Some((last(AnalystRole::Optimist)?, last(AnalystRole::Skeptic)?))
}

/// Shared final position first, then conceded points from any turn.
fn key_agreements(rounds: &[DebateRound]) -> Vec<String> {
    let mut points = Vec::new();
    if let Some((optimist, skeptic)) = final_positions(rounds) {
        if optimist.recommendation() == skeptic.recommendation() {
            points.push(format!(
                "Both analysts recommend {}",
                optimist.recommendation().name()
            ));
        }
    }
    for turn in rounds {
        if let Some(sentence) = first_marked(turn.argument(), &CONCESSION_MARKERS) {
            push_unique(&mut points, sentence.to_string(), MAX_AGREEMENTS);
        }
    }
    points
}

/// Diverging final positions first, then contested points from the last two rounds.
fn key_disagreements(rounds: &[DebateRound]) -> Vec<String> {
    let mut points = Vec::new();
    if let Some((optimist, skeptic)) = final_positions(rounds) {
        if optimist.recommendation() != skeptic.recommendation() {
            points.push(format!(
                "Optimist recommends {} while Skeptic recommends {}",
                optimist.recommendation().name(),
                skeptic.recommendation().name()
            ));
        }
    }
    let last_round = rounds.iter().map(DebateRound::round).max().unwrap_or(0);
    for turn in rounds.iter().filter(|turn| turn.round() + 1 >= last_round) {
        if let Some(sentence) = first_marked(turn.argument(), &CONTENTION_MARKERS) {
            push_unique(&mut points, sentence.to_string(), MAX_DISAGREEMENTS);
        }
    }
    points
}

fn summarize(result: &DebateResult) -> String {
    let mut summary = match result.convergence_round {
        Some(round) => format!(
            "After {} rounds of debate, the analysts reached consensus in round {}.",
            result.total_rounds(),
            round
        ),
        None => format!(
            "After {} rounds of debate, the analysts discussed but did not fully converge.",
            result.total_rounds()
        ),
    };
    if !result.key_agreements.is_empty() {
        summary.push_str("\n\nKey points of agreement:");
        for point in result.key_agreements.iter().take(3) {
            summary.push_str("\n- ");
            summary.push_str(point);
        }
    }
    if !result.key_disagreements.is_empty() {
        summary.push_str("\n\nRemaining concerns:");
        for point in result.key_disagreements.iter().take(2) {
            summary.push_str("\n- ");
            summary.push_str(point);
        }
    }
    summary.push_str(&format!(
        "\n\nFinal assessment: {} ({} confidence)",
        result.final_verdict,
        result.confidence_level.as_str()
    ));
    summary
}

/// Recommendation held by a strict majority of turns, if any.
fn majority(rounds: &[DebateRound]) -> Option<Recommendation> {
    let mut tally: BTreeMap<Recommendation, usize> = BTreeMap::new();
    for turn in rounds {
        *tally.entry(turn.recommendation()).or_default() += 1;
    }
    tally
        .into_iter()
        .find(|(_, count)| count * 2 > rounds.len())
        .map(|(rec, _)| rec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: AnalystRole, round: u32, rec: Recommendation) -> DebateRound {
        DebateRound::new(role, round, format!("RECOMMENDATION: {}", rec.name()), rec)
    }

    #[test]
    fn test_converged_is_high_confidence() {
        let rounds = vec![
            turn(AnalystRole::Optimist, 1, Recommendation::Buy),
            turn(AnalystRole::Skeptic, 1, Recommendation::Sell),
            turn(AnalystRole::Optimist, 2, Recommendation::Hold),
            turn(AnalystRole::Skeptic, 2, Recommendation::Hold),
        ];
        let result = conclude(rounds, Some(2));
        assert_eq!(result.confidence_level, ConfidenceLevel::High);
        assert_eq!(result.final_verdict, "Hold");
        assert!(result.converged);
        assert_eq!(result.convergence_round, Some(2));
    }

    #[test]
    fn test_majority_is_cautious() {
        let rounds = vec![
            turn(AnalystRole::Optimist, 1, Recommendation::Sell),
            turn(AnalystRole::Skeptic, 1, Recommendation::Hold),
            turn(AnalystRole::Optimist, 2, Recommendation::Sell),
            turn(AnalystRole::Skeptic, 2, Recommendation::Buy),
            turn(AnalystRole::Optimist, 3, Recommendation::Sell),
            turn(AnalystRole::Skeptic, 3, Recommendation::Buy),
            turn(AnalystRole::Optimist, 4, Recommendation::Sell),
        ];
        let result = conclude(rounds, None);
        assert_eq!(result.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(result.final_verdict, "Cautious Sell");
        assert!(!result.converged);
    }

    #[test]
    fn test_split_is_low_hold() {
        let rounds = vec![
            turn(AnalystRole::Optimist, 1, Recommendation::Buy),
            turn(AnalystRole::Skeptic, 1, Recommendation::Sell),
            turn(AnalystRole::Optimist, 2, Recommendation::Buy),
            turn(AnalystRole::Skeptic, 2, Recommendation::Sell),
        ];
        let result = conclude(rounds, None);
        assert_eq!(result.confidence_level, ConfidenceLevel::Low);
        assert_eq!(result.final_verdict, "Hold");
        assert_eq!(result.total_rounds(), 2);
    }

    #[test]
    fn test_word_markers_do_not_match_inside_words() {
        assert!(mentions("Execution risks remain", "risk"));
        assert!(!mentions("A brisk start", "risk"));
        assert!(!mentions("Revenue will contribute", "but"));
        assert!(mentions("That is a fair point on margins", "fair point"));
    }

    #[test]
    fn test_summary_reflects_outcome() {
        let rounds = vec![
            turn(AnalystRole::Optimist, 1, Recommendation::Buy),
            turn(AnalystRole::Skeptic, 1, Recommendation::Buy),
        ];
        let result = conclude(rounds, Some(1));
        assert!(result
            .consensus_summary
            .starts_with("After 1 rounds of debate, the analysts reached consensus in round 1."));
        assert!(result.consensus_summary.contains("- Both analysts recommend Buy"));
        assert!(result.consensus_summary.ends_with("Final assessment: Buy (High confidence)"));
        assert!(!result.consensus_summary.contains("Remaining concerns"));
    }

    #[test]
    fn test_round_limit_is_clamped() {
        use crate::scripted::ScriptedProvider;
        let p: Arc<dyn ReasoningProvider> = Arc::new(ScriptedProvider::always("RECOMMENDATION: BUY"));
        assert_eq!(DebateStage::new(p.clone(), p.clone(), RetryPolicy::default(), 9).max_rounds(), 5);
        assert_eq!(DebateStage::new(p.clone(), p, RetryPolicy::default(), 0).max_rounds(), 1);
    }
}
