//! Stage output contracts: Simulation, Critique and Debate.

use serde::{Deserialize, Serialize};

// =========================================================================
// Simulation
// =========================================================================

/// Aggregated Monte Carlo output for one scenario.
///
/// The three distributions always have length `trials`; the medians are the
/// statistical medians of the corresponding per-trial sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResults {
    /// Median of `npv_dist`.
    pub median_npv: f64,
    /// Median projected revenue across trials.
    pub median_revenue: f64,
    /// Median projected EBITDA across trials.
    pub median_ebitda: f64,
    /// Median first-year free cash flow (median of `cash_flow_dist`).
    pub median_fcf: f64,
    /// 10th percentile of `npv_dist`.
    pub p10_npv: f64,
    /// 90th percentile of `npv_dist`.
    pub p90_npv: f64,
    /// Sampled revenue growth rate per trial (decimal).
    pub revenue_growth_dist: Vec<f64>,
    /// First-year free cash flow per trial.
    pub cash_flow_dist: Vec<f64>,
    /// NPV per trial.
    pub npv_dist: Vec<f64>,
    /// Fixed parameters of the run, in order.
    pub assumption_log: Vec<String>,
    /// Number of trials.
    pub trials: usize,
    /// Seed for deterministic replay; `None` marks a non-reproducible run.
    pub seed: Option<u64>,
}

// =========================================================================
// Critique
// =========================================================================

/// Approve/reject judgement of the critique stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The counterfactual is plausible.
    Approve,
    /// The counterfactual is not supported by the baseline.
    Reject,
}

impl Verdict {
    /// Lower-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approve => "approve",
            Verdict::Reject => "reject",
        }
    }
}

/// Output of the critique stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticVerdict {
    /// Approve or reject.
    pub verdict: Verdict,
    /// Ordered findings comparing the counterfactual with the baseline.
    pub comparative_analysis: Vec<String>,
}

// =========================================================================
// Debate
// =========================================================================

/// The two opposing analyst roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalystRole {
    /// Argues for the upside of the counterfactual.
    Optimist,
    /// Challenges the counterfactual's assumptions.
    Skeptic,
}

impl AnalystRole {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            AnalystRole::Optimist => "Optimist",
            AnalystRole::Skeptic => "Skeptic",
        }
    }
}

/// Investment recommendation stated at the end of every debate argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    /// Buy.
    Buy,
    /// Hold.
    Hold,
    /// Sell.
    Sell,
}

impl Recommendation {
    /// Title-case name as used in verdict strings.
    pub fn name(&self) -> &'static str {
        match self {
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
        }
    }

    /// Parse a case-insensitive keyword (`buy`, `HOLD`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Recommendation::Buy),
            "hold" => Some(Recommendation::Hold),
            "sell" => Some(Recommendation::Sell),
            _ => None,
        }
    }
}

/// One debate turn, attributable to exactly one analyst role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum DebateRound {
    /// A turn by the optimist.
    Optimist {
        /// 1-based round index.
        round: u32,
        /// Argument text.
        argument: String,
        /// Recommendation stated by the argument.
        recommendation: Recommendation,
    },
    /// A turn by the skeptic.
    Skeptic {
        /// 1-based round index.
        round: u32,
        /// Argument text.
        argument: String,
        /// Recommendation stated by the argument.
        recommendation: Recommendation,
    },
}

impl DebateRound {
    /// Build a turn for `role`.
    pub fn new(role: AnalystRole, round: u32, argument: String, recommendation: Recommendation) -> Self {
        match role {
            AnalystRole::Optimist => DebateRound::Optimist {
                round,
                argument,
                recommendation,
            },
            AnalystRole::Skeptic => DebateRound::Skeptic {
                round,
                argument,
                recommendation,
            },
        }
    }

    /// The role that produced this turn.
    pub fn role(&self) -> AnalystRole {
        match self {
            DebateRound::Optimist { .. } => AnalystRole::Optimist,
            DebateRound::Skeptic { .. } => AnalystRole::Skeptic,
        }
    }

    /// 1-based round index.
    pub fn round(&self) -> u32 {
        match self {
            DebateRound::Optimist { round, .. } | DebateRound::Skeptic { round, .. } => *round,
        }
    }

    /// Argument text.
    pub fn argument(&self) -> &str {
        match self {
            DebateRound::Optimist { argument, .. } | DebateRound::Skeptic { argument, .. } => argument,
        }
    }

    /// Stated recommendation.
    pub fn recommendation(&self) -> Recommendation {
        match self {
            DebateRound::Optimist { recommendation, .. }
            | DebateRound::Skeptic { recommendation, .. } => *recommendation,
        }
    }
}

/// Categorical confidence derived from the degree of agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    /// Both roles converged on the same recommendation.
    High,
    /// A strict majority of turns shared one recommendation.
    Medium,
    /// No recommendation held a majority.
    Low,
}

impl ConfidenceLevel {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

/// Output of the debate stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateResult {
    /// Confidence derived from agreement.
    pub confidence_level: ConfidenceLevel,
    /// Ordered transcript, one record per turn.
    pub rounds: Vec<DebateRound>,
    /// Consensus or majority position (`Buy`, `Cautious Sell`, `Hold`, ...).
    pub final_verdict: String,
    /// Whether both roles converged before the round limit.
    pub converged: bool,
    /// Round at which convergence happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence_round: Option<u32>,
    /// Plain-text synthesis of the debate outcome.
    #[serde(default)]
    pub consensus_summary: String,
    /// Points both analysts conceded or shared.
    #[serde(default)]
    pub key_agreements: Vec<String>,
    /// Points still contested in the last two rounds.
    #[serde(default)]
    pub key_disagreements: Vec<String>,
}

impl DebateResult {
    /// Number of distinct rounds in the transcript.
    pub fn total_rounds(&self) -> u32 {
        self.rounds.iter().map(DebateRound::round).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debate_round_is_tagged_by_role() {
        let turn = DebateRound::new(AnalystRole::Skeptic, 2, "Too rosy.".to_string(), Recommendation::Sell);
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "skeptic");
        assert_eq!(json["round"], 2);
        assert_eq!(json["recommendation"], "sell");

        let back: DebateRound = serde_json::from_value(json).unwrap();
        assert_eq!(back.role(), AnalystRole::Skeptic);
        assert_eq!(back.argument(), "Too rosy.");
    }

    #[test]
    fn test_recommendation_parse() {
        assert_eq!(Recommendation::parse(" BUY "), Some(Recommendation::Buy));
        assert_eq!(Recommendation::parse("hold"), Some(Recommendation::Hold));
        assert_eq!(Recommendation::parse("strong buy"), None);
    }

    #[test]
    fn test_verdict_wire_names() {
        assert_eq!(serde_json::to_string(&Verdict::Approve).unwrap(), "\"approve\"");
        assert_eq!(serde_json::to_string(&ConfidenceLevel::Medium).unwrap(), "\"Medium\"");
    }

    #[test]
    fn test_total_rounds() {
        let result = DebateResult {
            confidence_level: ConfidenceLevel::Low,
            rounds: vec![
                DebateRound::new(AnalystRole::Optimist, 1, "a".into(), Recommendation::Buy),
                DebateRound::new(AnalystRole::Skeptic, 1, "b".into(), Recommendation::Sell),
                DebateRound::new(AnalystRole::Optimist, 2, "c".into(), Recommendation::Buy),
            ],
            final_verdict: "Hold".into(),
            converged: false,
            convergence_round: None,
            consensus_summary: String::new(),
            key_agreements: Vec::new(),
            key_disagreements: Vec::new(),
        };
        assert_eq!(result.total_rounds(), 2);
    }
}
