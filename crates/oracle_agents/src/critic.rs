//! Critique stage: an adversarial approve/reject judgement of a simulation.

use std::sync::Arc;

use oracle_core::types::{CriticVerdict, FinancialReport, SimulationResults};
use tracing::{debug, info};

use crate::error::StageError;
use crate::parse::parse_critic_verdict;
use crate::prompts::{critic_prompt, CRITIC_SYSTEM};
use crate::provider::{ReasoningProvider, ReasoningRequest};
use crate::retry::RetryPolicy;

/// Critique stage bound to one reasoning provider.
#[derive(Clone)]
pub struct CritiqueStage {
    provider: Arc<dyn ReasoningProvider>,
    retry: RetryPolicy,
}

impl CritiqueStage {
    /// Create the stage.
    pub fn new(provider: Arc<dyn ReasoningProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// Ask the provider whether the counterfactual is plausible.
    ///
    /// A response that does not parse counts as one failed attempt.
    ///
    /// # Errors
    ///
    /// - [`StageError::RetriesExhausted`] when every attempt timed out, failed
    ///   transiently or returned malformed output
    /// - a non-retryable [`StageError::Provider`] immediately
    pub async fn critique(
        &self,
        baseline: &FinancialReport,
        simulation: &SimulationResults,
    ) -> Result<CriticVerdict, StageError> {
        let request =
            ReasoningRequest::new(CRITIC_SYSTEM, critic_prompt(baseline, simulation)).expect_json();
        let provider = self.provider.as_ref();

        let verdict = self
            .retry
            .run("critique", |attempt| {
                let request = &request;
                async move {
                    let text = provider.complete(request).await?;
                    debug!(provider = provider.name(), attempt, chars = text.len(), "critique response received");
                    parse_critic_verdict(&text)
                }
            })
            .await?;

        info!(
            provider = provider.name(),
            verdict = verdict.verdict.as_str(),
            findings = verdict.comparative_analysis.len(),
            "critique complete"
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::scripted::ScriptedProvider;
    use oracle_core::types::Verdict;
    use std::time::Duration;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            multiplier: 2.0,
            attempt_timeout: Duration::from_millis(200),
        }
    }

    fn simulation() -> SimulationResults {
        SimulationResults {
            median_npv: 1.0,
            median_revenue: 1.0,
            median_ebitda: 1.0,
            median_fcf: 1.0,
            p10_npv: 1.0,
            p90_npv: 1.0,
            revenue_growth_dist: vec![0.0],
            cash_flow_dist: vec![1.0],
            npv_dist: vec![1.0],
            assumption_log: Vec::new(),
            trials: 1,
            seed: None,
        }
    }

    #[tokio::test]
    async fn test_malformed_then_valid() {
        let provider = Arc::new(ScriptedProvider::new(
            "critic",
            vec![
                Ok("I think it is fine".to_string()),
                Ok(r#"{"verdict":"approve","comparative_analysis":["ok"]}"#.to_string()),
            ],
        ));
        let stage = CritiqueStage::new(provider.clone(), policy(3));
        let verdict = stage.critique(&FinancialReport::sample(), &simulation()).await.unwrap();
        assert_eq!(verdict.verdict, Verdict::Approve);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries() {
        let provider = Arc::new(ScriptedProvider::always_err(ProviderError::Transport("reset".into())));
        let stage = CritiqueStage::new(provider.clone(), policy(3));
        let err = stage.critique(&FinancialReport::sample(), &simulation()).await.unwrap_err();
        assert!(matches!(err, StageError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_request_asks_for_json() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"verdict":"reject","comparative_analysis":["too rosy"]}"#,
        ));
        let stage = CritiqueStage::new(provider.clone(), policy(1));
        stage.critique(&FinancialReport::sample(), &simulation()).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_response);
        // no override: the provider's configured temperature applies
        assert_eq!(requests[0].temperature, None);
    }
}
