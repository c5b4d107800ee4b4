//! Wiring from [`ServerConfig`] to a running [`ScenarioService`]
//!
//! API keys are read here, once, from the environment variables named in the
//! provider tables and injected into each provider's configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use oracle_agents::{CritiqueStage, DebateStage, HttpReasoningProvider, ProviderConfig};
use oracle_pipeline::ScenarioService;

use crate::config::{ProviderSettings, ServerConfig};

/// Resolve one provider table into a client configuration
pub fn provider_config(
    role: &str,
    settings: &ProviderSettings,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> ProviderConfig {
    let api_key = lookup(&settings.api_key_env).filter(|key| !key.trim().is_empty());
    if api_key.is_none() {
        tracing::warn!(
            role,
            env = %settings.api_key_env,
            "No API key found; requests will be sent unauthenticated"
        );
    }
    ProviderConfig {
        name: role.to_string(),
        base_url: settings.base_url.clone(),
        model: settings.model.clone(),
        api_key,
        temperature: settings.temperature,
        request_timeout: Duration::from_secs(settings.request_timeout_secs),
    }
}

fn http_provider(
    role: &str,
    settings: &ProviderSettings,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> anyhow::Result<Arc<HttpReasoningProvider>> {
    let provider = HttpReasoningProvider::new(provider_config(role, settings, lookup))
        .with_context(|| format!("failed to build the {role} provider"))?;
    Ok(Arc::new(provider))
}

/// Build the scenario service backed by HTTP reasoning providers
pub fn build_service(config: &ServerConfig) -> anyhow::Result<ScenarioService> {
    build_service_with(config, &|key| std::env::var(key).ok())
}

/// [`build_service`] with an explicit environment lookup
pub fn build_service_with(
    config: &ServerConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> anyhow::Result<ScenarioService> {
    let retry = config.retry.policy();
    let providers = &config.providers;

    let critic = CritiqueStage::new(http_provider("critic", &providers.critic, lookup)?, retry.clone());
    let debate = DebateStage::new(
        http_provider("optimist", &providers.optimist, lookup)?,
        http_provider("skeptic", &providers.skeptic, lookup)?,
        retry,
        config.debate.max_rounds,
    );
    let pipeline = config.pipeline_config().context("invalid pipeline configuration")?;

    tracing::info!(
        trials = pipeline.simulation.trials(),
        seed = ?pipeline.simulation.seed(),
        max_rounds = config.debate.max_rounds,
        critic = %providers.critic.model,
        optimist = %providers.optimist.model,
        skeptic = %providers.skeptic.model,
        "Scenario pipeline configured"
    );

    Ok(ScenarioService::new(critic, debate, pipeline))
}
