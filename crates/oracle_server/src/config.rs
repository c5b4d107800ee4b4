//! Server configuration management
//!
//! Handles loading configuration from TOML files, `ORACLE_*` environment
//! variables and CLI arguments, in that order of increasing precedence.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use oracle_agents::{RetryPolicy, MAX_ROUNDS_CAP};
use oracle_pipeline::{PipelineConfig, DEFAULT_MAX_DELTA_BPS};
use oracle_sim::{SimulationConfig, DEFAULT_TRIALS};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Log levels supported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// `[simulation]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub trials: usize,
    /// Fixed seed; omit for non-reproducible runs
    pub seed: Option<u64>,
    pub horizon_years: u32,
    pub terminal_growth: f64,
    pub base_discount_rate: f64,
    pub revenue_growth_std: f64,
    pub opex_std: f64,
    pub discount_rate_std: f64,
    pub default_tax_rate: f64,
    pub min_rate_spread: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        let defaults = SimulationConfig::default();
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            horizon_years: defaults.horizon_years(),
            terminal_growth: defaults.terminal_growth(),
            base_discount_rate: defaults.base_discount_rate(),
            revenue_growth_std: defaults.revenue_growth_std(),
            opex_std: defaults.opex_std(),
            discount_rate_std: defaults.discount_rate_std(),
            default_tax_rate: defaults.default_tax_rate(),
            min_rate_spread: defaults.min_rate_spread(),
        }
    }
}

impl SimulationSettings {
    /// Build the validated simulator configuration
    pub fn to_config(&self) -> Result<SimulationConfig, oracle_sim::ConfigError> {
        let builder = SimulationConfig::builder()
            .trials(self.trials)
            .horizon_years(self.horizon_years)
            .terminal_growth(self.terminal_growth)
            .base_discount_rate(self.base_discount_rate)
            .revenue_growth_std(self.revenue_growth_std)
            .opex_std(self.opex_std)
            .discount_rate_std(self.discount_rate_std)
            .default_tax_rate(self.default_tax_rate)
            .min_rate_spread(self.min_rate_spread);
        let builder = match self.seed {
            Some(seed) => builder.seed(seed),
            None => builder,
        };
        builder.build()
    }
}

/// `[retry]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
    pub attempt_timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            multiplier: policy.multiplier,
            attempt_timeout_ms: policy.attempt_timeout.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    /// Retry policy shared by the critique and debate stages
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
        }
    }
}

/// `[debate]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DebateSettings {
    pub max_rounds: u32,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            max_rounds: oracle_agents::DEFAULT_MAX_ROUNDS,
        }
    }
}

/// One `[providers.*]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderSettings {
    /// OpenAI-compatible API base URL
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl ProviderSettings {
    fn gemini(temperature: f32) -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    fn deepseek(temperature: f32) -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            temperature,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    fn check(&self, role: &str, errors: &mut Vec<String>) {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            errors.push(format!(
                "providers.{role}.base_url '{}' must start with http:// or https://",
                self.base_url
            ));
        }
        if self.model.trim().is_empty() {
            errors.push(format!("providers.{role}.model cannot be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push(format!(
                "providers.{role}.temperature {} must be within [0, 2]",
                self.temperature
            ));
        }
        if self.request_timeout_secs == 0 {
            errors.push(format!("providers.{role}.request_timeout_secs must be positive"));
        }
    }
}

/// `[providers]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub critic: ProviderSettings,
    pub optimist: ProviderSettings,
    pub skeptic: ProviderSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            critic: ProviderSettings::gemini(0.2),
            optimist: ProviderSettings::gemini(0.7),
            skeptic: ProviderSettings::deepseek(0.7),
        }
    }
}

/// Server configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Log level
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// Absolute bound on scenario deltas (bps)
    pub max_delta_bps: i32,
    /// Wall-clock limit of one scenario run in seconds; 0 disables it
    pub scenario_timeout_secs: u64,
    /// Shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
    pub simulation: SimulationSettings,
    pub retry: RetrySettings,
    pub debate: DebateSettings,
    pub providers: ProvidersConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: LogLevel::Info,
            max_delta_bps: DEFAULT_MAX_DELTA_BPS,
            scenario_timeout_secs: 900,
            shutdown_timeout_secs: 30,
            simulation: SimulationSettings::default(),
            retry: RetrySettings::default(),
            debate: DebateSettings::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvError(format!("{key}='{value}' is not a valid number")))
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))
    }

    /// Apply `ORACLE_*` overrides found through `lookup`
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(host) = lookup("ORACLE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("ORACLE_PORT") {
            self.port = parse_env("ORACLE_PORT", &port)?;
        }
        if let Some(level) = lookup("ORACLE_LOG_LEVEL") {
            self.log_level = LogLevel::from_str(&level)?;
        }
        if let Some(bound) = lookup("ORACLE_MAX_DELTA_BPS") {
            self.max_delta_bps = parse_env("ORACLE_MAX_DELTA_BPS", &bound)?;
        }
        if let Some(timeout) = lookup("ORACLE_SCENARIO_TIMEOUT_SECS") {
            self.scenario_timeout_secs = parse_env("ORACLE_SCENARIO_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(trials) = lookup("ORACLE_SIM_TRIALS") {
            self.simulation.trials = parse_env("ORACLE_SIM_TRIALS", &trials)?;
        }
        if let Some(seed) = lookup("ORACLE_SIM_SEED") {
            self.simulation.seed = Some(parse_env("ORACLE_SIM_SEED", &seed)?);
        }
        if let Some(rounds) = lookup("ORACLE_DEBATE_MAX_ROUNDS") {
            self.debate.max_rounds = parse_env("ORACLE_DEBATE_MAX_ROUNDS", &rounds)?;
        }
        if let Some(attempts) = lookup("ORACLE_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_env("ORACLE_RETRY_MAX_ATTEMPTS", &attempts)?;
        }
        Ok(self)
    }

    /// Validate the configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("port must be between 1 and 65535".to_string());
        }
        if self.max_delta_bps <= 0 {
            errors.push(format!("max_delta_bps must be positive, got {}", self.max_delta_bps));
        }
        if let Err(e) = self.simulation.to_config() {
            errors.push(format!("simulation: {}", e));
        }
        if let Err(e) = self.retry.policy().validate() {
            errors.push(format!("retry: {}", e));
        }
        if !(1..=MAX_ROUNDS_CAP).contains(&self.debate.max_rounds) {
            errors.push(format!(
                "debate.max_rounds {} must be between 1 and {}",
                self.debate.max_rounds, MAX_ROUNDS_CAP
            ));
        }
        self.providers.critic.check("critic", &mut errors);
        self.providers.optimist.check("optimist", &mut errors);
        self.providers.skeptic.check("skeptic", &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pipeline tunables derived from this configuration
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let simulation = self
            .simulation
            .to_config()
            .map_err(|e| ConfigError::Validation(vec![format!("simulation: {}", e)]))?;
        Ok(PipelineConfig {
            simulation,
            max_delta_bps: self.max_delta_bps,
            scenario_timeout: (self.scenario_timeout_secs > 0)
                .then(|| Duration::from_secs(self.scenario_timeout_secs)),
        })
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = LogLevel::from_str(log_level)?;
        }
        if let Some(trials) = cli.trials {
            self.simulation.trials = trials;
        }
        if let Some(seed) = cli.seed {
            self.simulation.seed = Some(seed);
        }
        if let Some(rounds) = cli.debate_rounds {
            self.debate.max_rounds = rounds;
        }
        Ok(())
    }
}

/// CLI arguments structure
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Host address override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
    /// Log level override
    pub log_level: Option<String>,
    /// Trial count override
    pub trials: Option<usize>,
    /// Seed override
    pub seed: Option<u64>,
    /// Debate round limit override
    pub debate_rounds: Option<u32>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<ServerConfig, ConfigError> {
    build_config_with(cli, |key| std::env::var(key).ok())
}

/// [`build_config`] with an explicit environment lookup
pub fn build_config_with(
    cli: &CliArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ServerConfig, ConfigError> {
    let config = match &cli.config_file {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    let mut config = config.with_env(lookup)?;
    config.merge_with_cli(cli)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.max_delta_bps, 10_000);
        assert_eq!(config.simulation.trials, 10_000);
        assert_eq!(config.simulation.seed, None);
        assert_eq!(config.debate.max_rounds, 4);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.providers.skeptic.model, "deepseek-chat");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Warn").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("verbose").is_err());
    }

    #[test]
    fn test_toml_deserialization() {
        let config = ServerConfig::from_toml(
            r#"
            host = "127.0.0.1"
            port = 3000
            log_level = "debug"
            max_delta_bps = 5000
            scenario_timeout_secs = 0

            [simulation]
            trials = 2000
            seed = 42
            horizon_years = 10

            [retry]
            max_attempts = 5
            attempt_timeout_ms = 30000

            [debate]
            max_rounds = 5

            [providers.critic]
            base_url = "http://localhost:11434/v1"
            model = "llama3"
            api_key_env = "LOCAL_KEY"
            temperature = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.socket_addr(), "127.0.0.1:3000");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.simulation.trials, 2000);
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.horizon_years, 10);
        // unspecified keys keep their defaults
        assert_eq!(config.simulation.base_discount_rate, 0.08);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 500);
        assert_eq!(config.debate.max_rounds, 5);
        assert_eq!(config.providers.critic.model, "llama3");
        assert_eq!(config.providers.critic.request_timeout_secs, 60);
        assert_eq!(config.providers.skeptic.api_key_env, "DEEPSEEK_API_KEY");

        let pipeline = config.pipeline_config().unwrap();
        assert_eq!(pipeline.scenario_timeout, None);
        assert_eq!(pipeline.max_delta_bps, 5000);
        assert_eq!(pipeline.simulation.seed(), Some(42));
    }

    #[test]
    fn test_unknown_log_level_in_toml_is_rejected() {
        let err = ServerConfig::from_toml(r#"log_level = "loud""#).unwrap_err();
        assert!(matches!(err, ConfigError::FileError(_)));
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::default()
            .with_env(env(&[
                ("ORACLE_PORT", "9090"),
                ("ORACLE_SIM_SEED", "7"),
                ("ORACLE_SIM_TRIALS", "500"),
                ("ORACLE_DEBATE_MAX_ROUNDS", "2"),
            ]))
            .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.trials, 500);
        assert_eq!(config.debate.max_rounds, 2);

        let err = ServerConfig::default()
            .with_env(env(&[("ORACLE_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("ORACLE_PORT"));
    }

    #[test]
    fn test_precedence_cli_over_env_over_defaults() {
        let cli = CliArgs {
            port: Some(7000),
            log_level: Some("warn".to_string()),
            ..Default::default()
        };
        let config = build_config_with(
            &cli,
            env(&[("ORACLE_PORT", "9090"), ("ORACLE_HOST", "127.0.0.1")]),
        )
        .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_validate_collects_every_error() {
        let mut config = ServerConfig::default();
        config.port = 0;
        config.max_delta_bps = 0;
        config.simulation.trials = 0;
        config.debate.max_rounds = 9;
        config.providers.optimist.base_url = "ftp://nowhere".to_string();

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 5, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("providers.optimist.base_url")));
                assert!(errors.iter().any(|e| e.starts_with("simulation:")));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Invalid configuration: a; b");
        let err = ConfigError::InvalidLogLevel("bad".to_string());
        assert!(err.to_string().contains("Invalid log level"));
    }
}
