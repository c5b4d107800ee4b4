//! Monte Carlo simulation configuration.
//!
//! Every tunable of a run (trial count, seed, DCF horizon, growth and rate
//! assumptions, sampling spreads) lives in [`SimulationConfig`] and is passed
//! explicitly per invocation.

use super::error::ConfigError;

/// Maximum number of trials allowed.
pub const MAX_TRIALS: usize = 1_000_000;

/// Maximum explicit DCF horizon in years.
pub const MAX_HORIZON_YEARS: u32 = 50;

/// Default number of trials.
pub const DEFAULT_TRIALS: usize = 10_000;

/// Monte Carlo simulation configuration.
///
/// Immutable configuration. Use [`SimulationConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use oracle_sim::SimulationConfig;
///
/// let config = SimulationConfig::builder()
///     .trials(5_000)
///     .seed(42)
///     .horizon_years(10)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.trials(), 5_000);
/// assert_eq!(config.seed(), Some(42));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    trials: usize,
    seed: Option<u64>,
    horizon_years: u32,
    terminal_growth: f64,
    base_discount_rate: f64,
    revenue_growth_std: f64,
    opex_std: f64,
    discount_rate_std: f64,
    default_tax_rate: f64,
    min_rate_spread: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            horizon_years: 5,
            terminal_growth: 0.02,
            base_discount_rate: 0.08,
            revenue_growth_std: 0.02,
            opex_std: 0.01,
            discount_rate_std: 0.005,
            default_tax_rate: 0.25,
            min_rate_spread: 0.01,
        }
    }
}

impl SimulationConfig {
    /// Creates a new configuration builder seeded with the defaults.
    #[inline]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Returns the number of trials.
    #[inline]
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Returns the optional seed for reproducibility.
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns the explicit projection horizon in years.
    #[inline]
    pub fn horizon_years(&self) -> u32 {
        self.horizon_years
    }

    /// Returns the perpetual growth rate used for the terminal value.
    #[inline]
    pub fn terminal_growth(&self) -> f64 {
        self.terminal_growth
    }

    /// Returns the base discount rate (WACC) before deltas.
    #[inline]
    pub fn base_discount_rate(&self) -> f64 {
        self.base_discount_rate
    }

    /// Returns the standard deviation of the sampled revenue growth.
    #[inline]
    pub fn revenue_growth_std(&self) -> f64 {
        self.revenue_growth_std
    }

    /// Returns the standard deviation of the sampled OpEx delta.
    #[inline]
    pub fn opex_std(&self) -> f64 {
        self.opex_std
    }

    /// Returns the standard deviation of the sampled discount rate.
    #[inline]
    pub fn discount_rate_std(&self) -> f64 {
        self.discount_rate_std
    }

    /// Returns the tax rate used when the report carries none.
    #[inline]
    pub fn default_tax_rate(&self) -> f64 {
        self.default_tax_rate
    }

    /// Returns the minimum spread of the terminal-value rate over `terminal_growth`.
    #[inline]
    pub fn min_rate_spread(&self) -> f64 {
        self.min_rate_spread
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `trials` is 0 or greater than 1,000,000
    /// - `horizon_years` is 0 or greater than 50
    /// - any rate is not finite, a standard deviation is negative, the
    ///   default tax rate is outside [0, 1) or the rate spread is not positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 || self.trials > MAX_TRIALS {
            return Err(ConfigError::InvalidTrialCount(self.trials));
        }
        if self.horizon_years == 0 || self.horizon_years > MAX_HORIZON_YEARS {
            return Err(ConfigError::InvalidHorizon(self.horizon_years));
        }
        for (name, value) in [
            ("terminal_growth", self.terminal_growth),
            ("base_discount_rate", self.base_discount_rate),
        ] {
            if !value.is_finite() {
                return Err(invalid(name, "must be finite"));
            }
        }
        for (name, value) in [
            ("revenue_growth_std", self.revenue_growth_std),
            ("opex_std", self.opex_std),
            ("discount_rate_std", self.discount_rate_std),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(name, "must be a non-negative number"));
            }
        }
        if !(0.0..1.0).contains(&self.default_tax_rate) {
            return Err(invalid("default_tax_rate", "must be in [0, 1)"));
        }
        if !self.min_rate_spread.is_finite() || self.min_rate_spread <= 0.0 {
            return Err(invalid("min_rate_spread", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        value: value.to_string(),
    }
}

/// Builder for [`SimulationConfig`].
///
/// Unset fields keep their defaults; validation happens at build time.
#[derive(Clone, Debug, Default)]
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    /// Sets the number of trials in [1, 1_000_000].
    #[inline]
    pub fn trials(mut self, trials: usize) -> Self {
        self.config.trials = trials;
        self
    }

    /// Sets the seed for reproducibility.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Sets the explicit horizon in [1, 50] years.
    #[inline]
    pub fn horizon_years(mut self, years: u32) -> Self {
        self.config.horizon_years = years;
        self
    }

    /// Sets the terminal growth rate.
    #[inline]
    pub fn terminal_growth(mut self, rate: f64) -> Self {
        self.config.terminal_growth = rate;
        self
    }

    /// Sets the base discount rate.
    #[inline]
    pub fn base_discount_rate(mut self, rate: f64) -> Self {
        self.config.base_discount_rate = rate;
        self
    }

    /// Sets the revenue growth standard deviation.
    #[inline]
    pub fn revenue_growth_std(mut self, std: f64) -> Self {
        self.config.revenue_growth_std = std;
        self
    }

    /// Sets the OpEx delta standard deviation.
    #[inline]
    pub fn opex_std(mut self, std: f64) -> Self {
        self.config.opex_std = std;
        self
    }

    /// Sets the discount rate standard deviation.
    #[inline]
    pub fn discount_rate_std(mut self, std: f64) -> Self {
        self.config.discount_rate_std = std;
        self
    }

    /// Sets the fallback tax rate.
    #[inline]
    pub fn default_tax_rate(mut self, rate: f64) -> Self {
        self.config.default_tax_rate = rate;
        self
    }

    /// Sets the terminal-value rate floor spread.
    #[inline]
    pub fn min_rate_spread(mut self, spread: f64) -> Self {
        self.config.min_rate_spread = spread;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if [`SimulationConfig::validate`] fails.
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
