//! Discounted cash flow valuation with a Gordon Growth terminal value.
//!
//! ```text
//! FCF_t = FCF_1 × (1 + g)^(t−1)                     t = 1..H
//! TV    = FCF_H × (1 + g_term) / (r_tv − g_term),   r_tv = max(r, g_term + spread)
//! NPV   = Σ FCF_t / (1 + r)^t + TV / (1 + r)^H
//! ```
//!
//! The floor on `r_tv` keeps the perpetuity finite when the sampled discount
//! rate approaches the terminal growth rate. Explicit cash flows are always
//! discounted at the sampled rate itself.

/// Valuation assumptions shared by every trial of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcfAssumptions {
    /// Explicit horizon in years (≥ 1).
    pub horizon_years: u32,
    /// Perpetual growth after the horizon.
    pub terminal_growth: f64,
    /// Minimum spread of the terminal-value rate over `terminal_growth`.
    pub min_rate_spread: f64,
}

impl DcfAssumptions {
    /// Rate used in the Gordon denominator.
    #[inline]
    pub fn terminal_rate(&self, discount_rate: f64) -> f64 {
        discount_rate.max(self.terminal_growth + self.min_rate_spread)
    }

    /// Gordon Growth terminal value of the cash flow `fcf_horizon` received in year H.
    #[inline]
    pub fn terminal_value(&self, fcf_horizon: f64, discount_rate: f64) -> f64 {
        let r_tv = self.terminal_rate(discount_rate);
        fcf_horizon * (1.0 + self.terminal_growth) / (r_tv - self.terminal_growth)
    }

    /// NPV of a cash flow path starting at `fcf_year_one` and growing at `growth`.
    ///
    /// `discount_rate` must be positive; callers reject non-positive rates.
    pub fn npv(&self, fcf_year_one: f64, growth: f64, discount_rate: f64) -> f64 {
        let years = self.horizon_years.max(1);
        let mut fcf = fcf_year_one;
        let mut discount = 1.0;
        let mut pv = 0.0;
        for t in 1..=years {
            if t > 1 {
                fcf *= 1.0 + growth;
            }
            discount /= 1.0 + discount_rate;
            pv += fcf * discount;
        }
        pv + self.terminal_value(fcf, discount_rate) * discount
    }
}
