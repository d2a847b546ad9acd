//! Payout estimation from recording duration.

use videobank_common::config::EarningsConfig;

/// Computes the estimated payout shown on the review screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarningsEstimator {
    rate_per_second: f64,
    minimum_payout: f64,
}

impl EarningsEstimator {
    pub fn new(rate_per_second: f64, minimum_payout: f64) -> Self {
        Self {
            rate_per_second,
            minimum_payout,
        }
    }

    /// `max(minimum, round2(duration * rate))`.
    pub fn estimate(&self, duration_secs: u64) -> f64 {
        let raw = round_cents(duration_secs as f64 * self.rate_per_second);
        raw.max(self.minimum_payout)
    }
}

impl Default for EarningsEstimator {
    fn default() -> Self {
        Self::from(&EarningsConfig::default())
    }
}

impl From<&EarningsConfig> for EarningsEstimator {
    fn from(config: &EarningsConfig) -> Self {
        Self::new(config.rate_per_second, config.minimum_payout)
    }
}

/// Estimate with the default rate and floor.
pub fn estimate_earnings(duration_secs: u64) -> f64 {
    EarningsEstimator::default().estimate(duration_secs)
}

/// Round to two decimal places.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `$1.50`
pub fn format_payout(amount: f64) -> String {
    format!("${amount:.2}")
}
