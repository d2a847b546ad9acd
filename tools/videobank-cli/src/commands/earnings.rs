//! Payout estimate for a duration.

use videobank_capture_engine::format_elapsed;
use videobank_common::config::AppConfig;
use videobank_review::{format_payout, EarningsEstimator};

pub fn run(config: &AppConfig, seconds: u64) -> anyhow::Result<()> {
    let estimate = EarningsEstimator::from(&config.earnings).estimate(seconds);
    println!(
        "{} of footage: {} (rate {}/s, minimum {})",
        format_elapsed(seconds),
        format_payout(estimate),
        format_payout(config.earnings.rate_per_second),
        format_payout(config.earnings.minimum_payout)
    );
    Ok(())
}
