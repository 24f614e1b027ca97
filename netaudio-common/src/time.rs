//! Timestamp and audio period utilities

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Duration of one audio block of `samples` frames at `sample_rate` Hz
///
/// Returns `Duration::ZERO` for a zero sample rate.
pub fn block_period(samples: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((samples as u64 * 1_000_000_000) / sample_rate as u64)
}
