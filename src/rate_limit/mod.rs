//! Rate limiting infrastructure for generative-AI model calls.
//!
//! Tracks recent calls per model over a trailing 60-second window and puts a
//! model into cooldown once its limit is reached. State is in-memory and
//! lives for the duration of the process.

mod config;
mod model_state;
mod status;
mod tracker;

use std::time::Duration;

pub use config::{
    ModelLimits, RateLimitConfig, DEFAULT_COOLDOWN_PERIOD, DEFAULT_REQUESTS_PER_MINUTE,
    MAX_COOLDOWN_PERIOD, RATE_LIMIT_WINDOW,
};
pub(crate) use config::duration_secs;
pub use model_state::{ceil_secs, RateLimitState};
pub use status::{AdmissionState, RateDecision, RateLimitStatus};
pub use tracker::RateTracker;

/// Parse a Retry-After header value (seconds).
/// Returns duration to wait, or None if header is missing/invalid.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    let value = header_value?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Exponential backoff `base * 2^attempt`, capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Get a delay from an environment variable in milliseconds, with default fallback.
pub fn get_delay_from_env(env_var: &str, default: Duration) -> Duration {
    std::env::var(env_var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let base = Duration::from_secs(2);
        let max = Duration::from_secs(60);
        assert_eq!(backoff_delay(0, base, max), Duration::from_secs(2));
        assert_eq!(backoff_delay(1, base, max), Duration::from_secs(4));
        assert_eq!(backoff_delay(3, base, max), Duration::from_secs(16));
        assert_eq!(backoff_delay(10, base, max), max);
        assert_eq!(backoff_delay(40, base, max), max);
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("7")), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_retry_after(None), None);
    }
}
