//! Rate limiter configuration and types.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Trailing window used to count recent calls.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Default calls per minute when a model is not configured.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 10;

/// Default cooldown entered when a model hits its limit.
pub const DEFAULT_COOLDOWN_PERIOD: Duration = Duration::from_secs(60);

/// Longest cooldown the tracker will hold, whatever a provider suggests.
pub const MAX_COOLDOWN_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Limits for a single model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLimits {
    /// Calls admitted per trailing 60-second window.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// How long all calls are refused once the limit is reached.
    #[serde(
        default = "default_cooldown_period",
        rename = "cooldown_period_secs",
        with = "duration_secs"
    )]
    pub cooldown_period: Duration,
}

fn default_requests_per_minute() -> u32 {
    DEFAULT_REQUESTS_PER_MINUTE
}

fn default_cooldown_period() -> Duration {
    DEFAULT_COOLDOWN_PERIOD
}

impl Default for ModelLimits {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            cooldown_period: DEFAULT_COOLDOWN_PERIOD,
        }
    }
}

impl ModelLimits {
    pub fn new(requests_per_minute: u32, cooldown_period: Duration) -> Self {
        Self {
            requests_per_minute,
            cooldown_period,
        }
    }
}

/// Configuration for the rate tracker: per-model limits plus a fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Limits applied to models without an explicit entry.
    #[serde(default)]
    pub default: ModelLimits,
    /// Per-model overrides keyed by model identifier.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub models: HashMap<String, ModelLimits>,
}

impl RateLimitConfig {
    /// Add or replace the limits for one model.
    pub fn with_model(mut self, model: impl Into<String>, limits: ModelLimits) -> Self {
        self.models.insert(model.into(), limits);
        self
    }

    /// Limits for a model, falling back to the default entry.
    pub fn limits_for(&self, model: &str) -> ModelLimits {
        self.models.get(model).copied().unwrap_or(self.default)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Serde helper for durations stored as seconds.
///
/// Whole seconds are written as integers, anything finer as a float, so
/// millisecond settings survive a round trip.
pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if value.subsec_nanos() == 0 {
            serializer.serialize_u64(value.as_secs())
        } else {
            serializer.serialize_f64(value.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| D::Error::custom(format!("invalid duration in seconds: {}", secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_model_uses_default() {
        let config = RateLimitConfig::default()
            .with_model("gemini-2.0-flash", ModelLimits::new(5, Duration::from_secs(30)));

        assert_eq!(config.limits_for("gemini-2.0-flash").requests_per_minute, 5);
        let fallback = config.limits_for("gemini-2.0-pro");
        assert_eq!(fallback.requests_per_minute, 10);
        assert_eq!(fallback.cooldown_period, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_from_toml() {
        let config: RateLimitConfig = toml::from_str(
            r#"
            [default]
            requests_per_minute = 20

            [models."gemini-2.0-flash"]
            requests_per_minute = 10
            cooldown_period_secs = 45
            "#,
        )
        .unwrap();

        assert_eq!(config.default.requests_per_minute, 20);
        assert_eq!(config.default.cooldown_period, Duration::from_secs(60));
        let flash = config.limits_for("gemini-2.0-flash");
        assert_eq!(flash.cooldown_period, Duration::from_secs(45));
    }

    #[test]
    fn test_fractional_seconds_survive_round_trip() {
        let limits = ModelLimits::new(10, Duration::from_millis(500));
        let rendered = toml::to_string(&limits).unwrap();
        assert!(rendered.contains("cooldown_period_secs = 0.5"), "{}", rendered);

        let parsed: ModelLimits = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, limits);

        let whole = toml::to_string(&ModelLimits::default()).unwrap();
        assert!(whole.contains("cooldown_period_secs = 60\n"), "{}", whole);
        assert!(toml::from_str::<ModelLimits>("cooldown_period_secs = -1").is_err());
    }
}
