//! Configuration management for modelgate using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::executor::{RateLimitedExecutor, RetryPolicy};
use crate::llm::LlmConfig;
use crate::rate_limit::{get_delay_from_env, RateLimitConfig, RateTracker};

/// Errors loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Per-model request limits.
    #[serde(default, skip_serializing_if = "RateLimitConfig::is_default")]
    pub rate_limits: RateLimitConfig,
    /// Retry budget for rate-limited calls.
    #[serde(default, skip_serializing_if = "RetryPolicy::is_default")]
    pub retry: RetryPolicy,
    /// Gemini client settings.
    #[serde(default, skip_serializing_if = "LlmConfig::is_default")]
    pub llm: LlmConfig,
    /// Path the config was loaded from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults (with env overrides) when nothing is found.
    pub async fn load() -> Self {
        match prefer::load("modelgate").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            warn!("Ignoring config file: {}", e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => {
                debug!("No config file found, using defaults");
                Self::default_with_env()
            }
        }
    }

    /// Defaults with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = Self::parse(ext, &contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    fn parse(ext: &str, contents: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars, on top of those [`LlmConfig::with_env_overrides`] reads:
    /// - `MODELGATE_MAX_RETRIES`: retry budget
    /// - `MODELGATE_BASE_DELAY_MS`: backoff base in milliseconds
    pub fn with_env_overrides(mut self) -> Self {
        self.llm = self.llm.with_env_overrides();
        if let Some(n) = std::env::var("MODELGATE_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.retry.max_retries = n;
        }
        self.retry.base_delay = get_delay_from_env("MODELGATE_BASE_DELAY_MS", self.retry.base_delay);
        self
    }

    /// Models to report on: the configured operation models plus any with
    /// explicit limits.
    pub fn known_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.llm.models().into_iter().map(String::from).collect();
        models.extend(self.rate_limits.models.keys().cloned());
        models.sort();
        models.dedup();
        models
    }

    /// Build a rate tracker that knows every model this config mentions.
    pub fn build_tracker(&self) -> RateTracker {
        let mut limits = self.rate_limits.clone();
        for model in self.llm.models() {
            if !limits.models.contains_key(model) {
                let default = limits.default;
                limits = limits.with_model(model, default);
            }
        }
        RateTracker::with_config(limits)
    }

    /// Build the executor shared by every service call.
    pub fn build_executor(&self) -> RateLimitedExecutor {
        RateLimitedExecutor::new(self.build_tracker(), self.retry)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::rate_limit::ModelLimits;

    fn write_config(ext: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{}", ext))
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_toml() {
        let file = write_config(
            "toml",
            r#"
[rate_limits.default]
requests_per_minute = 15
cooldown_period_secs = 30

[rate_limits.models."gemini-2.0-pro"]
requests_per_minute = 2
cooldown_period_secs = 90

[retry]
max_retries = 5

[llm]
qa_model = "gemini-2.0-pro"
"#,
        );

        let config = Config::load_from_path(file.path()).await.unwrap();
        assert_eq!(config.source_path.as_deref(), Some(file.path()));
        assert_eq!(
            config.rate_limits.limits_for("gemini-2.0-pro"),
            ModelLimits::new(2, Duration::from_secs(90))
        );
        assert_eq!(config.rate_limits.limits_for("other").requests_per_minute, 15);
        assert_eq!(config.llm.qa_model, "gemini-2.0-pro");
        assert_eq!(
            config.known_models(),
            vec!["gemini-2.0-flash".to_string(), "gemini-2.0-pro".to_string()]
        );
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let yaml = write_config("yaml", "retry:\n  max_retries: 1\n");
        let config = Config::load_from_path(yaml.path()).await.unwrap();
        assert_eq!(config.retry.max_retries, 1);

        let json = write_config("json", r#"{"rate_limits": {"default": {"requests_per_minute": 4}}}"#);
        let config = Config::load_from_path(json.path()).await.unwrap();
        assert_eq!(config.rate_limits.default.requests_per_minute, 4);
        assert_eq!(config.rate_limits.default.cooldown_period, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_parse_error_names_format() {
        let file = write_config("toml", "retry = [");
        let err = Config::load_from_path(file.path()).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse TOML config"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = Config::load_from_path(Path::new("/nonexistent/modelgate.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_tracker_reports_configured_models() {
        let config = Config::default();
        let status = config.build_tracker().all_status().await;
        assert!(status.contains_key(config.llm.summary_model.as_str()));
    }
}
