//! LLM client configuration.

use serde::{Deserialize, Serialize};

use super::prompts::{DEFAULT_QA_PROMPT, DEFAULT_SUMMARY_PROMPT, DEFAULT_TRANSCRIPTION_PROMPT};

/// Configuration for the Gemini client and the models each operation uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API endpoint (scheme and host, no path).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key. Read from `GEMINI_API_KEY`, never written back to config files.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Model used to transcribe audio.
    #[serde(default = "default_model")]
    pub transcription_model: String,
    /// Model used to summarize transcripts.
    #[serde(default = "default_model")]
    pub summary_model: String,
    /// Model used to answer questions about transcripts.
    #[serde(default = "default_model")]
    pub qa_model: String,
    /// Maximum tokens in response
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Temperature for generation (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// HTTP timeout for a single generate call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Custom transcription prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription_prompt: Option<String>,
    /// Custom summary prompt (uses a {transcript} placeholder).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_prompt: Option<String>,
    /// Custom question prompt (uses {transcript} and {question} placeholders).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_prompt: Option<String>,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl LlmConfig {
    /// Base default without env overrides.
    fn base_default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            transcription_model: default_model(),
            summary_model: default_model(),
            qa_model: default_model(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            transcription_prompt: None,
            summary_prompt: None,
            qa_prompt: None,
        }
    }

    /// Check if the config equals the default (for skip_serializing_if).
    pub fn is_default(&self) -> bool {
        let mut base = Self::base_default();
        base.api_key = self.api_key.clone();
        *self == base
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `GEMINI_API_KEY`: API key
    /// - `GEMINI_ENDPOINT`: API endpoint
    /// - `MODELGATE_MODEL`: model for all three operations
    /// - `MODELGATE_TEMPERATURE`: generation temperature
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("GEMINI_API_KEY") {
            if !val.is_empty() {
                self.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("GEMINI_ENDPOINT") {
            self = self.with_endpoint(&val);
        }
        if let Ok(val) = std::env::var("MODELGATE_MODEL") {
            self.transcription_model = val.clone();
            self.summary_model = val.clone();
            self.qa_model = val;
        }
        if let Ok(val) = std::env::var("MODELGATE_TEMPERATURE") {
            if let Ok(t) = val.parse() {
                self.temperature = t;
            }
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Use one model for every operation.
    pub fn with_model(mut self, model: &str) -> Self {
        self.transcription_model = model.to_string();
        self.summary_model = model.to_string();
        self.qa_model = model.to_string();
        self
    }

    pub fn get_transcription_prompt(&self) -> &str {
        self.transcription_prompt
            .as_deref()
            .unwrap_or(DEFAULT_TRANSCRIPTION_PROMPT)
    }

    pub fn get_summary_prompt(&self) -> &str {
        self.summary_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SUMMARY_PROMPT)
    }

    pub fn get_qa_prompt(&self) -> &str {
        self.qa_prompt.as_deref().unwrap_or(DEFAULT_QA_PROMPT)
    }

    /// Models used by the service, deduplicated.
    pub fn models(&self) -> Vec<&str> {
        let mut models = vec![
            self.transcription_model.as_str(),
            self.summary_model.as_str(),
            self.qa_model.as_str(),
        ];
        models.sort_unstable();
        models.dedup();
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_default() {
        let config = LlmConfig::base_default();
        assert_eq!(config.summary_model, "gemini-2.0-flash");
        assert!(config.api_key.is_none());
        assert!(config.get_summary_prompt().contains("{transcript}"));
        assert!(config.get_qa_prompt().contains("{question}"));
        assert_eq!(config.models(), vec!["gemini-2.0-flash"]);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let config = LlmConfig::base_default().with_endpoint("http://localhost:8080/");
        assert_eq!(config.endpoint, "http://localhost:8080");
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = LlmConfig::base_default().with_api_key("secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(config.is_default());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: LlmConfig = toml::from_str(r#"qa_model = "gemini-2.0-pro""#).unwrap();
        assert_eq!(config.qa_model, "gemini-2.0-pro");
        assert_eq!(config.summary_model, "gemini-2.0-flash");
        assert_eq!(config.models(), vec!["gemini-2.0-flash", "gemini-2.0-pro"]);
    }
}
