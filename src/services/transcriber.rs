//! Transcription, summary and question-answering service.
//!
//! Every model call goes through the shared [`RateLimitedExecutor`], keyed by
//! the model configured for the operation. When a session id is supplied the
//! call's token usage is billed to that session.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::cost::{estimate_tokens, RequestType, SessionCosts};
use crate::executor::{ExecutorError, RateLimitedExecutor};
use crate::llm::{fill_prompt, ContentGenerator, GeminiClient, Generation, LlmConfig, LlmError, Part};

/// Audio formats accepted for transcription.
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav"];

/// Errors from the transcriber service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Unsupported file format '{0}'. Allowed formats: mp3, m4a, wav")]
    UnsupportedFormat(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Call(#[from] ExecutorError<LlmError>),
}

impl ServiceError {
    /// Whether the failure was a rate limit (local or provider side).
    pub fn is_rate_limited(&self) -> bool {
        match self {
            ServiceError::Call(ExecutorError::RateLimitExceeded { .. }) => true,
            ServiceError::Call(ExecutorError::Remote(LlmError::RateLimited { .. })) => true,
            _ => false,
        }
    }
}

/// Audio MIME type for a file extension. Unknown types are sent as WAV.
pub fn audio_mime_type(extension: &str) -> String {
    mime_guess::from_ext(&extension.to_lowercase())
        .first()
        .filter(|m| m.type_() == mime_guess::mime::AUDIO)
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "audio/wav".to_string())
}

/// Transcribes audio and analyzes transcripts through a rate-limited model.
#[derive(Clone)]
pub struct TranscriberService {
    generator: Arc<dyn ContentGenerator>,
    executor: RateLimitedExecutor,
    config: LlmConfig,
    costs: SessionCosts,
}

impl TranscriberService {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        executor: RateLimitedExecutor,
        config: LlmConfig,
        costs: SessionCosts,
    ) -> Self {
        Self {
            generator,
            executor,
            config,
            costs,
        }
    }

    /// Gemini-backed service with a fresh executor and cost ledger.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let client = GeminiClient::new(config.llm.clone())?;
        if !client.is_available() {
            warn!("GEMINI_API_KEY is not set; model calls will fail");
        }
        Ok(Self::new(
            Arc::new(client),
            config.build_executor(),
            config.llm.clone(),
            SessionCosts::new(),
        ))
    }

    pub fn executor(&self) -> &RateLimitedExecutor {
        &self.executor
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn costs(&self) -> &SessionCosts {
        &self.costs
    }

    /// Transcribe an audio file on disk.
    pub async fn transcribe_file(
        &self,
        path: &Path,
        session_id: Option<&str>,
    ) -> Result<String, ServiceError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ServiceError::UnsupportedFormat(extension));
        }

        let audio = tokio::fs::read(path).await.map_err(|source| ServiceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("Transcribing {} ({} bytes)", path.display(), audio.len());

        self.transcribe_audio(audio, &audio_mime_type(&extension), session_id)
            .await
    }

    /// Transcribe raw audio bytes.
    pub async fn transcribe_audio(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        session_id: Option<&str>,
    ) -> Result<String, ServiceError> {
        let model = &self.config.transcription_model;
        let prompt = self.config.get_transcription_prompt();
        let parts = vec![
            Part::text(prompt),
            Part::InlineData {
                mime_type: mime_type.to_string(),
                data: audio,
            },
        ];

        let generation = self.generate(model, &parts).await?;
        self.bill(session_id, RequestType::Transcription, model, prompt, &generation)
            .await;
        Ok(generation.text)
    }

    /// Summarize a transcript as Markdown.
    pub async fn summarize(
        &self,
        transcript: &str,
        session_id: Option<&str>,
    ) -> Result<String, ServiceError> {
        let model = &self.config.summary_model;
        let prompt = fill_prompt(
            self.config.get_summary_prompt(),
            &[("transcript", transcript)],
        );
        debug!("Summarizing transcript of {} chars", transcript.len());

        let generation = self.generate(model, &[Part::text(prompt.as_str())]).await?;
        self.bill(session_id, RequestType::Text, model, &prompt, &generation)
            .await;
        Ok(generation.text)
    }

    /// Answer a question using only the transcript.
    pub async fn ask(
        &self,
        transcript: &str,
        question: &str,
        session_id: Option<&str>,
    ) -> Result<String, ServiceError> {
        let model = &self.config.qa_model;
        let prompt = fill_prompt(
            self.config.get_qa_prompt(),
            &[("transcript", transcript), ("question", question)],
        );
        debug!("Answering question '{}'", question);

        let generation = self.generate(model, &[Part::text(prompt.as_str())]).await?;
        self.bill(session_id, RequestType::Text, model, &prompt, &generation)
            .await;
        Ok(generation.text)
    }

    async fn generate(
        &self,
        model: &str,
        parts: &[Part],
    ) -> Result<Generation, ExecutorError<LlmError>> {
        let generator = &self.generator;
        self.executor
            .execute(model, || generator.generate(model, parts))
            .await
    }

    async fn bill(
        &self,
        session_id: Option<&str>,
        request_type: RequestType,
        model: &str,
        prompt: &str,
        generation: &Generation,
    ) {
        let Some(session_id) = session_id else {
            return;
        };
        let tokens = match generation.usage {
            Some(usage) if usage.total_token_count > 0 => usage.total_token_count,
            _ => estimate_tokens(prompt) + estimate_tokens(&generation.text),
        };
        let cost = self
            .costs
            .record(session_id, request_type, tokens, model)
            .await;
        debug!(
            session_id,
            %request_type,
            tokens,
            cost,
            "billed request"
        );
    }
}
