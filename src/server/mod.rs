//! Web server exposing rate-limit monitoring and the transcriber operations.
//!
//! Provides:
//! - Per-model rate limit status
//! - Per-session cost summaries
//! - Transcribe, summarize and ask endpoints behind the shared executor

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::services::TranscriberService;
use crate::sessions::SessionMap;

/// Header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub service: TranscriberService,
    /// Transcripts produced by `/api/transcribe`, keyed by session id.
    /// Bounded; the oldest session's transcript is dropped when full.
    pub transcripts: Arc<RwLock<SessionMap<String>>>,
}

impl AppState {
    pub fn new(service: TranscriberService) -> Self {
        Self {
            service,
            transcripts: Arc::new(RwLock::new(SessionMap::default())),
        }
    }

    /// Build the Gemini-backed service described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(TranscriberService::from_config(config)?))
    }
}

/// Start the web server.
pub async fn serve(config: &Config, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::cost::SessionCosts;
    use crate::executor::{RateLimitedExecutor, RetryPolicy};
    use crate::llm::{ContentGenerator, Generation, LlmConfig, LlmError, Part};
    use crate::rate_limit::{ModelLimits, RateLimitConfig, RateTracker};

    const MODEL: &str = "gemini-2.0-flash";

    /// Echoes the first text part's length so tests can tell calls apart.
    struct EchoGenerator;

    #[async_trait]
    impl ContentGenerator for EchoGenerator {
        async fn generate(&self, _model: &str, parts: &[Part]) -> Result<Generation, LlmError> {
            let text = match parts.first() {
                Some(Part::Text(t)) => format!("generated from {} chars", t.len()),
                _ => "generated".to_string(),
            };
            Ok(Generation { text, usage: None })
        }
    }

    fn setup_test_app(limits: ModelLimits, policy: RetryPolicy) -> axum::Router {
        let tracker = RateTracker::with_config(RateLimitConfig::default().with_model(MODEL, limits));
        let service = TranscriberService::new(
            Arc::new(EchoGenerator),
            RateLimitedExecutor::new(tracker, policy),
            LlmConfig::default().with_model(MODEL),
            SessionCosts::new(),
        );
        create_router(AppState::new(service))
    }

    fn default_app() -> axum::Router {
        setup_test_app(ModelLimits::default(), RetryPolicy::default())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header(SESSION_HEADER, "session-1")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = default_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limits_lists_configured_models() {
        let response = default_app()
            .oneshot(
                Request::builder()
                    .uri("/rate_limits")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json[MODEL]["status"], "ok");
        assert_eq!(json[MODEL]["requests_available"], 10);
        assert_eq!(json[MODEL]["limit"], 10);
    }

    #[tokio::test]
    async fn test_summarize_records_request_and_cost() {
        let app = default_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/summarize",
                serde_json::json!({ "transcript": "Speaker 1: hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["summary"].as_str().unwrap().starts_with("generated from"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/rate_limits/{}", MODEL))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["requests_made"], 1);
        assert_eq!(json["requests_available"], 9);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/sessions/session-1/cost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["requests"][0]["request_type"], "text");
        assert_eq!(json["requests"][0]["model"], MODEL);
        assert!(json["total_tokens"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_unknown_session_cost_is_404() {
        let response = default_app()
            .oneshot(
                Request::builder()
                    .uri("/sessions/missing/cost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_summarize_requires_transcript() {
        let response = default_app()
            .oneshot(post_json("/api/summarize", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No transcript provided");
    }

    #[tokio::test]
    async fn test_ask_without_transcript_is_404() {
        let response = default_app()
            .oneshot(post_json(
                "/api/ask",
                serde_json::json!({ "question": "who spoke?" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_transcribe_then_ask_uses_stored_transcript() {
        let app = default_app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/transcribe")
                    .header("content-type", "audio/wav")
                    .body(Body::from(vec![0u8; 64]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let header_session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let json = body_json(response).await;
        let session_id = json["sessionId"].as_str().unwrap().to_string();
        assert_eq!(header_session.as_deref(), Some(session_id.as_str()));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ask")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({ "question": "who?", "sessionId": session_id })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/sessions/{}/cost", session_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["requests"][0]["request_type"], "transcription");
        assert_eq!(json["requests"][1]["request_type"], "text");
    }

    #[tokio::test]
    async fn test_transcribe_rejects_non_audio() {
        let response = default_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/transcribe")
                    .header("content-type", "text/plain")
                    .body(Body::from("not audio"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_exhausted_limit_is_429() {
        let app = setup_test_app(
            ModelLimits::new(0, std::time::Duration::from_secs(60)),
            RetryPolicy::default().with_max_retries(0),
        );

        let response = app
            .oneshot(post_json(
                "/api/summarize",
                serde_json::json!({ "transcript": "t" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(response).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Rate limit exceeded for gemini-2.0-flash"));
    }
}
