//! Transcription, summary and question endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::super::{AppState, SESSION_HEADER};
use crate::services::ServiceError;

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub transcript: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub question: Option<String>,
    /// Used when the session has no stored transcript.
    pub transcript: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeResponse {
    pub transcript: String,
    pub session_id: String,
}

fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

fn service_error(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        e if e.is_rate_limited() => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("Request failed: {}", err);
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

/// Transcribe an audio upload sent as the raw request body.
///
/// The `Content-Type` header names the audio format. A new session is opened
/// for the transcript and its id returned.
pub async fn transcribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return bad_request("No file uploaded");
    }
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !mime_type.starts_with("audio/") {
        return bad_request("Unsupported file format. Send an audio/* body (mp3, m4a, wav)");
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    state.service.costs().open(&session_id).await;
    info!("Transcribing {} bytes for session {}", body.len(), session_id);

    match state
        .service
        .transcribe_audio(body.to_vec(), mime_type, Some(&session_id))
        .await
    {
        Ok(transcript) => {
            state
                .transcripts
                .write()
                .await
                .insert(&session_id, transcript.clone());

            let mut response = Json(TranscribeResponse {
                transcript,
                session_id: session_id.clone(),
            })
            .into_response();
            if let Ok(value) = HeaderValue::from_str(&session_id) {
                response.headers_mut().insert(SESSION_HEADER, value);
            }
            response
        }
        Err(e) => service_error(e),
    }
}

/// Summarize a transcript.
pub async fn summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SummarizeRequest>,
) -> Response {
    let Some(transcript) = body.transcript else {
        return bad_request("No transcript provided");
    };
    let session_id = session_from_headers(&headers);

    match state
        .service
        .summarize(&transcript, session_id.as_deref())
        .await
    {
        Ok(summary) => Json(SummarizeResponse { summary }).into_response(),
        Err(e) => service_error(e),
    }
}

/// Answer a question about a stored or supplied transcript.
pub async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AskRequest>,
) -> Response {
    let Some(question) = body.question else {
        return bad_request("No question provided");
    };
    let session_id = session_from_headers(&headers).or(body.session_id);

    let stored = match &session_id {
        Some(id) => state.transcripts.read().await.get(id).cloned(),
        None => None,
    };
    let Some(transcript) = stored.or(body.transcript).filter(|t| !t.is_empty()) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Transcript not found" })),
        )
            .into_response();
    };

    match state
        .service
        .ask(&transcript, &question, session_id.as_deref())
        .await
    {
        Ok(answer) => Json(AskResponse { answer }).into_response(),
        Err(e) => service_error(e),
    }
}
