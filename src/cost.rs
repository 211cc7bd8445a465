//! Per-session token and cost accounting.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::sessions::SessionMap;

/// Price per token for audio transcription.
pub const TRANSCRIPTION_COST_PER_TOKEN: f64 = 0.00001;
/// Price per token for text generation. Also the fallback rate.
pub const TEXT_COST_PER_TOKEN: f64 = 0.000005;

/// Kind of billed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Transcription,
    Text,
}

impl RequestType {
    pub fn cost_per_token(&self) -> f64 {
        match self {
            RequestType::Transcription => TRANSCRIPTION_COST_PER_TOKEN,
            RequestType::Text => TEXT_COST_PER_TOKEN,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestType::Transcription => write!(f, "transcription"),
            RequestType::Text => write!(f, "text"),
        }
    }
}

/// Rough token estimate: four characters per token.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / 4) as u64
}

/// One billed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub request_type: RequestType,
    pub model: String,
    pub tokens: u64,
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
}

/// Running totals for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostTracker {
    pub total_tokens: u64,
    pub total_cost: f64,
    pub requests: Vec<CostRecord>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request and return its cost.
    pub fn add_request(&mut self, request_type: RequestType, tokens: u64, model: &str) -> f64 {
        let cost = tokens as f64 * request_type.cost_per_token();
        self.total_tokens += tokens;
        self.total_cost += cost;
        self.requests.push(CostRecord {
            request_type,
            model: model.to_string(),
            tokens,
            cost,
            timestamp: Utc::now(),
        });
        cost
    }
}

/// Cost trackers keyed by session id. Clones share state.
///
/// Holds a bounded number of sessions; the oldest is dropped when full.
#[derive(Debug, Clone, Default)]
pub struct SessionCosts {
    sessions: Arc<RwLock<SessionMap<CostTracker>>>,
}

impl SessionCosts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` sessions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(SessionMap::with_capacity(capacity))),
        }
    }

    /// Start an empty tracker for a session, replacing any existing one.
    pub async fn open(&self, session_id: &str) {
        self.sessions
            .write()
            .await
            .insert(session_id, CostTracker::new());
    }

    /// Record a request against a session, creating it on first use.
    pub async fn record(
        &self,
        session_id: &str,
        request_type: RequestType,
        tokens: u64,
        model: &str,
    ) -> f64 {
        let mut sessions = self.sessions.write().await;
        sessions
            .get_or_default(session_id)
            .add_request(request_type, tokens, model)
    }

    /// Snapshot of a session's totals.
    pub async fn summary(&self, session_id: &str) -> Option<CostTracker> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn test_tracker_totals() {
        let mut tracker = CostTracker::new();
        let cost = tracker.add_request(RequestType::Transcription, 1000, "gemini-2.0-flash");
        assert!((cost - 0.01).abs() < 1e-12);
        tracker.add_request(RequestType::Text, 2000, "gemini-2.0-flash");

        assert_eq!(tracker.total_tokens, 3000);
        assert!((tracker.total_cost - 0.02).abs() < 1e-12);
        assert_eq!(tracker.requests.len(), 2);
        assert_eq!(tracker.requests[1].request_type, RequestType::Text);
    }

    #[test]
    fn test_summary_serializes_request_type_lowercase() {
        let mut tracker = CostTracker::new();
        tracker.add_request(RequestType::Text, 4, "m");
        let json = serde_json::to_value(&tracker).unwrap();
        assert_eq!(json["requests"][0]["request_type"], "text");
        assert_eq!(json["total_tokens"], 4);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let costs = SessionCosts::new();
        costs.record("a", RequestType::Text, 10, "m").await;
        costs.record("a", RequestType::Text, 10, "m").await;
        costs.open("b").await;

        assert_eq!(costs.summary("a").await.unwrap().total_tokens, 20);
        assert_eq!(costs.summary("b").await.unwrap().requests.len(), 0);
        assert!(costs.summary("c").await.is_none());
        assert_eq!(costs.len().await, 2);
    }

    #[tokio::test]
    async fn test_session_count_is_bounded() {
        let costs = SessionCosts::with_capacity(2);
        costs.open("a").await;
        costs.record("b", RequestType::Text, 1, "m").await;
        costs.record("c", RequestType::Text, 1, "m").await;

        assert_eq!(costs.len().await, 2);
        assert!(costs.summary("a").await.is_none());
        assert!(costs.summary("c").await.is_some());
    }
}
