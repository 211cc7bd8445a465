//! Sliding-window rate tracker shared by every caller of a model.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::{ModelLimits, RateLimitConfig};
use super::model_state::{ceil_secs, RateLimitState};
use super::status::{AdmissionState, RateDecision, RateLimitStatus};

/// Per-model admission control over a trailing 60-second window.
///
/// Clones share the same state, so one tracker can be handed to every
/// request handler in the process.
#[derive(Debug, Clone)]
pub struct RateTracker {
    config: Arc<RateLimitConfig>,
    models: Arc<RwLock<HashMap<String, RateLimitState>>>,
}

impl RateTracker {
    /// Create a tracker with default limits (10 calls/min, 60s cooldown).
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            models: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn limits_for(&self, model: &str) -> ModelLimits {
        self.config.limits_for(model)
    }

    /// Decide whether a call to `model` may proceed now.
    ///
    /// An active cooldown refuses without touching the call history.
    /// Otherwise stale calls are pruned, and a full window enters a cooldown.
    pub async fn check_rate_limit(&self, model: &str) -> RateDecision {
        let limits = self.limits_for(model);
        let now = Instant::now();

        let mut models = self.models.write().await;
        let state = models.entry(model.to_string()).or_default();
        decide(state, model, limits, now)
    }

    /// Check and, when allowed, record the call under one write guard.
    ///
    /// Concurrent callers racing for the last slot in a window cannot both
    /// be admitted.
    pub async fn acquire(&self, model: &str) -> RateDecision {
        let limits = self.limits_for(model);
        let now = Instant::now();

        let mut models = self.models.write().await;
        let state = models.entry(model.to_string()).or_default();
        let decision = decide(state, model, limits, now);
        if decision.allowed() {
            state.record(now);
        }
        decision
    }

    /// Count a call against the window. Call this right before dispatching,
    /// not after success.
    pub async fn record_request(&self, model: &str) {
        let now = Instant::now();
        let mut models = self.models.write().await;
        models.entry(model.to_string()).or_default().record(now);
    }

    /// Force a cooldown, e.g. after the provider itself rejected a call.
    pub async fn set_cooldown(&self, model: &str, period: Duration) {
        let now = Instant::now();
        let mut models = self.models.write().await;
        models
            .entry(model.to_string())
            .or_default()
            .start_cooldown(now, period);
        info!("Cooldown for {} set to {:?}", model, period);
    }

    /// Snapshot of a model's status. Prunes stale calls but never starts a
    /// cooldown.
    pub async fn get_status(&self, model: &str) -> RateLimitStatus {
        let limits = self.limits_for(model);
        let now = Instant::now();

        let mut models = self.models.write().await;
        let state = models.entry(model.to_string()).or_default();
        state.prune(now);
        let requests_made = state.calls_in_window();

        match state.cooldown_remaining(now) {
            Some(remaining) => RateLimitStatus {
                status: AdmissionState::Cooldown,
                remaining_seconds: ceil_secs(remaining),
                requests_made,
                requests_available: 0,
                limit: limits.requests_per_minute,
            },
            None => RateLimitStatus {
                status: AdmissionState::Ok,
                remaining_seconds: 0,
                requests_made,
                requests_available: limits
                    .requests_per_minute
                    .saturating_sub(requests_made as u32),
                limit: limits.requests_per_minute,
            },
        }
    }

    /// Status of every tracked or configured model, sorted by name.
    pub async fn all_status(&self) -> BTreeMap<String, RateLimitStatus> {
        let mut names: Vec<String> = {
            let models = self.models.read().await;
            models.keys().cloned().collect()
        };
        names.extend(self.config.models.keys().cloned());
        names.sort();
        names.dedup();

        let mut statuses = BTreeMap::new();
        for name in names {
            let status = self.get_status(&name).await;
            statuses.insert(name, status);
        }
        statuses
    }

    /// Total calls ever recorded for a model.
    pub async fn total_requests(&self, model: &str) -> u64 {
        let models = self.models.read().await;
        models.get(model).map(|s| s.total_requests).unwrap_or(0)
    }
}

fn decide(state: &mut RateLimitState, model: &str, limits: ModelLimits, now: Instant) -> RateDecision {
    if let Some(remaining) = state.cooldown_remaining(now) {
        let remaining_secs = ceil_secs(remaining);
        debug!("{} in cooldown, {}s remaining", model, remaining_secs);
        return RateDecision::Cooldown { remaining_secs };
    }

    let pruned = state.prune(now);
    if pruned > 0 {
        debug!("Pruned {} stale calls for {}", pruned, model);
    }

    let in_window = state.calls_in_window();
    if in_window >= limits.requests_per_minute as usize {
        state.start_cooldown(now, limits.cooldown_period);
        warn!(
            "Rate limit reached for {} ({}/{} calls in window), cooling down for {:?}",
            model, in_window, limits.requests_per_minute, limits.cooldown_period
        );
        return RateDecision::LimitReached {
            cooldown_secs: ceil_secs(limits.cooldown_period),
            requests_in_window: in_window,
            limit: limits.requests_per_minute,
        };
    }

    RateDecision::Allowed
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new()
    }
}
