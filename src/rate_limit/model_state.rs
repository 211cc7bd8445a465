//! Per-model rate limiting state.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use super::config::{MAX_COOLDOWN_PERIOD, RATE_LIMIT_WINDOW};

/// State for a single model.
#[derive(Debug, Clone, Default)]
pub struct RateLimitState {
    /// Dispatch times of calls in the trailing window, oldest first.
    pub recent_calls: VecDeque<Instant>,
    /// While in the future, every call for the model is refused.
    pub cooldown_until: Option<Instant>,
    /// Total calls recorded since the state was created.
    pub total_requests: u64,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop calls that fell out of the window. Returns how many were removed.
    ///
    /// Calls are appended in order, so the stale ones are always at the front.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.recent_calls.len();
        while let Some(&oldest) = self.recent_calls.front() {
            if now.saturating_duration_since(oldest) >= RATE_LIMIT_WINDOW {
                self.recent_calls.pop_front();
            } else {
                break;
            }
        }
        before - self.recent_calls.len()
    }

    /// Record a dispatched call.
    pub fn record(&mut self, now: Instant) {
        self.recent_calls.push_back(now);
        self.total_requests += 1;
    }

    /// Enter (or extend/shorten) a cooldown lasting `period` from `now`.
    ///
    /// Periods longer than [`MAX_COOLDOWN_PERIOD`] are clamped to it.
    pub fn start_cooldown(&mut self, now: Instant, period: Duration) {
        self.cooldown_until = now.checked_add(period.min(MAX_COOLDOWN_PERIOD));
    }

    /// Time left in the active cooldown, if any.
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        self.cooldown_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Number of calls currently counted against the window.
    pub fn calls_in_window(&self) -> usize {
        self.recent_calls.len()
    }
}

/// Round a duration up to whole seconds.
pub fn ceil_secs(duration: Duration) -> u64 {
    if duration.subsec_nanos() > 0 {
        duration.as_secs() + 1
    } else {
        duration.as_secs()
    }
}
