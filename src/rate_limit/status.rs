//! Admission decisions and status snapshots.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of a rate check for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The call may proceed now.
    Allowed,
    /// A cooldown is active; nothing is admitted until it ends.
    Cooldown {
        /// Time left, rounded up to whole seconds.
        remaining_secs: u64,
    },
    /// The window is full; a cooldown of `cooldown_secs` was just entered.
    LimitReached {
        cooldown_secs: u64,
        requests_in_window: usize,
        limit: u32,
    },
}

impl RateDecision {
    pub fn allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }

    /// Human readable reason; empty when the call is allowed.
    pub fn reason(&self) -> String {
        match self {
            RateDecision::Allowed => String::new(),
            RateDecision::Cooldown { remaining_secs } => {
                format!("Rate limit cooldown: {}s remaining", remaining_secs)
            }
            RateDecision::LimitReached { cooldown_secs, .. } => {
                format!("Rate limit reached: cooling down for {}s", cooldown_secs)
            }
        }
    }

    /// Remaining cooldown when the refusal comes from an active cooldown.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        match self {
            RateDecision::Cooldown { remaining_secs } => {
                Some(Duration::from_secs(*remaining_secs))
            }
            _ => None,
        }
    }
}

impl fmt::Display for RateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateDecision::Allowed => write!(f, "allowed"),
            _ => write!(f, "{}", self.reason()),
        }
    }
}

/// Whether a model is currently admitting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionState {
    Ok,
    Cooldown,
}

/// Read-only snapshot of a model's rate limit, for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub status: AdmissionState,
    /// Seconds left in the cooldown (0 when not cooling down).
    pub remaining_seconds: u64,
    /// Calls counted in the trailing window.
    pub requests_made: usize,
    /// Calls still admissible in the window (0 during a cooldown).
    pub requests_available: u32,
    pub limit: u32,
}

impl RateLimitStatus {
    pub fn in_cooldown(&self) -> bool {
        self.status == AdmissionState::Cooldown
    }
}
