//! modelgate - rate-limited access to generative-AI models.
//!
//! A sliding-window rate tracker and retry executor that wrap every model
//! call, plus the Gemini client, transcription service, cost accounting and
//! monitoring server built on top of them.

pub mod cli;
pub mod config;
pub mod cost;
pub mod executor;
pub mod llm;
pub mod rate_limit;
pub mod server;
pub mod services;
pub mod sessions;

pub use executor::{ClassifyFailure, ExecutorError, FailureKind, RateLimitedExecutor, RetryPolicy};
pub use rate_limit::{ModelLimits, RateDecision, RateLimitConfig, RateLimitStatus, RateTracker};
