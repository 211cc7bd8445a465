//! HTTP request handlers for the web server.

mod api;
mod transcripts;

pub use api::{health, rate_limit_status, rate_limits, session_cost};
pub use transcripts::{ask, summarize, transcribe};
