//! Service layer for modelgate business logic.
//!
//! Services can be used by the CLI, the web server, or other interfaces.

pub mod transcriber;

pub use transcriber::{audio_mime_type, ServiceError, TranscriberService};
