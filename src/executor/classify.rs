//! Classification of failed calls into retryable rate-limit rejections and
//! everything else.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

/// How the executor should treat a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The provider rejected the call for rate limiting; retry after
    /// `retry_after` when it suggested one.
    RateLimited { retry_after: Option<Duration> },
    /// Anything else. Retrying would not change the outcome.
    Fatal,
}

/// Errors the executor can wrap must say whether they are rate-limit rejections.
pub trait ClassifyFailure {
    fn classify(&self) -> FailureKind;
}

/// Matches `retryDelay: '5s'`, `'retryDelay': '5s'` and `"retryDelay": "1.5s"`.
static RETRY_DELAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"retryDelay['"]?\s*:\s*['"]?(\d+(?:\.\d+)?)s"#).unwrap()
});

/// Classify an unstructured error message.
///
/// A message is a rate-limit rejection when it carries both the HTTP status
/// `429` and the `RESOURCE_EXHAUSTED` status. A `retryDelay` in the text
/// becomes the suggested delay.
pub fn classify_error_text(text: &str) -> FailureKind {
    if !(text.contains("429") && text.contains("RESOURCE_EXHAUSTED")) {
        return FailureKind::Fatal;
    }
    FailureKind::RateLimited {
        retry_after: extract_retry_delay(text),
    }
}

/// Extract a provider-suggested retry delay from error text.
pub fn extract_retry_delay(text: &str) -> Option<Duration> {
    let captures = RETRY_DELAY.captures(text)?;
    let secs: f64 = captures.get(1)?.as_str().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// Parse a protobuf-style duration string such as `"5s"` or `"0.25s"`.
///
/// Negative, non-finite and out-of-range values yield `None`.
pub fn parse_duration_str(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().strip_suffix('s')?.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

impl ClassifyFailure for String {
    fn classify(&self) -> FailureKind {
        classify_error_text(self)
    }
}

impl ClassifyFailure for &str {
    fn classify(&self) -> FailureKind {
        classify_error_text(self)
    }
}

impl ClassifyFailure for anyhow::Error {
    fn classify(&self) -> FailureKind {
        classify_error_text(&format!("{:#}", self))
    }
}
