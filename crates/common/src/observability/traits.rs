//! Trait abstraction for leveled logging
//!
//! Lets the backoff executor and the HTTP client report retries and failures
//! without depending on a specific logging implementation.

use std::fmt::Debug;

use serde_json::{Map, Value};

use super::LogLevel;

/// Structured metadata attached to a log record.
pub type Metadata = Map<String, Value>;

/// Build [`Metadata`] from key/value pairs.
///
/// ```rust
/// use castkit_common::observability::metadata;
///
/// let meta = metadata([("method", "GET"), ("url", "https://h/p")]);
/// assert_eq!(meta["method"], "GET");
/// ```
pub fn metadata<I, K, V>(pairs: I) -> Metadata
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Leveled logging sink
///
/// Implementations must treat every call as a side effect only: logging
/// never alters the caller's control flow.
pub trait Logger: Send + Sync + Debug {
    /// Record a message at `level`.
    fn log(&self, level: LogLevel, message: &str, metadata: Option<&Metadata>);

    /// Record a debug message
    fn debug(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(LogLevel::Debug, message, metadata);
    }

    /// Record an info message
    fn info(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(LogLevel::Info, message, metadata);
    }

    /// Record a warning
    fn warn(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(LogLevel::Warn, message, metadata);
    }

    /// Record an error
    fn error(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(LogLevel::Error, message, metadata);
    }
}

/// No-op logger for callers that do not observe retries
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _level: LogLevel, _message: &str, _metadata: Option<&Metadata>) {}
}
