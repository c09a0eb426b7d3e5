//! Error taxonomy and classification shared by every castkit crate
//!
//! The error handling system is built on three pieces:
//!
//! 1. **[`ErrorKind`]**: the stable taxonomy callers match on. Every kind maps
//!    to a fixed HTTP status code and a wire name used in API-route bodies.
//!
//! 2. **[`ClassifiedError`]**: a structured error carrying a kind, a message,
//!    the status derived from the kind, and an optional JSON `details` object.
//!    The HTTP client produces these from non-success responses.
//!
//! 3. **[`ErrorClassification`] trait**: a standard interface for deciding
//!    retryability and severity, consumed by the backoff executor's
//!    `RetryTransient` condition.
//!
//! ## Status table
//!
//! | Kind | Status | Wire name |
//! |------|--------|-----------|
//! | `Validation` | 400 | `VALIDATION_ERROR` |
//! | `Authentication` | 401 | `AUTHENTICATION_ERROR` |
//! | `Authorization` | 403 | `AUTHORIZATION_ERROR` |
//! | `NotFound` | 404 | `NOT_FOUND_ERROR` |
//! | `RateLimit` | 429 | `RATE_LIMIT_ERROR` |
//! | `Internal` | 500 | `INTERNAL_ERROR` |
//! | `ExternalService` | 502 | `EXTERNAL_SERVICE_ERROR` |
//!
//! ## Examples
//!
//! ```rust
//! # #[cfg(feature = "foundation")]
//! # {
//! use castkit_common::error::{ClassifiedError, ErrorClassification, ErrorKind};
//! use serde_json::json;
//!
//! let body = json!({ "msg": "gone" });
//! let err = ClassifiedError::from_status(404, body.as_object().cloned().unwrap_or_default());
//!
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert_eq!(err.status_code(), 404);
//! assert!(!err.is_retryable());
//! # }
//! ```

mod classified;
mod kind;
mod response;

use std::fmt;
use std::time::Duration;

pub use classified::{ClassifiedError, Details};
pub use kind::ErrorKind;
pub use response::ErrorResponse;

/// Trait for classifying errors by their characteristics
///
/// This trait provides a standard interface for determining error properties
/// such as retryability and severity.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again, such as upstream 5xx responses, timeouts and rate limiting.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    ///
    /// Used for monitoring, alerting, and logging decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when a specific delay is recommended, or
    /// `None` to defer to the backoff schedule.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
