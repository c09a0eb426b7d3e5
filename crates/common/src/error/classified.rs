use serde_json::{json, Map, Value};
use thiserror::Error;

use super::{ErrorClassification, ErrorKind, ErrorSeverity};

/// Structured payload attached to a [`ClassifiedError`].
pub type Details = Map<String, Value>;

/// Structured error with a stable [`ErrorKind`]
///
/// The status code is always derived from the kind, so two errors of the same
/// kind report the same status. Upstream status codes, when relevant, travel
/// in `details`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    details: Option<Details>,
}

impl ClassifiedError {
    /// Create an error of the given kind without details.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self { kind, message: message.into(), details: None }
    }

    /// Attach (or replace) the structured details.
    #[must_use]
    pub fn with_details(mut self, details: Details) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create an authorization error
    pub fn authorization<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create an external service error
    pub fn external_service<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create a rate limit error
    pub fn rate_limit<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    /// Classify a non-success HTTP response.
    ///
    /// `body` is the parsed JSON error body (an empty map when the body was
    /// missing or not a JSON object). 400 and 404 keep the body as details;
    /// every other status becomes `ExternalService` with the upstream status
    /// under `details.status`, followed by the body's own keys.
    pub fn from_status(status: u16, body: Details) -> Self {
        match status {
            400 => Self::validation("Bad request").with_details(body),
            404 => Self::not_found("Resource not found").with_details(body),
            other => {
                let mut details = Details::new();
                details.insert("status".to_string(), Value::from(other));
                details.extend(body);
                Self::external_service(format!("API request failed with status {other}"))
                    .with_details(details)
            }
        }
    }

    /// Error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status code derived from the kind
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Structured details, if any
    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    /// Look up a single details entry.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|details| details.get(key))
    }

    /// Render the API-route body: `{"error": {"type", "message", "details"?}}`.
    pub fn to_response(&self) -> Value {
        let mut error = Map::new();
        error.insert("type".to_string(), Value::from(self.kind.as_str()));
        error.insert("message".to_string(), Value::from(self.message.clone()));
        if let Some(details) = &self.details {
            error.insert("details".to_string(), Value::Object(details.clone()));
        }
        json!({ "error": error })
    }
}

impl ErrorClassification for ClassifiedError {
    fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::ExternalService | ErrorKind::RateLimit)
    }

    fn severity(&self) -> ErrorSeverity {
        match self.kind {
            ErrorKind::NotFound => ErrorSeverity::Info,
            ErrorKind::Authentication | ErrorKind::Authorization | ErrorKind::RateLimit => {
                ErrorSeverity::Warning
            }
            ErrorKind::Validation | ErrorKind::ExternalService => ErrorSeverity::Error,
            ErrorKind::Internal => ErrorSeverity::Critical,
        }
    }
}
