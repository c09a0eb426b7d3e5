use std::error::Error as StdError;

use serde::Serialize;
use serde_json::{json, Value};

use super::{ClassifiedError, ErrorKind};

/// Status code and JSON body an API route should answer with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    /// HTTP status code
    pub status_code: u16,
    /// `{"error": {"type", "message", "details"?}}`
    pub body: Value,
}

impl ErrorResponse {
    /// Map any error to a route response.
    ///
    /// The error and its `source()` chain are searched for a
    /// [`ClassifiedError`]; the first one found supplies status and body.
    /// Anything else becomes an opaque 500.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut current = Some(err);
        while let Some(e) = current {
            if let Some(classified) = e.downcast_ref::<ClassifiedError>() {
                return Self::from(classified);
            }
            current = e.source();
        }

        tracing_unexpected(err);
        Self {
            status_code: ErrorKind::Internal.status_code(),
            body: json!({
                "error": {
                    "type": ErrorKind::Internal.as_str(),
                    "message": "An unexpected error occurred",
                }
            }),
        }
    }
}

impl From<&ClassifiedError> for ErrorResponse {
    fn from(err: &ClassifiedError) -> Self {
        Self { status_code: err.status_code(), body: err.to_response() }
    }
}

#[cfg(feature = "observability")]
fn tracing_unexpected(err: &(dyn StdError + 'static)) {
    tracing::error!(error = %err, "Unexpected error");
}

#[cfg(not(feature = "observability"))]
fn tracing_unexpected(_err: &(dyn StdError + 'static)) {}
