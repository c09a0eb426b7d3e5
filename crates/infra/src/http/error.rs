use castkit_common::error::{
    ClassifiedError, ErrorClassification, ErrorKind, ErrorResponse, ErrorSeverity,
};
use castkit_common::resilience::RetryError;
use thiserror::Error;

/// Error returned by every [`ApiClient`](super::ApiClient) call
///
/// Each variant resolves to a stable [`ErrorKind`] and numeric status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed without being retried
    #[error("{0}")]
    Request(#[from] ClassifiedError),

    /// More than one attempt was made and the call still failed, either by
    /// running out of attempts or by hitting a non-retryable error after a
    /// retry; `source` is the last classified error
    #[error("request failed after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Attempts made
        attempts: u32,
        /// Last observed error
        #[source]
        source: ClassifiedError,
    },

    /// Cancellation stopped the retry loop
    #[error("request cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts made
        attempts: u32,
        /// Error of the last completed attempt
        #[source]
        last_error: Option<ClassifiedError>,
    },
}

impl ApiError {
    /// The classified error behind this failure, when one was observed.
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Request(err) | Self::RetryExhausted { source: err, .. } => Some(err),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Stable kind. A cancellation before any failure is `ExternalService`,
    /// since the upstream exchange never completed.
    pub fn kind(&self) -> ErrorKind {
        self.classified().map_or(ErrorKind::ExternalService, ClassifiedError::kind)
    }

    /// Numeric status derived from [`kind`](Self::kind)
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Status and body an API route should answer with.
    pub fn to_response(&self) -> ErrorResponse {
        match self.classified() {
            Some(err) => ErrorResponse::from(err),
            None => ErrorResponse::from(&ClassifiedError::external_service(self.to_string())),
        }
    }

    /// Attempts made before the error surfaced.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Request(_) => 1,
            Self::RetryExhausted { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
        }
    }
}

impl From<RetryError<ClassifiedError>> for ApiError {
    fn from(err: RetryError<ClassifiedError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, source }
            | RetryError::NonRetryable { attempts, source }
                if attempts > 1 =>
            {
                Self::RetryExhausted { attempts, source }
            }
            RetryError::Exhausted { source, .. } | RetryError::NonRetryable { source, .. } => {
                Self::Request(source)
            }
            RetryError::Cancelled { attempts, last_error } => Self::Cancelled { attempts, last_error },
            RetryError::InvalidPolicy(invalid) => {
                Self::Request(ClassifiedError::internal(invalid.to_string()))
            }
        }
    }
}

impl ErrorClassification for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled { .. } => false,
            other => other.classified().is_some_and(ClassifiedError::is_retryable),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        self.classified().map_or(ErrorSeverity::Warning, ClassifiedError::severity)
    }
}
