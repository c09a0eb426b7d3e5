use thiserror::Error;

use super::policy::InvalidPolicy;

/// Terminal failure of a retried operation
///
/// Every variant that ends because of an operation failure carries the
/// original error unchanged, so callers can still inspect its kind.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The attempt budget ran out; `source` is the last error observed
    #[error("all {attempts} attempts failed: {source}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Last error
        source: E,
    },

    /// The retry condition refused to retry `source`
    #[error("operation failed with non-retryable error after {attempts} attempt(s): {source}")]
    NonRetryable {
        /// Attempts made
        attempts: u32,
        /// Error that stopped the loop
        source: E,
    },

    /// Cancellation was observed before the next attempt could start
    #[error("retry cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts made before cancellation
        attempts: u32,
        /// Error of the last completed attempt, if any
        last_error: Option<E>,
    },

    /// The policy failed validation; no attempt was made
    #[error(transparent)]
    InvalidPolicy(#[from] InvalidPolicy),
}

impl<E> RetryError<E> {
    /// Attempts made before the loop ended.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::NonRetryable { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
            Self::InvalidPolicy(_) => 0,
        }
    }

    /// The operation error that ended the loop, when there is one.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { source, .. } | Self::NonRetryable { source, .. } => Some(source),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
            Self::InvalidPolicy(_) => None,
        }
    }

    /// Consume the error and return the operation error, when there is one.
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Exhausted { source, .. } | Self::NonRetryable { source, .. } => Some(source),
            Self::Cancelled { last_error, .. } => last_error,
            Self::InvalidPolicy(_) => None,
        }
    }

    /// True when the loop stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for retried operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;
