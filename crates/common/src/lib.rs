//! Modular common utilities shared across castkit crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error taxonomy, error classification, query-string helpers
//! - `observability`: leveled logging capability forwarded to `tracing`
//! - `runtime`: async backoff executor (tokio, cancellation)
//! - `test-utils`: recording logger and other test doubles

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Observability tier
// --------------------------------------------------------------
#[cfg(feature = "observability")]
pub mod observability;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "observability")))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{
    ClassifiedError, ErrorClassification, ErrorKind, ErrorResponse, ErrorSeverity,
};
#[cfg(feature = "observability")]
pub use observability::{LogLevel, Logger, Metadata, NoOpLogger, TracingLogger};
#[cfg(feature = "runtime")]
pub use resilience::{
    retry, BackoffSchedule, RetryCondition, RetryDecision, RetryError, RetryExecutor,
    RetryOutcome, RetryPolicy, RetryResult,
};
#[cfg(feature = "foundation")]
pub use utils::query::{parse_query_string, to_query_string, QueryParams};
