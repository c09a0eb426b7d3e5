//! Typed HTTP client
//!
//! [`ApiClient`] resolves paths under a base URL, layers headers, sends JSON
//! through an [`HttpTransport`] inside the backoff executor, and turns
//! non-success responses into classified errors.
//!
//! | status | kind | message |
//! |---|---|---|
//! | 400 | `Validation` | `Bad request` |
//! | 404 | `NotFound` | `Resource not found` |
//! | other non-2xx | `ExternalService` | `API request failed with status N` |
//!
//! Transport failures and per-attempt timeouts are `ExternalService` too.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{
    ApiClient, ApiClientBuilder, RequestOptions, RetryScope, BASE_API_URL, DEFAULT_TIMEOUT,
    FARCASTER_API_URL,
};
pub use error::ApiError;
pub use transport::{
    CacheHint, HttpMethod, HttpRequestSpec, HttpTransport, ReqwestTransport, TransportError,
    TransportErrorKind, TransportResponse,
};
