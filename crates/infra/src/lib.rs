//! # Castkit Infrastructure
//!
//! Everything that touches the network, the environment or the global
//! tracing dispatcher.
//!
//! This crate contains:
//! - The typed HTTP client and its transport seam ([`http`])
//! - Configuration loading from the environment and files ([`config`])
//! - Tracing subscriber initialisation ([`observability`])
//!
//! ## Architecture
//! - Builds on the error taxonomy, logging capability and backoff executor
//!   of `castkit-common`
//! - Contains all "impure" code (I/O, process environment)

pub mod config;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use config::{CastkitConfig, ConfigError};
pub use http::{ApiClient, ApiError, RequestOptions};
pub use observability::{init_tracing, LogFormat, LoggingConfig};
