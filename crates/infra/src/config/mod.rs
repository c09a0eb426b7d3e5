//! Configuration loading and management
//!
//! [`CastkitConfig`] gathers the API endpoints, the default retry policy and
//! the logging setup. [`load`] layers environment variables over a TOML/JSON
//! file over the defaults.

pub mod loader;

use std::path::PathBuf;
use std::time::Duration;

use castkit_common::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::{ApiClient, ApiError, BASE_API_URL, DEFAULT_TIMEOUT, FARCASTER_API_URL};
use crate::observability::LoggingConfig;

pub use loader::{find_config_file, load, load_from_env, load_from_file};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// None of the recognised environment variables is set
    #[error("no configuration found in environment variables")]
    Missing,

    /// A value is present but unusable
    #[error("invalid value for {key}: {message}")]
    Invalid {
        /// Variable or field name
        key: String,
        /// What was wrong
        message: String,
    },

    /// The config file could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        /// File that failed
        path: PathBuf,
        /// I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The config file is malformed
    #[error("invalid {format} in {}: {message}", .path.display())]
    Parse {
        /// File that failed
        path: PathBuf,
        /// `TOML` or `JSON`
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// An explicit config path does not exist
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension is neither `toml` nor `json`
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

/// API endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Farcaster API base URL
    pub farcaster_url: String,
    /// Base chain API base URL
    pub base_url: String,
    /// Per-attempt timeout
    #[serde(rename = "timeout_ms", with = "castkit_common::utils::serde::duration_millis")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            farcaster_url: FARCASTER_API_URL.to_string(),
            base_url: BASE_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Complete castkit configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CastkitConfig {
    /// Endpoints and timeout
    pub api: ApiConfig,
    /// Default retry policy for API clients
    pub retry: RetryPolicy,
    /// Subscriber setup
    pub logging: LoggingConfig,
}

impl CastkitConfig {
    /// Reject settings no client could run with.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry
            .validate()
            .map_err(|e| ConfigError::Invalid { key: "retry".into(), message: e.message })?;
        if self.api.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "api.timeout_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Client for the configured Farcaster endpoint.
    ///
    /// # Errors
    ///
    /// Fails when the URL does not parse.
    pub fn farcaster_client(&self) -> Result<ApiClient, ApiError> {
        self.client_for(&self.api.farcaster_url)
    }

    /// Client for the configured Base endpoint.
    ///
    /// # Errors
    ///
    /// Fails when the URL does not parse.
    pub fn base_client(&self) -> Result<ApiClient, ApiError> {
        self.client_for(&self.api.base_url)
    }

    fn client_for(&self, base_url: &str) -> Result<ApiClient, ApiError> {
        ApiClient::builder(base_url)
            .timeout(self.api.timeout)
            .retry_policy(self.retry)
            .build()
    }
}
