//! Tracing subscriber setup
//!
//! Library code logs through the [`Logger`](castkit_common::Logger)
//! capability, which forwards to `tracing`. Binaries call [`init_tracing`]
//! once at startup to decide where those events go.
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

use std::fmt;
use std::str::FromStr;

use castkit_common::observability::LogLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Observability setup errors
#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// A global subscriber was installed earlier
    #[error("tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Output format of the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging section of the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level emitted
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
}

/// `tracing` level filter for a [`LogLevel`].
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns [`ObservabilityError::AlreadyInitialized`] when a global
/// subscriber is already set; the existing one stays in place.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter(config.level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match config.format {
        LogFormat::Text => builder.with_ansi(false).try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    installed.map_err(|e| ObservabilityError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(level = %config.level, format = %config.format, "tracing initialized");
    Ok(())
}
