//! Log severity levels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Log severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose diagnostics
    Debug,
    /// Normal operation
    #[default]
    Info,
    /// Degraded but operational
    Warn,
    /// Failure
    Error,
}

impl LogLevel {
    /// Lowercase name, also a valid `EnvFilter` directive.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Whether a message at `self` passes a `threshold`.
    pub fn enabled_at(self, threshold: Self) -> bool {
        self >= threshold
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}
