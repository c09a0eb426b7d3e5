use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable error taxonomy
///
/// Each kind owns a fixed HTTP status code; see the table in the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or rejected input (400)
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    /// Missing or invalid credentials (401)
    #[serde(rename = "AUTHENTICATION_ERROR")]
    Authentication,
    /// Authenticated but not permitted (403)
    #[serde(rename = "AUTHORIZATION_ERROR")]
    Authorization,
    /// Resource does not exist (404)
    #[serde(rename = "NOT_FOUND_ERROR")]
    NotFound,
    /// Bug or invariant violation on our side (500)
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
    /// Upstream service or transport failure (502)
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalService,
    /// Caller exceeded a quota (429)
    #[serde(rename = "RATE_LIMIT_ERROR")]
    RateLimit,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Validation,
        Self::Authentication,
        Self::Authorization,
        Self::NotFound,
        Self::Internal,
        Self::ExternalService,
        Self::RateLimit,
    ];

    /// HTTP status code associated with this kind.
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Authentication => 401,
            Self::Authorization => 403,
            Self::NotFound => 404,
            Self::Internal => 500,
            Self::ExternalService => 502,
            Self::RateLimit => 429,
        }
    }

    /// Wire name used in API-route error bodies.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Authentication => "AUTHENTICATION_ERROR",
            Self::Authorization => "AUTHORIZATION_ERROR",
            Self::NotFound => "NOT_FOUND_ERROR",
            Self::Internal => "INTERNAL_ERROR",
            Self::ExternalService => "EXTERNAL_SERVICE_ERROR",
            Self::RateLimit => "RATE_LIMIT_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown error kind '{s}'"))
    }
}
