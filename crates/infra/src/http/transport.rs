//! Transport seam between the typed client and the network
//!
//! [`ApiClient`](super::ApiClient) builds one [`HttpRequestSpec`] per call and
//! hands it to an [`HttpTransport`] once per attempt. Status codes are not
//! interpreted here; any response that arrives is returned as-is and only
//! failures to obtain a response are errors.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// HTTP verbs the client issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Upper-case method name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Patch => Self::PATCH,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// Caching preference for a request, mirroring the fetch cache modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheHint {
    /// Let intermediaries decide
    Default,
    /// Do not store the response anywhere
    NoStore,
    /// Bypass caches and fetch a fresh copy
    Reload,
    /// Revalidate any cached copy before use
    NoCache,
    /// Prefer a cached copy, even a stale one
    ForceCache,
    /// Only answer from cache
    OnlyIfCached,
}

impl CacheHint {
    /// `Cache-Control` request directive expressing this hint, if any.
    pub const fn cache_control(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::NoStore => Some("no-store"),
            Self::Reload => Some("no-cache"),
            Self::NoCache => Some("max-age=0"),
            Self::ForceCache => Some("max-stale"),
            Self::OnlyIfCached => Some("only-if-cached"),
        }
    }
}

/// Fully resolved request, built once per call and reused by every attempt
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequestSpec {
    /// Verb
    pub method: HttpMethod,
    /// Absolute URL including the query string
    pub url: Url,
    /// Merged headers
    pub headers: BTreeMap<String, String>,
    /// JSON body, serialized by the transport
    pub body: Option<Value>,
    /// Caching preference
    pub cache: Option<CacheHint>,
}

/// Raw response: status and body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Undecoded body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Response with a body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    /// True for 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why no response was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The per-attempt timeout elapsed
    Timeout,
    /// No connection could be established
    Connect,
    /// The request could not be built or sent
    Request,
    /// The response body could not be read
    Body,
}

impl TransportErrorKind {
    /// Snake-case name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
        }
    }
}

/// Failure to obtain a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error: {message}", .kind.as_str())]
pub struct TransportError {
    /// Failure category
    pub kind: TransportErrorKind,
    /// Underlying cause
    pub message: String,
}

impl TransportError {
    /// Error of `kind`.
    pub fn new<S: Into<String>>(kind: TransportErrorKind, message: S) -> Self {
        Self { kind, message: message.into() }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Request
        };
        Self::new(kind, err.to_string())
    }
}

/// Performs a single HTTP exchange
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Send `request` and return whatever response arrives.
    async fn send(&self, request: &HttpRequestSpec) -> Result<TransportResponse, TransportError>;
}

/// [`HttpTransport`] backed by a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Transport whose attempts time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportErrorKind::Request`] when the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = ReqwestClient::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequestSpec) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(directive) = request.cache.and_then(CacheHint::cache_control) {
            builder = builder.header(reqwest::header::CACHE_CONTROL, directive);
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| TransportError::new(TransportErrorKind::Request, e.to_string()))?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(TransportResponse { status, body: body.to_vec() })
    }
}
