use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use castkit_common::error::{ClassifiedError, Details};
use castkit_common::observability::{LogLevel, Logger, Metadata, NoOpLogger, TracingLogger};
use castkit_common::resilience::policies::RetryTransient;
use castkit_common::resilience::{RetryCondition, RetryDecision, RetryExecutor, RetryPolicy};
use castkit_common::utils::QueryParams;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;

use super::error::ApiError;
use super::transport::{
    CacheHint, HttpMethod, HttpRequestSpec, HttpTransport, ReqwestTransport, TransportError,
    TransportResponse,
};

/// Farcaster API root
pub const FARCASTER_API_URL: &str = "https://api.farcaster.xyz/v1";
/// Base API root
pub const BASE_API_URL: &str = "https://api.base.org/v1";
/// Per-attempt timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";

/// Which classified errors the client retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryScope {
    /// Only transient kinds (`ExternalService`, `RateLimit`); client errors
    /// fail on the first attempt
    #[default]
    Transient,
    /// Every kind, including `Validation` and `NotFound`
    All,
}

impl RetryCondition<ClassifiedError> for RetryScope {
    fn should_retry(&self, error: &ClassifiedError, attempt: u32) -> RetryDecision {
        match self {
            Self::Transient => RetryTransient.should_retry(error, attempt),
            Self::All => RetryDecision::Retry,
        }
    }
}

/// Per-call options
///
/// ```rust
/// use castkit_infra::http::{CacheHint, RequestOptions};
///
/// let options = RequestOptions::new()
///     .param("fid", 3)
///     .param_opt("cursor", None::<String>)
///     .header("X-Request-Id", "abc")
///     .cache(CacheHint::NoStore);
/// assert_eq!(options.headers["X-Request-Id"], "abc");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query parameters; absent values are skipped
    pub params: QueryParams,
    /// Headers layered over the client defaults
    pub headers: BTreeMap<String, String>,
    /// Caching preference
    pub cache: Option<CacheHint>,
    /// Retry policy overriding the client's
    pub retry: Option<RetryPolicy>,
    /// Stops scheduling further attempts once cancelled
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// No params, headers or overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter.
    #[must_use]
    pub fn param<K: Into<String>, V: Display>(mut self, key: K, value: V) -> Self {
        self.params.push(key, Some(value));
        self
    }

    /// Add a query parameter that is omitted when `None`.
    #[must_use]
    pub fn param_opt<K: Into<String>, V: Display>(mut self, key: K, value: Option<V>) -> Self {
        self.params.push(key, value);
        self
    }

    /// Replace the query parameters.
    #[must_use]
    pub fn params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the caching preference.
    #[must_use]
    pub fn cache(mut self, hint: CacheHint) -> Self {
        self.cache = Some(hint);
        self
    }

    /// Override the retry policy for this call.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Stop retrying once `token` is cancelled.
    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Typed JSON client for one API root
///
/// Every call builds its own request and retry loop; clones share only the
/// transport (and so the connection pool).
///
/// ```rust,no_run
/// use castkit_infra::http::{ApiClient, RequestOptions};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     fid: u64,
/// }
///
/// # async fn run() -> Result<(), castkit_infra::ApiError> {
/// let client = ApiClient::farcaster()?;
/// let user: User = client.get("user", RequestOptions::new().param("fid", 3)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    default_headers: BTreeMap<String, String>,
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
    scope: RetryScope,
    logger: Arc<dyn Logger>,
}

impl ApiClient {
    /// Client for `base_url` with extra default headers.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error when `base_url` is not an absolute URL,
    /// and an `Internal` error when the HTTP transport cannot be built.
    pub fn new<I, K, V>(base_url: &str, default_headers: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::builder(base_url).headers(default_headers).build()
    }

    /// Start building a client for `base_url`.
    pub fn builder<S: Into<String>>(base_url: S) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    /// Client for the Farcaster API.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::new`].
    pub fn farcaster() -> Result<Self, ApiError> {
        Self::builder(FARCASTER_API_URL).build()
    }

    /// Client for the Base API.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::new`].
    pub fn base() -> Result<Self, ApiError> {
        Self::builder(BASE_API_URL).build()
    }

    /// Root every relative path resolves under (always ends in `/`)
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers sent with every request
    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }

    /// Policy used when a call does not override it
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Which errors are retried
    pub fn retry_scope(&self) -> RetryScope {
        self.scope
    }

    /// Resolve `path` under the base URL and append the present params.
    ///
    /// A leading `/` does not discard the base path, and absolute `http(s)`
    /// URLs are used as they are. Any other path stays under the base, even
    /// one that looks like a URL with another scheme (`fid:3`, `ftp://x/y`).
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error when `path` cannot be resolved.
    pub fn build_url(&self, path: &str, params: &QueryParams) -> Result<Url, ApiError> {
        let mut url = match Url::parse(path) {
            Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => absolute,
            _ => self.base_url.join(&format!("./{}", path.trim_start_matches('/'))).map_err(|e| {
                ClassifiedError::validation(format!("Invalid request path '{path}': {e}"))
            })?,
        };
        params.append_to(&mut url);
        Ok(url)
    }

    /// Build the request a call would send, without sending it.
    ///
    /// # Errors
    ///
    /// See [`build_url`](Self::build_url).
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> Result<HttpRequestSpec, ApiError> {
        let url = self.build_url(path, &options.params)?;
        let mut headers = self.default_headers.clone();
        for (name, value) in &options.headers {
            merge_header(&mut headers, name, value);
        }
        Ok(HttpRequestSpec { method, url, headers, body, cache: options.cache })
    }

    /// GET `path`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; see [`ApiError`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(HttpMethod::Get, path, None, options).await
    }

    /// POST `body` as JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; see [`ApiError`].
    pub async fn post<T, B>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        self.request(HttpMethod::Post, path, body, options).await
    }

    /// PUT `body` as JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; see [`ApiError`].
    pub async fn put<T, B>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        self.request(HttpMethod::Put, path, body, options).await
    }

    /// PATCH `path` with `body` as JSON.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; see [`ApiError`].
    pub async fn patch<T, B>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        self.request(HttpMethod::Patch, path, body, options).await
    }

    /// DELETE `path`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; see [`ApiError`].
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(HttpMethod::Delete, path, None, options).await
    }

    /// Send one request through the retry loop and decode the response.
    ///
    /// Non-2xx responses are classified (400 `Validation`, 404 `NotFound`,
    /// anything else `ExternalService`) and handed to the retry loop. A 204
    /// decodes `T` from an empty JSON object.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; see [`ApiError`].
    #[instrument(skip(self, method, body, options), fields(method = %method))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = self.build_request(method, path, body, &options)?;
        let context = request_context(&request);

        let mut executor = RetryExecutor::new(options.retry.unwrap_or(self.retry))
            .with_condition(self.scope)
            .with_logger(Arc::new(NoOpLogger));
        if let Some(token) = options.cancel {
            executor = executor.with_cancellation(token);
        }

        let outcome = executor
            .execute_with_notify(
                || self.attempt(&request, &context),
                |error: &ClassifiedError, attempt| {
                    let mut record = context.clone();
                    record.insert("error".into(), Value::from(error.to_string()));
                    self.logger.warn(&format!("API request retry {attempt}"), Some(&record));
                },
            )
            .await;

        let decoded = match outcome {
            Ok(response) => decode(&response).map_err(ApiError::from),
            Err(err) => Err(ApiError::from(err)),
        };

        if let Err(err) = &decoded {
            let mut record = context;
            record.insert("error".into(), Value::from(err.to_string()));
            record.insert("kind".into(), Value::from(err.kind().as_str()));
            record.insert("status".into(), Value::from(err.status_code()));
            record.insert("attempts".into(), Value::from(err.attempts()));
            self.logger.error("API request failed", Some(&record));
        }
        decoded
    }

    async fn attempt(
        &self,
        request: &HttpRequestSpec,
        context: &Metadata,
    ) -> Result<TransportResponse, ClassifiedError> {
        self.logger.debug("API request", Some(context));

        let response = self.transport.send(request).await.map_err(transport_failure)?;
        if response.is_success() {
            return Ok(response);
        }
        Err(ClassifiedError::from_status(response.status, error_body(&response.body)))
    }
}

/// Builder for [`ApiClient`]
#[derive(Debug)]
pub struct ApiClientBuilder {
    base_url: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    retry: RetryPolicy,
    scope: RetryScope,
    transport: Option<Arc<dyn HttpTransport>>,
    logger: Option<Arc<dyn Logger>>,
}

impl ApiClientBuilder {
    fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            scope: RetryScope::default(),
            transport: None,
            logger: None,
        }
    }

    /// Add a default header; later headers win on name conflicts.
    #[must_use]
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add several default headers.
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Per-attempt timeout of the default transport.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Default retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Which errors to retry.
    #[must_use]
    pub fn retry_scope(mut self, scope: RetryScope) -> Self {
        self.scope = scope;
        self
    }

    /// Send through `transport` instead of a fresh reqwest client.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Report attempts, retries and failures to `logger`.
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for a base URL that is not absolute or a
    /// retry policy that fails validation, and an `Internal` error when the
    /// HTTP transport cannot be built.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = parse_base_url(&self.base_url)?;

        self.retry.validate().map_err(|e| ClassifiedError::validation(e.to_string()))?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeout).map_err(|e| {
                ClassifiedError::internal(format!("Failed to build HTTP transport: {e}"))
            })?),
        };

        let mut default_headers = BTreeMap::new();
        default_headers.insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
        for (name, value) in &self.headers {
            merge_header(&mut default_headers, name, value);
        }

        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger::new(LogLevel::Debug).with_prefix("api")));

        Ok(ApiClient {
            base_url,
            default_headers,
            transport,
            retry: self.retry,
            scope: self.scope,
            logger,
        })
    }
}

/// Parse the base URL and make its path a directory, so relative paths
/// resolve beneath it.
fn parse_base_url(raw: &str) -> Result<Url, ClassifiedError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ClassifiedError::validation(format!("Invalid base URL '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ClassifiedError::validation(format!("Invalid base URL '{raw}': not a base")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Insert a header, replacing any existing one whose name differs only in
/// case.
fn merge_header(headers: &mut BTreeMap<String, String>, name: &str, value: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.to_string());
}

fn encode_body<B: Serialize + ?Sized>(body: Option<&B>) -> Result<Option<Value>, ClassifiedError> {
    body.map(serde_json::to_value)
        .transpose()
        .map_err(|e| ClassifiedError::validation(format!("Failed to serialize request body: {e}")))
}

fn request_context(request: &HttpRequestSpec) -> Metadata {
    let mut context = Metadata::new();
    context.insert("method".into(), Value::from(request.method.as_str()));
    context.insert("url".into(), Value::from(request.url.as_str()));
    context
}

/// Parsed JSON error body, or an empty object when the body is missing or
/// not a JSON object.
fn error_body(body: &[u8]) -> Details {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Details::new(),
    }
}

fn transport_failure(err: TransportError) -> ClassifiedError {
    let mut details = Details::new();
    details.insert("cause".into(), Value::from(err.kind.as_str()));
    ClassifiedError::external_service(format!("API request failed: {}", err.message))
        .with_details(details)
}

/// Decode a successful response. A 204 is read as an empty JSON object, or
/// as `null` for types that cannot be built from one (`()`, `Option`).
fn decode<T: DeserializeOwned>(response: &TransportResponse) -> Result<T, ClassifiedError> {
    let decoded = if response.status == 204 {
        serde_json::from_value(Value::Object(Map::new()))
            .or_else(|_| serde_json::from_value(Value::Null))
    } else {
        serde_json::from_slice(&response.body)
    };

    decoded.map_err(|e| {
        let mut details = Details::new();
        details.insert("status".into(), Value::from(response.status));
        details.insert("error".into(), Value::from(e.to_string()));
        ClassifiedError::internal("Failed to decode API response").with_details(details)
    })
}
