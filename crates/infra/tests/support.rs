#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use castkit_common::resilience::RetryPolicy;
use castkit_common::testing::RecordingLogger;
use castkit_infra::http::{
    ApiClient, HttpRequestSpec, HttpTransport, TransportError, TransportResponse,
};
use tokio_util::sync::CancellationToken;

type Reply = Result<TransportResponse, TransportError>;

/// Transport that records every request and answers from a script.
///
/// The last scripted reply repeats once the script runs out.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    requests: Arc<Mutex<Vec<HttpRequestSpec>>>,
    replies: Arc<Mutex<VecDeque<Reply>>>,
    cancel_on_send: Option<CancellationToken>,
}

impl RecordingTransport {
    pub fn new<I: IntoIterator<Item = Reply>>(replies: I) -> Self {
        Self { replies: Arc::new(Mutex::new(replies.into_iter().collect())), ..Self::default() }
    }

    pub fn replying(status: u16, body: &str) -> Self {
        Self::new([Ok(TransportResponse::new(status, body))])
    }

    /// Cancel `token` from inside every send.
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_send = Some(token);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequestSpec> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: &HttpRequestSpec) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(token) = &self.cancel_on_send {
            token.cancel();
        }

        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().expect("RecordingTransport needs at least one reply")
        }
    }
}

/// Three attempts with millisecond delays.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 2.0)
}

/// Client for `base_url` with a fast policy and a recording logger.
pub fn client_with_logger(base_url: &str) -> (ApiClient, RecordingLogger) {
    let logger = RecordingLogger::new();
    let client = ApiClient::builder(base_url)
        .retry_policy(fast_policy())
        .logger(Arc::new(logger.clone()))
        .build()
        .unwrap();
    (client, logger)
}
