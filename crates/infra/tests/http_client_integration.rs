//! End-to-end behavior of the typed API client against a mock server.

mod support;

use std::sync::Arc;
use std::time::Duration;

use castkit_common::error::{ErrorKind, ErrorResponse};
use castkit_common::observability::LogLevel;
use castkit_common::resilience::RetryPolicy;
use castkit_common::testing::RecordingLogger;
use castkit_infra::http::{
    ApiClient, ApiError, CacheHint, RequestOptions, RetryScope, TransportError,
    TransportErrorKind, TransportResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use support::{client_with_logger, fast_policy, RecordingTransport};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    fid: u64,
    username: String,
}

#[derive(Debug, Serialize)]
struct NewCast<'a> {
    text: &'a str,
}

#[tokio::test]
async fn get_resolves_path_and_params_under_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/user"))
        .and(query_param("fid", "3"))
        .and(query_param_is_missing("cursor"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fid": 3, "username": "dwr" })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_logger(&format!("{}/v1", server.uri()));
    let user: User = client
        .get("/user", RequestOptions::new().param("fid", 3).param_opt("cursor", None::<&str>))
        .await
        .unwrap();

    assert_eq!(user, User { fid: 3, username: "dwr".into() });
}

#[tokio::test]
async fn post_sends_json_body_with_layered_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/casts"))
        .and(header("authorization", "Bearer t"))
        .and(header("x-request-id", "abc"))
        .and(body_json(json!({ "text": "gm" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "hash": "0xabc" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), [("Authorization", "Bearer t")]).unwrap();
    let created: Value = client
        .post(
            "casts",
            Some(&NewCast { text: "gm" }),
            RequestOptions::new().header("X-Request-Id", "abc"),
        )
        .await
        .unwrap();

    assert_eq!(created["hash"], "0xabc");
}

#[tokio::test]
async fn put_patch_and_delete_use_their_verbs() {
    let server = MockServer::start().await;
    for verb in ["PUT", "PATCH", "DELETE"] {
        Mock::given(method(verb))
            .and(path("/casts/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "verb": verb })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (client, _) = client_with_logger(&server.uri());
    let body = json!({ "text": "edited" });

    let put: Value = client.put("casts/1", Some(&body), RequestOptions::new()).await.unwrap();
    let patch: Value = client.patch("casts/1", Some(&body), RequestOptions::new()).await.unwrap();
    let delete: Value = client.delete("casts/1", RequestOptions::new()).await.unwrap();

    assert_eq!(put["verb"], "PUT");
    assert_eq!(patch["verb"], "PATCH");
    assert_eq!(delete["verb"], "DELETE");
}

#[tokio::test]
async fn not_found_keeps_body_as_details_and_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "msg": "gone" })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_logger(&server.uri());
    let err = client.get::<Value>("casts/0x1", RequestOptions::new()).await.unwrap_err();

    assert!(matches!(err, ApiError::Request(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status_code(), 404);
    let classified = err.classified().unwrap();
    assert_eq!(classified.message(), "Resource not found");
    assert_eq!(classified.detail("msg"), Some(&json!("gone")));
}

#[tokio::test]
async fn bad_request_is_validation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "field": "text" })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_logger(&server.uri());
    let err = client
        .post::<Value, _>("casts", Some(&json!({})), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.classified().unwrap().message(), "Bad request");
    assert_eq!(err.to_response().status_code, 400);
}

#[tokio::test]
async fn persistent_server_errors_exhaust_the_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .expect(3)
        .mount(&server)
        .await;

    let (client, _) = client_with_logger(&server.uri());
    let err = client.get::<Value>("feed", RequestOptions::new()).await.unwrap_err();

    match &err {
        ApiError::RetryExhausted { attempts, source } => {
            assert_eq!(*attempts, 3);
            assert_eq!(source.message(), "API request failed with status 500");
            assert_eq!(source.detail("status"), Some(&json!(500)));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::ExternalService);
    assert_eq!(err.status_code(), 502);
    assert_eq!(ErrorResponse::from_error(&err).status_code, 502);
}

#[tokio::test]
async fn transient_failures_recover() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, logger) = client_with_logger(&server.uri());
    let body: Value = client.get("health", RequestOptions::new()).await.unwrap();

    assert_eq!(body, json!({ "ok": true }));
    assert_eq!(
        logger.levels(),
        vec![LogLevel::Debug, LogLevel::Warn, LogLevel::Debug, LogLevel::Warn, LogLevel::Debug]
    );
}

#[tokio::test]
async fn retry_scope_all_retries_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let client = ApiClient::builder(server.uri())
        .retry_policy(fast_policy())
        .retry_scope(RetryScope::All)
        .build()
        .unwrap();
    let err = client.get::<Value>("missing", RequestOptions::new()).await.unwrap_err();

    assert!(matches!(err, ApiError::RetryExhausted { attempts: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn per_call_policy_overrides_client_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_logger(&server.uri());
    let err = client
        .get::<Value>("feed", RequestOptions::new().retry(RetryPolicy::no_retry()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Request(_)));
    assert_eq!(err.attempts(), 1);
}

#[tokio::test]
async fn no_content_decodes_as_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (client, _) = client_with_logger(&server.uri());
    let body: Value = client.delete("casts/1", RequestOptions::new()).await.unwrap();
    assert_eq!(body, json!({}));

    client.delete::<()>("casts/2", RequestOptions::new()).await.unwrap();
}

#[tokio::test]
async fn malformed_success_body_is_internal_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_logger(&server.uri());
    let err = client.get::<User>("user", RequestOptions::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn slow_upstream_times_out_as_external_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = ApiClient::builder(server.uri())
        .timeout(Duration::from_millis(50))
        .retry_policy(RetryPolicy::no_retry())
        .build()
        .unwrap();
    let err = client.get::<Value>("slow", RequestOptions::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalService);
    assert_eq!(err.classified().unwrap().detail("cause"), Some(&json!("timeout")));
}

#[tokio::test]
async fn headers_merge_case_insensitively_with_later_layers_winning() {
    let transport = RecordingTransport::replying(200, "{}");
    let client = ApiClient::builder("https://api.example.com/v2")
        .header("X-Api-Key", "default")
        .header("x-api-key", "configured")
        .transport(Arc::new(transport.clone()))
        .build()
        .unwrap();

    let options = RequestOptions::new()
        .header("CONTENT-TYPE", "application/merge-patch+json")
        .cache(CacheHint::NoStore);
    let _: Value = client.patch("items/7", Some(&json!({ "a": 1 })), options).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.url.as_str(), "https://api.example.com/v2/items/7");
    assert_eq!(sent.headers.len(), 2);
    assert_eq!(sent.headers["x-api-key"], "configured");
    assert_eq!(sent.headers["CONTENT-TYPE"], "application/merge-patch+json");
    assert_eq!(sent.cache, Some(CacheHint::NoStore));
    assert_eq!(sent.body, Some(json!({ "a": 1 })));
}

#[tokio::test]
async fn every_attempt_sends_the_same_request() {
    let transport = RecordingTransport::new([
        Err(TransportError::new(TransportErrorKind::Connect, "refused")),
        Ok(TransportResponse::new(502, "")),
        Ok(TransportResponse::new(200, r#"{"fid":1,"username":"v"}"#)),
    ]);
    let client = ApiClient::builder("https://h/p")
        .retry_policy(fast_policy())
        .transport(Arc::new(transport.clone()))
        .build()
        .unwrap();

    let user: User = client.get("user", RequestOptions::new().param("fid", 1)).await.unwrap();

    assert_eq!(user.fid, 1);
    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r == &requests[0]));
    assert_eq!(requests[0].url.as_str(), "https://h/p/user?fid=1");
}

#[tokio::test]
async fn client_error_after_a_retry_reports_every_attempt() {
    let transport = RecordingTransport::new([
        Ok(TransportResponse::new(503, "")),
        Ok(TransportResponse::new(404, r#"{"msg":"gone"}"#)),
    ]);
    let logger = RecordingLogger::new();
    let client = ApiClient::builder("https://h")
        .retry_policy(fast_policy())
        .transport(Arc::new(transport.clone()))
        .logger(Arc::new(logger.clone()))
        .build()
        .unwrap();

    let err = client.get::<Value>("casts/0x1", RequestOptions::new()).await.unwrap_err();

    assert_eq!(transport.requests().len(), 2);
    assert_eq!(err.attempts(), 2);
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.classified().unwrap().detail("msg"), Some(&json!("gone")));

    let errors = logger.at(LogLevel::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("attempts"), Some(&json!(2)));
    assert_eq!(errors[0].field("kind"), Some(&json!("NOT_FOUND_ERROR")));
}

#[tokio::test]
async fn cancelled_token_stops_before_the_first_attempt() {
    let transport = RecordingTransport::replying(200, "{}");
    let client = ApiClient::builder("https://h")
        .transport(Arc::new(transport.clone()))
        .build()
        .unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let err = client.get::<Value>("x", RequestOptions::new().cancel_on(token)).await.unwrap_err();

    assert!(matches!(err, ApiError::Cancelled { attempts: 0, last_error: None }));
    assert_eq!(err.kind(), ErrorKind::ExternalService);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn cancellation_during_backoff_keeps_last_error() {
    let token = CancellationToken::new();
    let transport = RecordingTransport::replying(503, "").cancelling(token.clone());
    let client = ApiClient::builder("https://h")
        .retry_policy(RetryPolicy::new(5, Duration::from_secs(60), Duration::from_secs(60), 1.0))
        .transport(Arc::new(transport.clone()))
        .build()
        .unwrap();

    let err = client.get::<Value>("x", RequestOptions::new().cancel_on(token)).await.unwrap_err();

    match err {
        ApiError::Cancelled { attempts, last_error } => {
            assert_eq!(attempts, 1);
            assert_eq!(last_error.unwrap().detail("status"), Some(&json!(503)));
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn retries_and_failures_are_logged_with_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let (client, logger) = client_with_logger(&server.uri());
    let _ = client.get::<Value>("feed", RequestOptions::new()).await.unwrap_err();

    let warnings = logger.at(LogLevel::Warn);
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].message, "API request retry 1");
    assert_eq!(warnings[1].message, "API request retry 2");
    assert_eq!(warnings[0].field("method"), Some(&json!("GET")));
    assert_eq!(warnings[0].field("url"), Some(&json!(format!("{}/feed", server.uri()))));
    assert!(warnings[0].field("error").is_some());

    let errors = logger.at(LogLevel::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "API request failed");
    assert_eq!(errors[0].field("kind"), Some(&json!("EXTERNAL_SERVICE_ERROR")));
    assert_eq!(errors[0].field("status"), Some(&json!(502)));
    assert_eq!(errors[0].field("attempts"), Some(&json!(3)));
}
