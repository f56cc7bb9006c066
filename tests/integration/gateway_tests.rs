//! Integration tests for the HTTP gateway and tenacious querying
//!
//! These tests use wiremock to stand in for the remote API.

use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use venue_trawler::api::{
    build_http_client, ApiClient, Credential, CredentialPool, HttpGateway, Params, RetryPolicy,
};
use venue_trawler::config::ApiConfig;
use venue_trawler::{AccessClass, Gateway, GeoPoint, RemoteError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Quota high enough that pacing never slows a test down
const FAST_QUOTA: u32 = 3_600_000;

fn ok_body(response: serde_json::Value) -> serde_json::Value {
    json!({"meta": {"code": 200}, "response": response})
}

fn gateway_for(server: &MockServer) -> HttpGateway {
    let client = build_http_client(&ApiConfig::default()).expect("Failed to build client");
    HttpGateway::new(client, &format!("{}/v2", server.uri())).expect("Invalid base URL")
}

fn token_pool(tokens: &[&str]) -> CredentialPool {
    CredentialPool::new(
        AccessClass::Authenticated,
        tokens.iter().map(|t| Credential::Token(t.to_string())).collect(),
    )
    .expect("Failed to build pool")
}

fn client_pool() -> CredentialPool {
    CredentialPool::new(
        AccessClass::Userless,
        vec![Credential::Client {
            id: "app-id".to_string(),
            secret: "app-secret".to_string(),
        }],
    )
    .expect("Failed to build pool")
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(10), Duration::from_millis(40))
}

#[tokio::test]
async fn test_token_replaces_caller_auth_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/self"))
        .and(query_param("oauth_token", "tok-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({"user": {"id": "1"}}))))
        .expect(1)
        .mount(&server)
        .await;

    let mut gateway = gateway_for(&server).with_class(token_pool(&["tok-a"]), FAST_QUOTA);
    let mut params: Params = BTreeMap::new();
    params.insert("oauth_token".to_string(), "caller-token".to_string());
    params.insert("client_secret".to_string(), "caller-secret".to_string());

    let envelope = gateway
        .call(AccessClass::Authenticated, "/users/self", &params)
        .await
        .expect("call failed");
    assert_eq!(envelope.response["user"]["id"], "1");

    let requests = server.received_requests().await.expect("recording disabled");
    let pairs: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(pairs, vec![("oauth_token".to_string(), "tok-a".to_string())]);
}

#[tokio::test]
async fn test_tokens_rotate_round_robin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({}))))
        .mount(&server)
        .await;

    let mut gateway =
        gateway_for(&server).with_class(token_pool(&["tok-a", "tok-b", "tok-c"]), FAST_QUOTA);
    for _ in 0..6 {
        gateway
            .call(AccessClass::Authenticated, "/users/self", &Params::new())
            .await
            .expect("call failed");
    }

    let requests = server.received_requests().await.expect("recording disabled");
    let tokens: Vec<String> = requests
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "oauth_token")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(tokens, ["tok-a", "tok-b", "tok-c", "tok-a", "tok-b", "tok-c"]);
}

#[tokio::test]
async fn test_userless_credentials_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/venues/search"))
        .and(query_param("client_id", "app-id"))
        .and(query_param("client_secret", "app-secret"))
        .and(query_param("ll", "51.4816000,-3.1791000"))
        .and(query_param("intent", "checkin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({
            "venues": [{"id": "v1", "name": "Cafe"}, {"id": "v2", "name": "Bar"}]
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).with_class(client_pool(), FAST_QUOTA);
    let mut client = ApiClient::new(gateway, fast_retry(), CancellationToken::new());

    let venues = client
        .find_venues_near(AccessClass::Userless, GeoPoint::new(51.4816, -3.1791), 50)
        .await
        .expect("search failed");
    assert_eq!(venues.len(), 2);
}

#[tokio::test]
async fn test_error_classification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/venues/limited"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "meta": {"code": 403, "errorType": "rate_limit_exceeded", "errorDetail": "Quota exceeded"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/venues/bad"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "meta": {"code": 400, "errorType": "param_error", "errorDetail": "Value is invalid"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/venues/broken"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let mut gateway = gateway_for(&server).with_class(client_pool(), FAST_QUOTA);
    let params = Params::new();

    let limited = gateway
        .call(AccessClass::Userless, "/venues/limited", &params)
        .await
        .unwrap_err();
    assert!(matches!(limited, RemoteError::RateLimited { status: 403, .. }));

    let bad = gateway
        .call(AccessClass::Userless, "/venues/bad", &params)
        .await
        .unwrap_err();
    match bad {
        RemoteError::Request {
            status, error_type, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(error_type.as_deref(), Some("param_error"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let broken = gateway
        .call(AccessClass::Userless, "/venues/broken", &params)
        .await
        .unwrap_err();
    assert!(matches!(broken, RemoteError::Request { status: 502, .. }));

    // nothing was sent for a class without credentials
    let unconfigured = gateway
        .call(AccessClass::Authenticated, "/users/self", &params)
        .await
        .unwrap_err();
    assert!(matches!(
        unconfigured,
        RemoteError::Unconfigured(AccessClass::Authenticated)
    ));
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(3));
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/venues/v1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/venues/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({
            "venue": {"id": "v1", "name": "Cafe"}
        }))))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).with_class(client_pool(), FAST_QUOTA);
    let mut client = ApiClient::new(gateway, fast_retry(), CancellationToken::new());

    let venue = client.venue("v1").await.expect("venue lookup failed");
    assert_eq!(venue["name"], "Cafe");
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(3));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/venues/missing"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "meta": {"code": 400, "errorType": "param_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).with_class(client_pool(), FAST_QUOTA);
    let mut client = ApiClient::new(gateway, fast_retry(), CancellationToken::new());

    let error = client.venue("missing").await.unwrap_err();
    assert!(matches!(error, RemoteError::Request { status: 400, .. }));
}

#[tokio::test]
async fn test_rate_limit_bound_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).with_class(client_pool(), FAST_QUOTA);
    let retry = fast_retry().with_max_rate_limited_retries(Some(1));
    let mut client = ApiClient::new(gateway, retry, CancellationToken::new());

    let error = client.venue("v1").await.unwrap_err();
    assert!(matches!(error, RemoteError::RateLimited { status: 429, .. }));
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(2));
}

fn tokens_received(requests: &[wiremock::Request]) -> Vec<String> {
    requests
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "oauth_token")
                .map(|(_, v)| v.into_owned())
        })
        .collect()
}

#[tokio::test]
async fn test_failed_attempt_uses_slot_and_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/self"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "meta": {"code": 400, "errorType": "param_error"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users/self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({}))))
        .mount(&server)
        .await;

    // two tokens at 18000/hour each: one call every 100ms
    let mut gateway = gateway_for(&server).with_class(token_pool(&["tok-a", "tok-b"]), 18_000);
    let started = std::time::Instant::now();

    let first = gateway
        .call(AccessClass::Authenticated, "/users/self", &Params::new())
        .await;
    assert!(matches!(first, Err(RemoteError::Request { status: 400, .. })));

    gateway
        .call(AccessClass::Authenticated, "/users/self", &Params::new())
        .await
        .expect("second call failed");

    assert!(started.elapsed() >= Duration::from_millis(100));
    let requests = server.received_requests().await.expect("recording disabled");
    assert_eq!(tokens_received(&requests), ["tok-a", "tok-b"]);
}

#[tokio::test]
async fn test_calls_are_paced_per_class() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({}))))
        .mount(&server)
        .await;

    // 36000/hour: one call every 100ms
    let mut gateway = gateway_for(&server).with_class(token_pool(&["tok-a"]), 36_000);
    let mut dispatched = Vec::new();
    for _ in 0..3 {
        dispatched.push(std::time::Instant::now());
        gateway
            .call(AccessClass::Authenticated, "/users/self", &Params::new())
            .await
            .expect("call failed");
    }
    let finished = std::time::Instant::now();

    // the third call cannot start before two intervals have passed
    assert!(finished.duration_since(dispatched[0]) >= Duration::from_millis(200));
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(3));
}

#[tokio::test]
async fn test_too_many_requests_envelope_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/venues/v1"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "meta": {"code": 429, "errorType": "too_many_requests"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/venues/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({
            "venue": {"id": "v1", "name": "Cafe"}
        }))))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).with_class(client_pool(), FAST_QUOTA);
    let mut client = ApiClient::new(gateway, fast_retry(), CancellationToken::new());

    let venue = client.venue("v1").await.expect("venue lookup failed");
    assert_eq!(venue["id"], "v1");
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(2));
}
