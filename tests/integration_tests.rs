//! Integration tests using wiremock to simulate the storefront API.

use serde::Deserialize;
use serde_json::json;
use shoplaunch_client::navigate::RecordingNavigator;
use shoplaunch_client::{
    Backoff, Client, Error, ErrorCode, FormData, RequestBody, RequestOptions, TransientFailure,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const LOGIN_REDIRECT: &str = "/login?session_expired=true";

fn client_for(server: &MockServer, navigator: &Arc<RecordingNavigator>) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .backoff(Backoff::Fixed(Duration::from_millis(10)))
        .navigator(navigator.clone())
        .build()
        .unwrap()
}

fn set_csrf_cookie(client: &Client, value: &str) {
    client
        .cookie_jar()
        .add_cookie_str(&format!("csrf_token={value}"), client.base_url());
}

async fn requests_to(server: &MockServer, target: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == target)
        .collect()
}

/// Responds 401 to the first `failures` requests, then 200 with `body`.
fn unauthorized_then_ok(failures: usize, body: serde_json::Value) -> impl wiremock::Respond {
    let count = AtomicUsize::new(0);
    move |_req: &Request| {
        if count.fetch_add(1, Ordering::SeqCst) < failures {
            ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthorized"}))
        } else {
            ResponseTemplate::new(200).set_body_json(body.clone())
        }
    }
}

#[tokio::test]
async fn test_catalog_get_sends_request_id_and_no_csrf() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/catalog/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    set_csrf_cookie(&client, "abc");

    let response = client
        .execute("/api/catalog/", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(response.data, json!({"products": []}));
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());

    let requests = requests_to(&server, "/api/catalog/").await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let request_id = request.headers.get("x-request-id").unwrap().to_str().unwrap();
    let parsed = uuid::Uuid::parse_str(request_id).unwrap();
    assert_eq!(parsed.get_version_num(), 4);
    assert_eq!(request_id, response.request_id);

    assert!(request.headers.get("x-csrf-token").is_none());
    assert_eq!(
        request.headers.get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_cart_post_carries_csrf_token_and_json_body() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("POST"))
        .and(path("/api/cart/items"))
        .and(header("x-csrf-token", "abc"))
        .and(body_json(json!({"productId": "123", "quantity": 1})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"items": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    set_csrf_cookie(&client, "abc");

    let options = RequestOptions::new(http::Method::POST)
        .with_json(&json!({"productId": "123", "quantity": 1}))
        .unwrap();
    let response = client.execute("/api/cart/items", options).await.unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.data, json!({"items": 1}));

    let requests = requests_to(&server, "/api/cart/items").await;
    assert_eq!(
        String::from_utf8(requests[0].body.clone()).unwrap(),
        r#"{"productId":"123","quantity":1}"#
    );
}

#[tokio::test]
async fn test_safe_methods_never_carry_csrf_token() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(path("/api/catalog/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    set_csrf_cookie(&client, "abc");
    assert_eq!(client.csrf_token().as_deref(), Some("abc"));

    for verb in [http::Method::GET, http::Method::HEAD, http::Method::OPTIONS] {
        client
            .execute("/api/catalog/", RequestOptions::new(verb))
            .await
            .unwrap();
    }

    let requests = requests_to(&server, "/api/catalog/").await;
    assert_eq!(requests.len(), 3);
    for request in requests {
        assert!(
            request.headers.get("x-csrf-token").is_none(),
            "{} carried a CSRF token",
            request.method
        );
    }
}

#[tokio::test]
async fn test_state_changing_request_without_token_omits_header() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("DELETE"))
        .and(path("/api/cart/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let cleared = client.cart().clear().await.unwrap();

    assert_eq!(cleared, json!({"message": "No response body"}));
    let requests = requests_to(&server, "/api/cart/").await;
    assert!(requests[0].headers.get("x-csrf-token").is_none());
}

#[tokio::test]
async fn test_csrf_token_is_cached_until_cleared() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("POST"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "o-1"})))
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    set_csrf_cookie(&client, "first");
    client.orders().create(&json!({"items": []})).await.unwrap();

    set_csrf_cookie(&client, "second");
    client.orders().create(&json!({"items": []})).await.unwrap();

    client.clear_csrf_cache();
    client.orders().create(&json!({"items": []})).await.unwrap();

    let tokens: Vec<String> = requests_to(&server, "/api/orders/")
        .await
        .iter()
        .map(|r| r.headers.get("x-csrf-token").unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(tokens, vec!["first", "first", "second"]);
}

#[tokio::test]
async fn test_csrf_token_is_reread_after_ttl() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/stock/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"quantity": 5})))
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .csrf_ttl(Duration::from_millis(50))
        .build()
        .unwrap();

    set_csrf_cookie(&client, "first");
    client.stock().update("p-1", &json!({"quantity": 5})).await.unwrap();

    set_csrf_cookie(&client, "second");
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.stock().update("p-1", &json!({"quantity": 5})).await.unwrap();

    let requests = requests_to(&server, "/api/stock/p-1").await;
    assert_eq!(requests[0].headers.get("x-csrf-token").unwrap(), "first");
    assert_eq!(requests[1].headers.get("x-csrf-token").unwrap(), "second");
}

#[tokio::test]
async fn test_csrf_cookie_set_by_server_is_used() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "csrf_token=from%2Dserver; Path=/")
                .set_body_json(json!({"user": {"email": "ada@example.com"}})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/cart/items"))
        .and(header("x-csrf-token", "from-server"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"items": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let login = client
        .auth()
        .login(&json!({"email": "ada@example.com", "password": "pw"}))
        .await
        .unwrap();
    assert_eq!(login["user"]["email"], "ada@example.com");

    client
        .cart()
        .add_item(&json!({"productId": "123", "quantity": 1}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_validation_error_is_not_retried() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());
    let details = json!({"message": "Invalid order", "errors": {"address": "required"}});

    Mock::given(method("POST"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(422).set_body_json(details.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let err = client.orders().create(&json!({})).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert_eq!(err.status(), 422);
    assert_eq!(err.to_string(), "Invalid order");
    assert_eq!(err.details(), Some(&details));
}

#[tokio::test]
async fn test_forbidden_is_terminal() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/analytics/dashboard"))
        .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let err = client.analytics().dashboard().await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert_eq!(err.status(), 403);
    assert_eq!(err.to_string(), "nope");
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_server_errors_are_not_retried() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/orders/o-1"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "Overloaded"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/orders/o-2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);

    let err = client.orders().get("o-1").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownError);
    assert_eq!(err.status(), 503);
    assert!(matches!(err, Error::Http { ref message, .. } if message == "Overloaded"));

    let err = client.orders().get("o-2").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownError);
    assert_eq!(err.status(), 404);
    assert_eq!(err.details(), Some(&json!({"message": "No response body"})));
}

#[tokio::test]
async fn test_timeouts_exhaust_retry_budget() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/catalog/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"products": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let options = RequestOptions::default()
        .with_timeout(Duration::from_millis(50))
        .with_retries(2);
    let err = client.execute("/api/catalog/", options).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::NetworkError);
    assert_eq!(err.status(), 0);
    match err {
        Error::Network {
            attempts,
            ref last_error,
            ref details,
        } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last_error, TransientFailure::Timeout(_)));
            assert_eq!(details["message"], last_error.to_string());
        }
        other => panic!("Expected Network, got {:?}", other),
    }

    assert_eq!(requests_to(&server, "/api/catalog/").await.len(), 3);
}

#[tokio::test]
async fn test_connection_failures_exhaust_retry_budget() {
    // Bind and release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = Client::builder()
        .base_url(format!("http://127.0.0.1:{port}"))
        .unwrap()
        .backoff(Backoff::Fixed(Duration::from_millis(10)))
        .retries(4)
        .build()
        .unwrap();

    let err = client.catalog().list().await.unwrap_err();
    match err {
        Error::Network {
            attempts,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 5);
            assert!(matches!(last_error, TransientFailure::Connection(_)));
        }
        other => panic!("Expected Network, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());
    let count = AtomicUsize::new(0);

    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .respond_with(move |_req: &Request| {
            let template = ResponseTemplate::new(200).set_body_json(json!({"notifications": []}));
            if count.fetch_add(1, Ordering::SeqCst) == 0 {
                template.set_delay(Duration::from_millis(500))
            } else {
                template
            }
        })
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let options = RequestOptions::default().with_timeout(Duration::from_millis(100));
    let response = client
        .execute("/api/notifications/", options)
        .await
        .unwrap();

    assert_eq!(response.data, json!({"notifications": []}));
    assert_eq!(response.attempts, 2);
    assert!(response.was_retried());

    // Retries of one logical request share its identifier.
    let requests = requests_to(&server, "/api/notifications/").await;
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("x-request-id"),
        requests[1].headers.get("x-request-id")
    );
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_retries_once() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(unauthorized_then_ok(1, json!({"email": "ada@example.com"})))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let me = client.auth().me().await.unwrap();

    assert_eq!(me, json!({"email": "ada@example.com"}));
    assert!(navigator.redirects().is_empty());
    assert!(!client.is_refreshing());

    let requests = requests_to(&server, "/api/auth/me").await;
    assert_ne!(
        requests[0].headers.get("x-request-id"),
        requests[1].headers.get("x-request-id")
    );
}

#[tokio::test]
async fn test_second_unauthorized_expires_session() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let err = client.orders().list().await.unwrap_err();

    assert!(matches!(err, Error::SessionExpired));
    assert_eq!(err.code(), ErrorCode::AuthSessionExpired);
    assert_eq!(err.status(), 401);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(navigator.redirects(), vec![LOGIN_REDIRECT.to_string()]);
}

#[tokio::test]
async fn test_failed_refresh_fails_authentication() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/cart/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let err = client.cart().get().await.unwrap_err();

    assert!(matches!(err, Error::AuthenticationFailed));
    assert_eq!(err.code(), ErrorCode::AuthFailed);
    assert_eq!(err.to_string(), "Authentication failed");
    assert_eq!(navigator.last_redirect().as_deref(), Some(LOGIN_REDIRECT));
}

#[tokio::test]
async fn test_refresh_carries_csrf_token() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(unauthorized_then_ok(1, json!({"email": "ada@example.com"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(header("x-csrf-token", "abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    set_csrf_cookie(&client, "abc");
    client.auth().me().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .respond_with(unauthorized_then_ok(2, json!({"orders": []})))
        .expect(4)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let other = client.clone();

    let first_orders = client.orders();
    let second_orders = other.orders();
    let (first, second) = tokio::join!(first_orders.list(), second_orders.list());

    assert_eq!(first.unwrap(), json!({"orders": []}));
    assert_eq!(second.unwrap(), json!({"orders": []}));
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_failed_refresh() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/analytics/orders"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);

    let first_analytics = client.analytics();
    let second_analytics = client.analytics();
    let (first, second) = tokio::join!(first_analytics.orders(), second_analytics.orders());

    assert!(matches!(first, Err(Error::AuthenticationFailed)));
    assert!(matches!(second, Err(Error::AuthenticationFailed)));
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_cancelled_caller_does_not_strand_refresh() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());
    let refreshes = AtomicUsize::new(0);

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(unauthorized_then_ok(2, json!({"email": "ada@example.com"})))
        .mount(&server)
        .await;

    // The first refresh hangs past the client timeout; later ones succeed.
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(move |_req: &Request| {
            if refreshes.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(200).set_delay(Duration::from_secs(5))
            } else {
                ResponseTemplate::new(200)
            }
        })
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .timeout(Duration::from_millis(200))
        .navigator(navigator.clone())
        .build()
        .unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(100), client.auth().me()).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!client.is_refreshing());

    let me = client.auth().me().await.unwrap();
    assert_eq!(me, json!({"email": "ada@example.com"}));
    assert_eq!(requests_to(&server, "/api/auth/refresh").await.len(), 2);
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_post_refresh_retry_gets_no_transient_retries() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());
    let count = AtomicUsize::new(0);

    Mock::given(method("GET"))
        .and(path("/api/stock/p-9"))
        .respond_with(move |_req: &Request| {
            if count.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(401)
            } else {
                ResponseTemplate::new(200).set_delay(Duration::from_millis(500))
            }
        })
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let options = RequestOptions::default()
        .with_timeout(Duration::from_millis(50))
        .with_retries(3);
    let err = client.execute("/api/stock/p-9", options).await.unwrap_err();

    assert!(matches!(err, Error::Network { attempts: 1, .. }));
    assert_eq!(requests_to(&server, "/api/stock/p-9").await.len(), 2);
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_refresh_session_can_be_called_directly() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let (a, b) = tokio::join!(client.refresh_session(), client.refresh_session());

    assert_eq!(a, shoplaunch_client::RefreshOutcome::Refreshed);
    assert_eq!(b, shoplaunch_client::RefreshOutcome::Refreshed);
}

#[tokio::test]
async fn test_malformed_json_degrades_to_message() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/catalog/p-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string("{not json"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let product = client.catalog().get("p-1").await.unwrap();

    assert_eq!(product, json!({"message": "Invalid JSON response from server"}));
}

#[tokio::test]
async fn test_plain_text_is_wrapped_as_message() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/notifications/n-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let notification = client.notifications().get("n-1").await.unwrap();

    assert_eq!(notification, json!({"message": "hello"}));
}

#[tokio::test]
async fn test_caller_headers_are_merged() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("PATCH"))
        .and(path("/api/cart/items/7"))
        .and(header("x-client-version", "1.4.0"))
        .and(header("content-type", "application/merge-patch+json"))
        .and(header("x-csrf-token", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"quantity": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    set_csrf_cookie(&client, "abc");

    let options = RequestOptions::new(http::Method::PATCH)
        .with_json(&json!({"quantity": 3}))
        .unwrap()
        .with_header("X-Client-Version", "1.4.0")
        .unwrap()
        .with_header("Content-Type", "application/merge-patch+json")
        .unwrap();
    client.execute("/api/cart/items/7", options).await.unwrap();

    let requests = requests_to(&server, "/api/cart/items/7").await;
    assert!(requests[0].headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn test_form_body_is_sent_as_multipart() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("POST"))
        .and(path("/api/notifications/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sent": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let form = FormData::new()
        .text("subject", "Order shipped")
        .file("attachment", b"label".to_vec(), "label.txt", Some("text/plain"));
    let options = RequestOptions::new(http::Method::POST).with_body(RequestBody::Form(form));

    client.execute("/api/notifications/", options).await.unwrap();

    let requests = requests_to(&server, "/api/notifications/").await;
    let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("Order shipped"));
    assert!(body.contains("filename=\"label.txt\""));
}

#[tokio::test]
async fn test_text_body_is_sent_untouched() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("PUT"))
        .and(path("/api/stock/p-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let options = RequestOptions::new(http::Method::PUT)
        .with_body(RequestBody::Text(r#"{"quantity":9}"#.to_string()));
    client.execute("/api/stock/p-2", options).await.unwrap();

    let requests = requests_to(&server, "/api/stock/p-2").await;
    assert_eq!(requests[0].body, br#"{"quantity":9}"#.to_vec());
}

#[tokio::test]
async fn test_typed_call_and_deserialization_failure() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Product {
        id: String,
        price: f64,
    }

    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/catalog/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p-1", "price": 9.5})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/catalog/p-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p-2"})))
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);

    let product = client.get::<Product>("/api/catalog/p-1").await.unwrap();
    assert_eq!(
        product.data,
        Product {
            id: "p-1".to_string(),
            price: 9.5
        }
    );

    match client.get::<Product>("/api/catalog/p-2").await {
        Err(Error::DeserializationFailed {
            raw_response,
            serde_error,
            status,
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert!(raw_response.contains("p-2"));
            assert!(serde_error.contains("price"));
        }
        other => panic!("Expected DeserializationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_domain_service_paths() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let body = json!({"x": 1});

    client.auth().register(&body).await.unwrap();
    client.auth().logout().await.unwrap();
    client.cart().update_item(42, &body).await.unwrap();
    client.cart().remove_item("a b").await.unwrap();
    client.stock().get("p-1").await.unwrap();
    client.analytics().products().await.unwrap();
    client.notifications().send(&body).await.unwrap();
    client.notifications().list().await.unwrap();

    let seen: Vec<(String, String)> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| (r.method.to_string(), r.url.path().to_string()))
        .collect();

    let expected = [
        ("POST", "/api/auth/register"),
        ("POST", "/api/auth/logout"),
        ("PUT", "/api/cart/items/42"),
        ("DELETE", "/api/cart/items/a%20b"),
        ("GET", "/api/stock/p-1"),
        ("GET", "/api/analytics/products"),
        ("POST", "/api/notifications/"),
        ("GET", "/api/notifications/"),
    ];
    let expected: Vec<(String, String)> = expected
        .iter()
        .map(|(m, p)| (m.to_string(), p.to_string()))
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_query_parameters() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());

    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(wiremock::matchers::query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orders": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &navigator);
    let options = RequestOptions::default().with_query_param("page", "2");
    client.execute("/api/orders/", options).await.unwrap();
}

#[tokio::test]
async fn test_default_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/catalog/"))
        .and(header("user-agent", "shoplaunch-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .default_header("User-Agent", "shoplaunch-test")
        .unwrap()
        .build()
        .unwrap();

    client.catalog().list().await.unwrap();
}
