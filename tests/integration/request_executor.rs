//! Authentication and error handling of the request executor

use crate::integration::test_utils::{client, token_url, url, ScriptedTransport};
use ebx::executor::TOKEN_HEADER;
use ebx::transport::Method;
use ebx::ApiError;
use futures::future::join_all;
use serde_json::json;

fn workspaces_url() -> String {
    url("/services/workspaces")
}

#[tokio::test]
async fn test_logs_in_before_first_request() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &workspaces_url(), 200, json!([{"id": "ops"}]));
    let client = client(&transport);

    let workspaces = client.workspaces().await.unwrap();
    assert_eq!(workspaces[0].id, "ops");

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, token_url());
    let login: serde_json::Value =
        serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(login, json!({"email": "ops@example.com", "password": "secret"}));

    assert_eq!(requests[1].header(TOKEN_HEADER), Some("tok-1"));
    assert_eq!(requests[1].header("Content-Type"), Some("application/json"));

    // token is reused
    client.workspaces().await.unwrap();
    assert_eq!(transport.logins(), 1);
}

#[tokio::test]
async fn test_first_401_reauthenticates_and_retries_once() {
    let transport = ScriptedTransport::new();
    transport.on(Method::Post, &token_url(), 200, "tok-1");
    transport.on(Method::Post, &token_url(), 200, "tok-2");
    transport.reject_token("tok-1");
    transport.on_json(Method::Get, &workspaces_url(), 200, json!([]));
    let client = client(&transport);

    client.workspaces().await.unwrap();

    assert_eq!(transport.logins(), 2);
    assert_eq!(transport.count(Method::Get, &workspaces_url()), 2);
    let last = transport.requests().pop().unwrap();
    assert_eq!(last.header(TOKEN_HEADER), Some("tok-2"));
}

#[tokio::test]
async fn test_second_401_is_fatal() {
    let transport = ScriptedTransport::new();
    transport.on(Method::Post, &token_url(), 200, "tok-1");
    transport.on(Method::Post, &token_url(), 200, "tok-2");
    transport.reject_token("tok-1");
    transport.reject_token("tok-2");
    transport.on_json(Method::Get, &workspaces_url(), 200, json!([]));
    let client = client(&transport);

    match client.workspaces().await {
        Err(ApiError::AuthenticationFailed { status, message, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid token");
        }
        other => panic!("expected authentication failure, got {:?}", other),
    }
    assert_eq!(transport.logins(), 2);
    assert_eq!(transport.count(Method::Get, &workspaces_url()), 2);
}

#[tokio::test]
async fn test_rejected_login_is_authentication_failure() {
    let transport = ScriptedTransport::new();
    transport.on_json(
        Method::Post,
        &token_url(),
        403,
        json!({"message": "Invalid credentials"}),
    );
    let client = client(&transport);

    match client.connect().await {
        Err(ApiError::AuthenticationFailed {
            endpoint,
            status,
            message,
        }) => {
            assert_eq!(endpoint, "https://eb.test");
            assert_eq!(status, 403);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("expected authentication failure, got {:?}", other),
    }
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_client_error_discards_token() {
    let transport = ScriptedTransport::with_login();
    let instance_url = url("/services/instances/i-1");
    transport.on_json(Method::Get, &instance_url, 500, json!({"message": "boom"}));
    let client = client(&transport);

    match client.instance("i-1").await {
        Err(ApiError::Http { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected http error, got {:?}", other),
    }

    let _ = client.instance("i-1").await;
    assert_eq!(transport.logins(), 2);
}

#[tokio::test]
async fn test_non_json_error_body_is_kept() {
    let transport = ScriptedTransport::with_login();
    transport.on(Method::Get, &workspaces_url(), 502, "Bad gateway");
    let client = client(&transport);

    let err = client.workspaces().await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert!(err.to_string().contains("Bad gateway"));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_reauthentication() {
    let transport = ScriptedTransport::new();
    transport.on(Method::Post, &token_url(), 200, "tok-1");
    transport.on(Method::Post, &token_url(), 200, "tok-2");
    transport.on(Method::Post, &token_url(), 200, "tok-3");
    transport.reject_token("tok-1");
    transport.on_json(Method::Get, &workspaces_url(), 200, json!([]));
    let client = client(&transport);

    let results = join_all((0..5).map(|_| client.workspaces())).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(transport.logins(), 2);
}

#[tokio::test]
async fn test_clients_sharing_a_transport_keep_their_own_tokens() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &workspaces_url(), 200, json!([]));
    let first = client(&transport);
    let second = client(&transport);

    first.workspaces().await.unwrap();
    second.workspaces().await.unwrap();
    first.workspaces().await.unwrap();

    assert_eq!(transport.logins(), 2);
}
