//! Deploy, reconfigure, power and terminate flows against a scripted server

use crate::integration::test_utils::{client, url, ScriptedTransport};
use ebx::transport::Method;
use ebx::{ApiError, DeployOptions, Instance, Variable};
use serde_json::{json, Value};

fn instance_json(state: &str, operation: &str, updated: &str) -> Value {
    json!({
        "id": "i-1",
        "name": "web",
        "state": state,
        "operation": operation,
        "updated": updated,
        "uri": "/services/instances/i-1",
        "variables": [{"name": "port", "value": "80"}],
        "boxes": [{"id": "b-app", "variables": [
            {"name": "port", "value": "80"},
            {"name": "motd", "value": "hi"}
        ]}]
    })
}

fn polled(state: &str, operation: &str, updated: &str) -> Instance {
    serde_json::from_value(instance_json(state, operation, updated)).unwrap()
}

fn profile_json(date: &str) -> Value {
    json!({
        "id": "p-1",
        "name": "small",
        "schema": format!("http://elasticbox.net/schemas/{}/profile", date),
        "box": {"id": "b-app", "version": "v-1"},
        "profile": {"instances": 1},
        "instances": [{"variables": [], "profile": {"instances": 1}}]
    })
}

fn deploy_options() -> DeployOptions {
    DeployOptions {
        profile_id: "p-1".to_string(),
        workspace_id: "ops".to_string(),
        environment: "staging".to_string(),
        box_version: None,
        instances: 2,
        variables: vec![Variable::new("port", "8080").with_scope("")],
    }
}

fn instance_url() -> String {
    url("/services/instances/i-1")
}

#[tokio::test]
async fn test_deploy_modern_profile() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &url("/services/profiles/p-1"), 200, profile_json("2014-05-24"));
    transport.on_json(
        Method::Post,
        &url("/services/instances"),
        200,
        instance_json("processing", "deploy", "r0"),
    );
    let client = client(&transport);

    let monitor = client.deploy(&deploy_options()).await.unwrap();
    assert_eq!(monitor.resource_url(), instance_url());

    let body = transport
        .last_body(Method::Post, &url("/services/instances"))
        .unwrap();
    assert_eq!(
        body["schema"],
        "http://elasticbox.net/schemas/2014-05-24/deploy-instance-request"
    );
    assert_eq!(body["owner"], "ops");
    assert_eq!(body["environment"], "staging");
    assert_eq!(body["profile"]["profile"]["instances"], 2);
    assert_eq!(body["variables"], json!([{"name": "port", "value": "8080"}]));

    // the new revision completes a deploy, anything else does not
    assert!(monitor.evaluate(&polled("done", "deploy", "r1")).unwrap());
    assert!(matches!(
        monitor.evaluate(&polled("done", "reinstall", "r1")),
        Err(ApiError::UnexpectedOperation { .. })
    ));
}

#[tokio::test]
async fn test_deploy_legacy_profile() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &url("/services/profiles/p-1"), 200, profile_json("2014-05-23"));
    transport.on_json(
        Method::Post,
        &url("/services/instances"),
        200,
        instance_json("processing", "deploy", "r0"),
    );
    let client = client(&transport);

    client.deploy(&deploy_options()).await.unwrap();

    let body = transport
        .last_body(Method::Post, &url("/services/instances"))
        .unwrap();
    assert_eq!(
        body["schema"],
        "http://elasticbox.net/schemas/2014-05-23/deploy-service-request"
    );
    assert!(body.get("variables").is_none());
    assert_eq!(
        body["profile"]["instances"][0]["variables"],
        json!([{"name": "port", "value": "8080"}])
    );
    assert_eq!(body["profile"]["instances"][0]["profile"]["instances"], 2);
}

#[tokio::test]
async fn test_deploy_with_malformed_schema_sends_nothing() {
    let transport = ScriptedTransport::with_login();
    let mut profile = profile_json("2014-05-24");
    profile["schema"] = json!("http://example.com/profile");
    transport.on_json(Method::Get, &url("/services/profiles/p-1"), 200, profile);
    let client = client(&transport);

    assert!(matches!(
        client.deploy(&deploy_options()).await,
        Err(ApiError::MalformedSchema(_))
    ));
    assert_eq!(transport.count(Method::Post, &url("/services/instances")), 0);
}

#[tokio::test]
async fn test_reconfigure_with_overrides() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &instance_url(), 200, instance_json("done", "deploy", "r1"));
    transport.on_json(Method::Get, &instance_url(), 200, instance_json("processing", "reconfigure", "r2"));
    transport.on_json(Method::Put, &instance_url(), 200, instance_json("done", "deploy", "r1"));
    transport.on(Method::Put, &url("/services/instances/i-1/reconfigure"), 200, "");
    let client = client(&transport);

    let monitor = client
        .reconfigure("i-1", &[Variable::new("motd", "hello")])
        .await
        .unwrap();

    assert_eq!(
        transport.calls(),
        vec![
            format!("GET {}", instance_url()),
            format!("PUT {}", instance_url()),
            format!("PUT {}/reconfigure", instance_url()),
            format!("GET {}", instance_url()),
        ]
    );
    let body = transport.last_body(Method::Put, &instance_url()).unwrap();
    assert_eq!(body["variables"][1], json!({"name": "motd", "value": "hello"}));

    // baseline is the revision read after the operation was issued
    assert!(!monitor.evaluate(&polled("done", "reconfigure", "r2")).unwrap());
    assert!(monitor.evaluate(&polled("done", "reconfigure", "r3")).unwrap());
}

#[tokio::test]
async fn test_reinstall_without_overrides_skips_update() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &instance_url(), 200, instance_json("done", "deploy", "r1"));
    transport.on(Method::Put, &url("/services/instances/i-1/reinstall"), 200, "");
    let client = client(&transport);

    client.reinstall("i-1", &[]).await.unwrap();
    assert_eq!(transport.count(Method::Put, &instance_url()), 0);
    assert_eq!(
        transport.count(Method::Put, &url("/services/instances/i-1/reinstall")),
        1
    );
}

#[tokio::test]
async fn test_poweron_of_running_instance_is_a_no_op() {
    for state in ["done", "processing"] {
        let transport = ScriptedTransport::with_login();
        transport.on_json(Method::Get, &instance_url(), 200, instance_json(state, "deploy", "r1"));
        let client = client(&transport);

        let monitor = client.poweron("i-1").await.unwrap();
        assert!(monitor.is_completed());
        assert!(monitor.is_done().await.unwrap());
        assert_eq!(transport.calls(), vec![format!("GET {}", instance_url())]);
    }
}

#[tokio::test]
async fn test_poweron_of_stopped_instance() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &instance_url(), 200, instance_json("done", "shutdown", "r1"));
    transport.on(Method::Put, &url("/services/instances/i-1/poweron"), 200, "");
    let client = client(&transport);

    let monitor = client.poweron("i-1").await.unwrap();
    assert!(!monitor.is_completed());
    assert_eq!(
        transport.count(Method::Put, &url("/services/instances/i-1/poweron")),
        1
    );
    assert!(monitor.evaluate(&polled("done", "poweron", "r2")).unwrap());
}

#[tokio::test]
async fn test_shutdown_accepts_both_shutdown_operations() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &instance_url(), 200, instance_json("done", "deploy", "r1"));
    transport.on(Method::Put, &url("/services/instances/i-1/shutdown"), 200, "");
    let client = client(&transport);

    let monitor = client.shutdown("i-1").await.unwrap();
    assert!(monitor.evaluate(&polled("done", "shutdown", "r2")).unwrap());
    assert!(monitor.evaluate(&polled("done", "shutdown_service", "r2")).unwrap());
}

#[tokio::test]
async fn test_terminate_running_instance_is_graceful() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &instance_url(), 200, instance_json("done", "poweron", "r1"));
    let delete_url = format!("{}?operation=terminate", instance_url());
    transport.on(Method::Delete, &delete_url, 200, "");
    let client = client(&transport);

    let monitor = client.terminate("i-1").await.unwrap();
    assert_eq!(transport.count(Method::Delete, &delete_url), 1);
    assert!(!monitor.evaluate(&polled("done", "terminate", "r1")).unwrap());
    assert!(monitor.evaluate(&polled("done", "terminate_service", "r2")).unwrap());
}

#[tokio::test]
async fn test_terminate_busy_instance_is_forced() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &instance_url(), 200, instance_json("processing", "poweron", "r1"));
    let delete_url = format!("{}?operation=force_terminate", instance_url());
    transport.on(Method::Delete, &delete_url, 200, "");
    let client = client(&transport);

    client.terminate("i-1").await.unwrap();
    assert_eq!(transport.count(Method::Delete, &delete_url), 1);
}

#[tokio::test]
async fn test_force_terminate_always_forces() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &instance_url(), 200, instance_json("done", "poweron", "r1"));
    let delete_url = format!("{}?operation=force_terminate", instance_url());
    transport.on(Method::Delete, &delete_url, 200, "");
    let client = client(&transport);

    client.force_terminate("i-1").await.unwrap();
    assert_eq!(transport.count(Method::Delete, &delete_url), 1);
}

#[tokio::test]
async fn test_delete() {
    let transport = ScriptedTransport::with_login();
    let delete_url = format!("{}?operation=delete", instance_url());
    transport.on(Method::Delete, &delete_url, 200, "");
    let client = client(&transport);

    client.delete("i-1").await.unwrap();
    assert_eq!(transport.calls(), vec![format!("DELETE {}", delete_url)]);
}

#[tokio::test]
async fn test_operation_on_missing_instance_is_a_client_error() {
    let transport = ScriptedTransport::with_login();
    let client = client(&transport);

    let err = client.shutdown("i-404").await.unwrap_err();
    assert!(err.is_not_found());
}
