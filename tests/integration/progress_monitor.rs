//! Polling behaviour of progress monitors, on a paused clock

use crate::integration::test_utils::{url, ScriptedTransport, BASE};
use ebx::executor::{Credentials, RequestExecutor};
use ebx::monitor::{wait_all, ProgressMonitor};
use ebx::transport::{Method, Transport};
use ebx::types::{InstanceOperation, InstanceState, Revision, SHUTDOWN_OPERATIONS};
use ebx::urls::Endpoint;
use ebx::ApiError;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn instance_json(id: &str, state: &str, operation: &str, updated: &str) -> Value {
    json!({
        "id": id,
        "state": state,
        "operation": operation,
        "updated": updated
    })
}

fn resource(id: &str) -> String {
    url(&format!("/services/instances/{}", id))
}

fn executor(transport: &Arc<ScriptedTransport>) -> Arc<RequestExecutor> {
    let transport: Arc<dyn Transport> = transport.clone();
    Arc::new(RequestExecutor::new(
        transport,
        Endpoint::new(BASE),
        Credentials::new("ops@example.com", "secret"),
    ))
}

fn monitor(
    transport: &Arc<ScriptedTransport>,
    id: &str,
    accepted: &[InstanceOperation],
) -> ProgressMonitor {
    ProgressMonitor::new(executor(transport), resource(id), Revision::new("r1"), accepted)
}

#[tokio::test(start_paused = true)]
async fn test_waits_until_revision_changes() {
    let transport = ScriptedTransport::with_login();
    let id = "i-1";
    transport.on_json(Method::Get, &resource(id), 200, instance_json(id, "processing", "poweron", "r1"));
    transport.on_json(Method::Get, &resource(id), 200, instance_json(id, "done", "poweron", "r1"));
    transport.on_json(Method::Get, &resource(id), 200, instance_json(id, "processing", "poweron", "r2"));
    transport.on_json(Method::Get, &resource(id), 200, instance_json(id, "done", "poweron", "r2"));
    let monitor = monitor(&transport, id, &[InstanceOperation::Poweron]);

    monitor
        .wait_for_done(0, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(transport.count(Method::Get, &resource(id)), 4);
    assert_eq!(monitor.last_observed_state(), Some(InstanceState::Done));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_carries_last_state() {
    let transport = ScriptedTransport::with_login();
    let id = "i-1";
    transport.on_json(Method::Get, &resource(id), 200, instance_json(id, "processing", "deploy", "r2"));
    let monitor = monitor(&transport, id, &[InstanceOperation::Deploy]);

    match monitor.wait_for_done(1, &CancellationToken::new()).await {
        Err(ApiError::Timeout {
            url,
            waited_secs,
            state,
        }) => {
            assert_eq!(url, resource(id));
            assert!(waited_secs >= 60);
            assert_eq!(state, "processing");
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_final_check_after_budget_can_succeed() {
    let transport = ScriptedTransport::with_login();
    let id = "i-1";
    transport.on_json(Method::Get, &resource(id), 200, instance_json(id, "processing", "deploy", "r1"));
    transport.on_json(Method::Get, &resource(id), 200, instance_json(id, "done", "deploy", "r2"));
    let monitor = monitor(&transport, id, &[InstanceOperation::Deploy])
        .with_poll_interval(Duration::from_secs(5));

    monitor
        .wait_for_done_within(Some(Duration::from_secs(3)), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(transport.count(Method::Get, &resource(id)), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_wait() {
    let transport = ScriptedTransport::with_login();
    let id = "i-1";
    transport.on_json(Method::Get, &resource(id), 200, instance_json(id, "processing", "deploy", "r1"));
    let monitor = monitor(&transport, id, &[InstanceOperation::Deploy])
        .with_poll_interval(Duration::from_secs(60));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let err = monitor.wait_for_done(0, &cancel).await.unwrap_err();
    assert!(matches!(err, ApiError::Cancelled { .. }));
    // cancelled during the first sleep
    assert_eq!(transport.count(Method::Get, &resource(id)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_vanished_instance() {
    let transport = ScriptedTransport::with_login();
    let monitor = monitor(&transport, "i-gone", &[InstanceOperation::Terminate]);

    let err = monitor
        .wait_for_done(0, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ApiError::ResourceDisappeared { url } => assert_eq!(url, resource("i-gone")),
        other => panic!("expected disappeared, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_instance_fails_wait() {
    let transport = ScriptedTransport::with_login();
    let id = "i-1";
    transport.on_json(Method::Get, &resource(id), 200, instance_json(id, "unavailable", "shutdown", "r2"));
    let monitor = monitor(&transport, id, SHUTDOWN_OPERATIONS);

    let err = monitor
        .wait_for_done(0, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InstanceUnavailable { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_operation_is_unexpected() {
    let transport = ScriptedTransport::with_login();
    let id = "i-1";
    transport.on_json(
        Method::Get,
        &resource(id),
        200,
        instance_json(id, "done", "reconfigure_service", "r2"),
    );
    let monitor = monitor(&transport, id, &[InstanceOperation::Reconfigure]);

    let err = monitor
        .wait_for_done(0, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ApiError::UnexpectedOperation { operation, url } => {
            assert_eq!(operation, "reconfigure_service");
            assert_eq!(url, resource(id));
        }
        other => panic!("expected unexpected operation, got {:?}", other),
    }
    assert_eq!(monitor.last_observed_state(), Some(InstanceState::Done));
}

#[tokio::test(start_paused = true)]
async fn test_wait_all() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &resource("i-1"), 200, instance_json("i-1", "processing", "deploy", "r1"));
    transport.on_json(Method::Get, &resource("i-1"), 200, instance_json("i-1", "done", "deploy", "r2"));
    transport.on_json(Method::Get, &resource("i-2"), 200, instance_json("i-2", "done", "deploy", "r2"));

    let monitors = vec![
        monitor(&transport, "i-1", &[InstanceOperation::Deploy]),
        monitor(&transport, "i-2", &[InstanceOperation::Deploy]),
        ProgressMonitor::completed(resource("i-3")),
    ];
    wait_all(&monitors, 0, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_wait_all_fails_on_first_error() {
    let transport = ScriptedTransport::with_login();
    transport.on_json(Method::Get, &resource("i-1"), 200, instance_json("i-1", "processing", "deploy", "r1"));
    transport.on_json(Method::Get, &resource("i-2"), 200, instance_json("i-2", "done", "poweron", "r2"));

    let monitors = vec![
        monitor(&transport, "i-1", &[InstanceOperation::Deploy]),
        monitor(&transport, "i-2", &[InstanceOperation::Deploy]),
    ];
    let err = wait_all(&monitors, 0, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ApiError::UnexpectedOperation { operation, url } => {
            assert_eq!(operation, "poweron");
            assert_eq!(url, resource("i-2"));
        }
        other => panic!("expected unexpected operation, got {:?}", other),
    }
}
