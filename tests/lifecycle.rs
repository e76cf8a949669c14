//! Connect, disconnect and unexpected exit against fake subordinate processes.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{
    connect, exit_after_server, recorded_process_alive, recording_pid,
    rejecting_first_request_server, sh_config, silent_after_ready_server, tools_server,
    wait_until,
};
use serde_json::{Map, Value};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::task::JoinHandle;
use tweetbridge::{
    BridgeError, Connection, ConnectionConfig, ConnectionEvent, ConnectionState,
    DisconnectReason, SubordinateCommand,
};

type CallHandle = JoinHandle<Result<Value, BridgeError>>;

fn spawn_calls(connection: &Arc<Connection>, count: usize) -> Vec<CallHandle> {
    (0..count)
        .map(|_| {
            let connection = Arc::clone(connection);
            tokio::spawn(async move { connection.call("tools/call", Map::new()).await })
        })
        .collect()
}

#[tokio::test]
async fn disconnect_fails_every_pending_call() {
    const PENDING: usize = 4;
    let connection = Arc::new(connect(sh_config(&silent_after_ready_server())).await);
    let mut events = connection.subscribe();

    let calls = spawn_calls(&connection, PENDING);
    wait_until(|| connection.pending_count() == PENDING).await;

    connection.disconnect().await;

    for call in calls {
        let result = call.await.unwrap();
        assert!(
            matches!(result, Err(BridgeError::ConnectionClosed)),
            "expected connection closed, got {:?}",
            result
        );
    }
    assert_eq!(connection.pending_count(), 0);
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(
        events.recv().await.unwrap(),
        ConnectionEvent::Disconnected {
            reason: DisconnectReason::Requested,
            failed_requests: PENDING,
        }
    );
}

#[tokio::test]
async fn disconnect_is_idempotent_and_allows_reconnect() {
    let connection = Connection::new(sh_config(&tools_server()));

    // Before any connect
    connection.disconnect().await;
    connection.disconnect().await;

    connection.connect().await.unwrap();
    assert_eq!(connection.state(), ConnectionState::Connected);
    connection.disconnect().await;
    connection.disconnect().await;
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    // A fresh session works after repeated disconnects
    connection.connect().await.unwrap();
    assert!(connection.list_capabilities().await.is_ok());
    connection.disconnect().await;
}

#[tokio::test]
async fn calls_after_disconnect_are_rejected() {
    let connection = connect(sh_config(&tools_server())).await;
    connection.disconnect().await;

    let result = connection.list_capabilities().await;

    assert!(matches!(result, Err(BridgeError::NotConnected)));
}

#[tokio::test]
async fn unexpected_exit_fails_pending_calls_and_notifies_once() {
    let connection = Arc::new(connect(sh_config(&exit_after_server(2))).await);
    let mut events = connection.subscribe();

    let calls = spawn_calls(&connection, 2);

    for call in calls {
        let result = tokio::time::timeout(Duration::from_secs(2), call)
            .await
            .expect("pending call should fail promptly")
            .unwrap();
        assert!(
            matches!(result, Err(BridgeError::ConnectionClosed)),
            "expected connection closed, got {:?}",
            result
        );
    }

    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("disconnect event should fire")
        .unwrap();
    let ConnectionEvent::Disconnected { reason, .. } = event else {
        panic!("expected disconnected event, got {:?}", event);
    };
    assert_eq!(reason, DisconnectReason::ProcessExited);
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    // A later explicit disconnect does not emit a second notification
    connection.disconnect().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn connect_timeout_terminates_silent_process() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("server.pid");
    let script = recording_pid(&pid_file, "exec cat > /dev/null");
    let config = sh_config(&script).with_connect_timeout(Duration::from_millis(300));
    let connection = Connection::new(config);

    let result = connection.connect().await;

    assert!(matches!(
        result,
        Err(BridgeError::ConnectionTimeout { timeout }) if timeout == Duration::from_millis(300)
    ));
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(connection.pending_count(), 0);
    assert!(
        !recorded_process_alive(&pid_file),
        "timed out subordinate should be terminated"
    );

    // The failed attempt does not block the next one
    let result = connection.connect().await;
    assert!(matches!(result, Err(BridgeError::ConnectionTimeout { .. })));
}

#[tokio::test]
async fn rejected_tools_list_waits_for_a_later_success() {
    let script = rejecting_first_request_server(
        r#"sleep 0.3
printf '{"jsonrpc":"2.0","id":0,"result":{}}\n'
cat > /dev/null"#,
    );
    let connection = Connection::new(sh_config(&script));

    let started = std::time::Instant::now();
    let result = connection.connect().await;

    assert!(result.is_ok(), "expected connect to succeed, got {:?}", result);
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert_eq!(connection.state(), ConnectionState::Connected);
    connection.disconnect().await;
}

#[tokio::test]
async fn rejected_tools_list_alone_does_not_establish_readiness() {
    let script = rejecting_first_request_server("cat > /dev/null");
    let config = sh_config(&script).with_connect_timeout(Duration::from_millis(500));
    let connection = Connection::new(config);

    let result = connection.connect().await;

    assert!(
        matches!(result, Err(BridgeError::ConnectionTimeout { .. })),
        "expected connect timeout, got {:?}",
        result
    );
    assert_eq!(connection.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn missing_program_fails_connect_with_spawn_error() {
    let connection = Connection::new(ConnectionConfig::new(SubordinateCommand::new(vec![
        "tweetbridge-no-such-server".to_string(),
    ])));

    let result = connection.connect().await;

    assert!(matches!(result, Err(BridgeError::Spawn { .. })));
    assert_eq!(connection.state(), ConnectionState::Disconnected);
}
