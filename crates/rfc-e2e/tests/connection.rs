//! Connection lifecycle against the echo system.

use std::sync::Arc;

use rfc_client::{
    BINDING_VERSION, Client, ClientOperation, ClientOptions, ConnectionError, ConnectionState,
    RfcError, TransportError,
};
use rfc_e2e::{EchoSystem, backend, parameters};
use rstest::{fixture, rstest};

struct Harness {
    system: Arc<EchoSystem>,
    client: Client,
}

#[fixture]
fn harness() -> Harness {
    let system = EchoSystem::new();
    let client = Client::new(&backend(&system), parameters(), ClientOptions::default());
    Harness { system, client }
}

#[rstest]
#[tokio::test]
async fn connection_info_lists_the_session_attributes(harness: Harness) {
    harness.client.connect().await.expect("connect");
    let info = harness.client.connection_info().expect("open session");

    let mapping = serde_json::to_value(&info).expect("serialize info");
    let keys = mapping.as_object().expect("object").len();
    assert_eq!(keys, 20);
    assert_eq!(mapping["user"], "DEMO");
    assert_eq!(mapping["sysNumber"], "00");
    assert_eq!(mapping["client"], "100");
    assert_eq!(mapping["codepage"], "4103");
    assert_eq!(mapping["rfcRole"], "C");
    assert_eq!(info.entries().len(), keys);
}

#[rstest]
#[tokio::test]
async fn closed_clients_have_no_connection_info(harness: Harness) {
    assert_eq!(harness.client.state(), ConnectionState::Closed);
    assert!(harness.client.connection_info().is_none());

    harness.client.connect().await.expect("connect");
    harness.client.close().await;
    assert!(harness.client.connection_info().is_none());
    assert_eq!(harness.system.open_sessions(), 0);
}

#[rstest]
#[tokio::test]
async fn reopen_replaces_the_conversation(harness: Harness) {
    harness.client.connect().await.expect("connect");
    let before = harness.client.connection_info().expect("info").cpic_conv_id;

    harness.client.reopen().await.expect("reopen");
    let after = harness.client.connection_info().expect("info").cpic_conv_id;

    assert_ne!(before, after);
    assert!(harness.client.is_alive());
    assert_eq!(harness.system.logons(), 2);
    assert_eq!(harness.system.open_sessions(), 1);
}

#[rstest]
#[tokio::test]
async fn close_then_connect_starts_a_new_session(harness: Harness) {
    harness.client.connect().await.expect("connect");
    harness.client.close().await;
    assert!(!harness.client.is_alive());
    assert!(!harness.client.ping().await);

    harness.client.connect().await.expect("connect again");
    assert!(harness.client.is_alive());
    assert!(harness.client.ping().await);
    assert_eq!(harness.system.logons(), 2);
}

#[rstest]
#[tokio::test]
async fn refused_logon_reports_the_host(harness: Harness) {
    harness.system.refuse_logons(true);
    let error = harness.client.connect().await.expect_err("refused");

    match error {
        RfcError::Connection {
            operation: ClientOperation::Connect,
            source: ConnectionError::Transport(TransportError::Refused { host, .. }),
            ..
        } => assert_eq!(host, "echo.example"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn missing_password_is_rejected_at_logon() {
    let system = EchoSystem::new();
    let client = Client::new(
        &backend(&system),
        parameters().with_credentials("demo", ""),
        ClientOptions::default(),
    );

    let error = client.connect().await.expect_err("no password");
    assert!(matches!(
        error.connection_error(),
        Some(ConnectionError::Transport(
            TransportError::Authentication { .. }
        ))
    ));
    assert_eq!(system.logons(), 0);
}

#[rstest]
fn version_reports_library_and_binding(harness: Harness) {
    let version = harness.client.version();
    assert_eq!(version.major, 7500);
    assert_eq!(version.minor, 0);
    assert_eq!(version.patch_level, 12);
    assert_eq!(version.binding, BINDING_VERSION);
}

#[rstest]
fn version_cannot_be_replaced(harness: Harness) {
    let replacement = harness.client.version().clone();
    let error = harness
        .client
        .set_version(&replacement)
        .expect_err("read-only");
    assert_eq!(error.to_string(), "property 'version' is read-only");
}
