//! Unit tests for call submission, ordering and failure routing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use rfc_config::ClientOptions;
use rfc_marshal::{FieldValue, FunctionSignature};
use rstest::{fixture, rstest};

use super::*;
use crate::connection::ConnectionState;
use crate::metadata::SignatureLookup;
use crate::tests::{
    ECHO, RAISE, SLOW, StubLookup, StubTransport, echo_request, echo_signature, parameters,
};
use crate::transport::Transport;

mock! {
    Lookup {}
    #[async_trait]
    impl SignatureLookup for Lookup {
        async fn lookup_signature(&self, function: &str) -> Result<FunctionSignature, RemoteError>;
    }
}

#[fixture]
fn transport() -> Arc<StubTransport> {
    StubTransport::new()
}

fn dispatcher_over(transport: &Arc<StubTransport>, lookup: Arc<dyn SignatureLookup>) -> Dispatcher {
    let connection = Connection::new(
        Arc::clone(transport) as Arc<dyn Transport>,
        parameters(),
        ClientOptions::default(),
    );
    Dispatcher::new(connection, Arc::new(SignatureCache::new(lookup)))
}

async fn open_dispatcher(transport: &Arc<StubTransport>) -> Dispatcher {
    let dispatcher = dispatcher_over(transport, Arc::new(StubLookup));
    dispatcher.connection().connect().await.expect("connect");
    dispatcher
}

fn echoed(result: &CallResult) -> &str {
    result
        .get("ECHOTEXT")
        .and_then(FieldValue::as_text)
        .expect("ECHOTEXT in result")
}

#[rstest]
#[tokio::test]
async fn invoke_round_trips_parameters(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let result = dispatcher
        .invoke(ECHO, echo_request("hello"))
        .await
        .expect("invoke");

    assert_eq!(echoed(&result), "hello");
    assert_eq!(
        result.get("RESPTEXT").and_then(FieldValue::as_text),
        Some("stub response")
    );
}

#[rstest]
#[tokio::test]
async fn unicode_text_survives_the_round_trip(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let result = dispatcher
        .invoke(ECHO, echo_request("ÄÖÜ字€"))
        .await
        .expect("invoke");
    assert_eq!(echoed(&result), "ÄÖÜ字€");
}

#[rstest]
#[tokio::test]
async fn signatures_are_looked_up_once(transport: Arc<StubTransport>) {
    let mut lookup = MockLookup::new();
    lookup
        .expect_lookup_signature()
        .times(1)
        .returning(|function: &str| Ok(echo_signature(function)));
    let dispatcher = dispatcher_over(&transport, Arc::new(lookup));
    dispatcher.connection().connect().await.expect("connect");

    for text in ["one", "two", "three"] {
        let result = dispatcher
            .invoke(ECHO, echo_request(text))
            .await
            .expect("invoke");
        assert_eq!(echoed(&result), text);
    }
}

#[rstest]
#[tokio::test]
async fn failed_lookups_surface_as_remote_errors_and_are_retried(transport: Arc<StubTransport>) {
    let mut lookup = MockLookup::new();
    lookup
        .expect_lookup_signature()
        .times(2)
        .returning(|function: &str| {
            Err(RemoteError {
                function: function.to_owned(),
                code: 5,
                group: "ABAP_ERROR".to_owned(),
                key: "FU_NOT_FOUND".to_owned(),
                message: "missing".to_owned(),
            })
        });
    let dispatcher = dispatcher_over(&transport, Arc::new(lookup));
    dispatcher.connection().connect().await.expect("connect");

    for _ in 0..2 {
        let error = dispatcher
            .invoke("Z_MISSING", Structure::new())
            .await
            .expect_err("lookup fails");
        assert_eq!(
            error.remote_error().map(|remote| remote.key.as_str()),
            Some("FU_NOT_FOUND")
        );
    }
    assert_eq!(transport.exchanges(), 0);
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
#[tokio::test]
async fn empty_function_names_are_rejected(transport: Arc<StubTransport>, #[case] name: &str) {
    let lookup = MockLookup::new();
    let dispatcher = dispatcher_over(&transport, Arc::new(lookup));
    dispatcher.connection().connect().await.expect("connect");

    let error = dispatcher
        .invoke(name, Structure::new())
        .await
        .expect_err("empty name");
    assert_eq!(error.marshal_error(), Some(&MarshalError::EmptyFunctionName));
    assert_eq!(transport.exchanges(), 0);
}

#[rstest]
#[tokio::test]
async fn unknown_parameters_fail_before_the_wire(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let error = dispatcher
        .invoke(ECHO, Structure::new().with("NOPE", "x"))
        .await
        .expect_err("unknown parameter");

    assert!(matches!(
        error.marshal_error(),
        Some(MarshalError::UnknownParameter { parameter, .. }) if parameter == "NOPE"
    ));
    assert_eq!(transport.exchanges(), 0);
    assert!(dispatcher.connection().is_alive());
}

#[rstest]
#[tokio::test]
async fn mistyped_values_fail_before_the_wire(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let error = dispatcher
        .invoke(ECHO, Structure::new().with("REQUTEXT", 42_i64))
        .await
        .expect_err("integer for a char field");

    assert!(matches!(
        error.marshal_error(),
        Some(MarshalError::TypeMismatch { .. })
    ));
    assert_eq!(transport.exchanges(), 0);
}

#[rstest]
#[tokio::test]
async fn calls_on_a_closed_connection_fail(transport: Arc<StubTransport>) {
    let dispatcher = dispatcher_over(&transport, Arc::new(StubLookup));
    let error = dispatcher
        .invoke(ECHO, echo_request("x"))
        .await
        .expect_err("closed");

    assert!(matches!(
        error,
        RfcError::Connection {
            operation: ClientOperation::Invoke,
            source: ConnectionError::NotOpen,
            ..
        }
    ));
}

#[rstest]
#[tokio::test]
async fn remote_faults_become_remote_errors(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let error = dispatcher
        .invoke(ECHO, echo_request(RAISE))
        .await
        .expect_err("remote fault");

    let remote = error.remote_error().expect("remote error");
    assert_eq!(remote.function, ECHO);
    assert_eq!(remote.key, "STUB_RAISED");
    assert_eq!(remote.group, "ABAP_EXCEPTION");
    assert!(dispatcher.connection().is_alive());
}

#[rstest]
#[tokio::test]
async fn not_requested_outputs_are_omitted(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let result = dispatcher
        .invoke_with(
            ECHO,
            echo_request("quiet"),
            CallOptions::default().not_requested("RESPTEXT"),
        )
        .await
        .expect("invoke");

    assert_eq!(echoed(&result), "quiet");
    assert!(result.get("RESPTEXT").is_none());
}

#[rstest]
#[tokio::test]
async fn not_requested_names_must_exist(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let error = dispatcher
        .invoke_with(
            ECHO,
            echo_request("x"),
            CallOptions::default().not_requested("MISSING"),
        )
        .await
        .expect_err("unknown not-requested name");
    assert!(error.marshal_error().is_some());
}

#[rstest]
#[tokio::test]
async fn submissions_run_in_order(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let handles: Vec<CallHandle> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|text| dispatcher.submit(ECHO, echo_request(text), CallOptions::default()))
        .collect();
    assert_eq!(transport.exchanges(), 0);

    for (handle, text) in handles.into_iter().zip(["a", "b", "c", "d"]) {
        let result = handle.await.expect("call");
        assert_eq!(echoed(&result), text);
    }
    assert_eq!(transport.seen(), vec!["a", "b", "c", "d"]);
}

#[rstest]
#[tokio::test]
async fn dropped_handles_are_skipped(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let kept = dispatcher.submit(ECHO, echo_request("kept"), CallOptions::default());
    let dropped = dispatcher.submit(ECHO, echo_request("dropped"), CallOptions::default());
    drop(dropped);
    let last = dispatcher.submit(ECHO, echo_request("last"), CallOptions::default());

    kept.await.expect("kept call");
    last.await.expect("last call");
    assert_eq!(transport.seen(), vec!["kept", "last"]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn back_to_back_calls_both_complete(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let started = tokio::time::Instant::now();
    let first = dispatcher.submit(SLOW, echo_request("first"), CallOptions::default());
    let second = dispatcher.submit(SLOW, echo_request("second"), CallOptions::default());
    assert!(started.elapsed() < Duration::from_millis(1));

    let (first_result, second_result) = tokio::join!(first, second);
    assert_eq!(echoed(&first_result.expect("first")), "first");
    assert_eq!(echoed(&second_result.expect("second")), "second");
    assert!(started.elapsed() >= Duration::from_secs(2));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn timeouts_close_the_connection_and_fail_queued_calls(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let slow = dispatcher.submit(
        SLOW,
        echo_request("slow"),
        CallOptions::default().with_timeout(Duration::from_millis(100)),
    );
    let queued = dispatcher.submit(ECHO, echo_request("queued"), CallOptions::default());

    let timed_out = slow.await.expect_err("timeout");
    assert!(matches!(
        timed_out.connection_error(),
        Some(ConnectionError::Transport(TransportError::TimedOut))
    ));
    let aborted = queued.await.expect_err("queued call fails");
    assert!(matches!(
        aborted.connection_error(),
        Some(ConnectionError::Transport(TransportError::TimedOut))
    ));
    assert_eq!(dispatcher.connection().state(), ConnectionState::Closed);
    assert_eq!(transport.closed().len(), 1);
}

#[rstest]
#[tokio::test]
async fn lost_sessions_are_torn_down(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    transport.fail_next_exchange(TransportError::Lost {
        message: "partner reset".to_owned(),
    });

    let error = dispatcher
        .invoke(ECHO, echo_request("x"))
        .await
        .expect_err("lost");
    assert!(matches!(
        error.connection_error(),
        Some(ConnectionError::Transport(TransportError::Lost { .. }))
    ));
    assert!(!dispatcher.connection().is_alive());

    let after = dispatcher
        .invoke(ECHO, echo_request("y"))
        .await
        .expect_err("closed afterwards");
    assert!(matches!(
        after.connection_error(),
        Some(ConnectionError::NotOpen)
    ));
}

#[rstest]
#[tokio::test]
async fn recoverable_transport_errors_keep_the_session(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    transport.fail_next_exchange(TransportError::Negotiation {
        message: "transient".to_owned(),
    });

    dispatcher
        .invoke(ECHO, echo_request("x"))
        .await
        .expect_err("transient failure");
    assert!(dispatcher.connection().is_alive());
    let result = dispatcher
        .invoke(ECHO, echo_request("y"))
        .await
        .expect("session still usable");
    assert_eq!(echoed(&result), "y");
}

#[rstest]
#[tokio::test]
async fn calls_queued_before_close_still_complete(transport: Arc<StubTransport>) {
    let dispatcher = open_dispatcher(&transport).await;
    let pending = dispatcher.submit(ECHO, echo_request("before"), CallOptions::default());
    dispatcher.connection().close().await;

    let result = pending.await.expect("queued before close");
    assert_eq!(echoed(&result), "before");
    assert!(!dispatcher.connection().is_alive());
}
