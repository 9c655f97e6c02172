//! Invocation dispatcher.
//!
//! Turns a function name and parameters into a queued exchange on a
//! connection. Submission returns at once with a [`CallHandle`]; the session
//! worker later looks up the signature, encodes the request, moves it over
//! the wire and decodes the reply, completing the handle exactly once.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rfc_marshal::{CallOutcome, CallRequest, CallResult, MarshalError, Structure};
use tokio::sync::oneshot;

use crate::connection::{BoxFuture, Connection, Exchange, Job, WireSession};
use crate::error::{ClientOperation, ConnectionError, RemoteError, RfcError};
use crate::metadata::SignatureCache;
use crate::transport::TransportError;

const DISPATCHER_TARGET: &str = "rfc_client::dispatcher";

type Reply = oneshot::Sender<Result<CallResult, RfcError>>;

/// Per-call settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Output parameters the caller does not want computed or returned.
    pub not_requested: Vec<String>,
    /// Deadline for the wire exchange. Expiry closes the connection.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Returns a copy that also skips `parameter`.
    #[must_use]
    pub fn not_requested(mut self, parameter: impl Into<String>) -> Self {
        self.not_requested.push(parameter.into());
        self
    }

    /// Returns a copy with the given exchange deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Submits calls to one connection.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    connection: Connection,
    signatures: Arc<SignatureCache>,
}

impl Dispatcher {
    /// Binds a dispatcher to `connection`.
    #[must_use]
    pub const fn new(connection: Connection, signatures: Arc<SignatureCache>) -> Self {
        Self {
            connection,
            signatures,
        }
    }

    /// The connection calls are queued on.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Queues a call and returns immediately.
    ///
    /// Failures detected at submission, such as an empty function name or a
    /// closed connection, are delivered through the returned handle.
    pub fn submit(
        &self,
        function: impl Into<String>,
        parameters: Structure,
        options: CallOptions,
    ) -> CallHandle {
        let connection_id = self.connection.id();
        let (reply, receiver) = oneshot::channel();
        let handle = CallHandle {
            connection_id,
            receiver,
        };
        let request = CallRequest::with_parameters(function, parameters);
        if request.function().trim().is_empty() {
            deliver(reply, Err(MarshalError::EmptyFunctionName.into()));
            return handle;
        }
        tracing::debug!(
            target: DISPATCHER_TARGET,
            event = "call_submitted",
            connection = connection_id,
            function = request.function(),
            "call queued"
        );
        let job = Job::Exchange(Box::new(CallJob {
            connection_id,
            request,
            options,
            signatures: Arc::clone(&self.signatures),
            reply,
        }));
        if let Err(rejected) = self.connection.send(job) {
            rejected.abort(ConnectionError::NotOpen);
        }
        handle
    }

    /// Calls `function` and waits for its result.
    ///
    /// # Errors
    ///
    /// Returns [`RfcError::Marshal`] when the parameters do not fit the
    /// signature, [`RfcError::Remote`] when the function raised an error and
    /// [`RfcError::Connection`] when the connection could not carry the call.
    pub async fn invoke(
        &self,
        function: impl Into<String>,
        parameters: Structure,
    ) -> Result<CallResult, RfcError> {
        self.submit(function, parameters, CallOptions::default())
            .await
    }

    /// Like [`Dispatcher::invoke`] with per-call options.
    ///
    /// # Errors
    ///
    /// As for [`Dispatcher::invoke`]; an expired timeout is reported as
    /// [`RfcError::Connection`].
    pub async fn invoke_with(
        &self,
        function: impl Into<String>,
        parameters: Structure,
        options: CallOptions,
    ) -> Result<CallResult, RfcError> {
        self.submit(function, parameters, options).await
    }
}

/// Completion of one submitted call.
///
/// Dropping the handle before the call reaches the wire skips the call.
#[derive(Debug)]
#[must_use = "a call handle does nothing unless awaited"]
pub struct CallHandle {
    connection_id: u64,
    receiver: oneshot::Receiver<Result<CallResult, RfcError>>,
}

impl CallHandle {
    /// Connection the call was submitted to.
    #[must_use]
    pub const fn connection_id(&self) -> u64 {
        self.connection_id
    }
}

impl Future for CallHandle {
    type Output = Result<CallResult, RfcError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let connection_id = self.connection_id;
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(RfcError::connection(
                    connection_id,
                    ClientOperation::Invoke,
                    ConnectionError::Abandoned,
                ))
            })
        })
    }
}

fn deliver(reply: Reply, outcome: Result<CallResult, RfcError>) {
    if reply.send(outcome).is_err() {
        tracing::debug!(target: DISPATCHER_TARGET, "caller dropped its call handle");
    }
}

struct CallJob {
    connection_id: u64,
    request: CallRequest,
    options: CallOptions,
    signatures: Arc<SignatureCache>,
    reply: Reply,
}

impl CallJob {
    async fn execute(self, wire: &WireSession) -> Result<(), TransportError> {
        if self.reply.is_closed() {
            tracing::debug!(
                target: DISPATCHER_TARGET,
                event = "call_skipped",
                connection = wire.connection(),
                function = self.request.function(),
                "caller went away before the call reached the wire"
            );
            return Ok(());
        }
        let Self {
            request,
            options,
            signatures,
            reply,
            ..
        } = self;
        let function = request.function().to_owned();
        let signature = match signatures.signature(&function).await {
            Ok(found) => found,
            Err(error) => {
                deliver(reply, Err(error.into()));
                return Ok(());
            }
        };
        let frame = match wire
            .marshaller()
            .encode_request(&signature, &request, &options.not_requested)
        {
            Ok(encoded) => encoded,
            Err(error) => {
                deliver(reply, Err(error.into()));
                return Ok(());
            }
        };
        let response = match wire.exchange(frame, options.timeout).await {
            Ok(received) => received,
            Err(error) => {
                tracing::warn!(
                    target: DISPATCHER_TARGET,
                    event = "call_failed",
                    connection = wire.connection(),
                    function = %function,
                    error = %error,
                    "exchange failed"
                );
                let tear_down = error.tears_down_session();
                if tear_down {
                    wire.invalidate();
                }
                deliver(
                    reply,
                    Err(RfcError::connection(
                        wire.connection(),
                        ClientOperation::Invoke,
                        ConnectionError::Transport(error.clone()),
                    )),
                );
                return if tear_down { Err(error) } else { Ok(()) };
            }
        };
        let outcome = wire
            .marshaller()
            .decode_response(&signature, &response, &options.not_requested)
            .map_err(RfcError::from)
            .and_then(|decoded| match decoded {
                CallOutcome::Completed(result) => Ok(result),
                CallOutcome::Failed(fault) => {
                    Err(RemoteError::from_fault(function.as_str(), fault).into())
                }
            });
        tracing::debug!(
            target: DISPATCHER_TARGET,
            event = "call_completed",
            connection = wire.connection(),
            function = %function,
            ok = outcome.is_ok(),
            "call completed"
        );
        deliver(reply, outcome);
        Ok(())
    }
}

impl Exchange for CallJob {
    fn run(self: Box<Self>, wire: WireSession) -> BoxFuture<Result<(), TransportError>> {
        Box::pin(async move { self.execute(&wire).await })
    }

    fn abort(self: Box<Self>, error: ConnectionError) {
        tracing::debug!(
            target: DISPATCHER_TARGET,
            event = "call_aborted",
            connection = self.connection_id,
            function = self.request.function(),
            error = %error,
            "call failed before reaching the wire"
        );
        deliver(
            self.reply,
            Err(RfcError::connection(
                self.connection_id,
                ClientOperation::Invoke,
                error,
            )),
        );
    }
}

#[cfg(test)]
mod tests;
