//! Per-session worker that owns the wire.
//!
//! Each open session is served by one task draining an unbounded queue, so
//! requests on a connection run strictly in submission order and only one of
//! them holds the wire at a time. A lost or timed-out exchange ends the
//! session: the worker marks the connection closed, fails everything still
//! queued, and exits.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use rfc_marshal::Marshaller;
use tokio::sync::{mpsc, oneshot};

use super::{CONNECTION_TARGET, Inner};
use crate::error::ConnectionError;
use crate::transport::{SessionHandle, Transport, TransportError};

/// Boxed future returned by queued exchanges.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A request that needs the wire, queued behind earlier ones.
pub(crate) trait Exchange: Send {
    /// Runs the exchange. An error tears the session down.
    fn run(self: Box<Self>, wire: WireSession) -> BoxFuture<Result<(), TransportError>>;

    /// Fails the exchange without running it.
    fn abort(self: Box<Self>, error: ConnectionError);
}

/// Work items accepted by the session worker.
pub(crate) enum Job {
    Exchange(Box<dyn Exchange>),
    Probe(oneshot::Sender<bool>),
    Shutdown(oneshot::Sender<()>),
}

impl Job {
    /// Answers a job that will never run.
    pub(crate) fn abort(self, error: ConnectionError) {
        match self {
            Self::Exchange(exchange) => exchange.abort(error),
            Self::Probe(reply) => {
                if reply.send(false).is_err() {
                    tracing::trace!(target: CONNECTION_TARGET, "probe caller went away");
                }
            }
            Self::Shutdown(done) => {
                if done.send(()).is_err() {
                    tracing::trace!(target: CONNECTION_TARGET, "close caller went away");
                }
            }
        }
    }
}

/// The session as seen by a running exchange.
#[derive(Clone)]
pub(crate) struct WireSession {
    owner: Weak<Inner>,
    generation: u64,
    connection: u64,
    transport: Arc<dyn Transport>,
    handle: SessionHandle,
    marshaller: Marshaller,
}

impl WireSession {
    pub(crate) const fn connection(&self) -> u64 {
        self.connection
    }

    pub(crate) const fn marshaller(&self) -> &Marshaller {
        &self.marshaller
    }

    /// Marks the connection closed if this session is still the live one.
    pub(crate) fn invalidate(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.mark_closed(self.generation);
        }
    }

    /// Sends a frame and waits for the reply, honouring an optional deadline.
    pub(crate) async fn exchange(
        &self,
        request: Bytes,
        timeout: Option<Duration>,
    ) -> Result<Bytes, TransportError> {
        let pending = self.transport.send_receive(self.handle, request);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .unwrap_or(Err(TransportError::TimedOut)),
            None => pending.await,
        }
    }
}

/// Task state for one session.
pub(crate) struct SessionWorker {
    wire: WireSession,
    jobs: mpsc::UnboundedReceiver<Job>,
}

impl SessionWorker {
    pub(crate) fn new(
        owner: Weak<Inner>,
        generation: u64,
        transport: Arc<dyn Transport>,
        handle: SessionHandle,
        marshaller: Marshaller,
        jobs: mpsc::UnboundedReceiver<Job>,
    ) -> Self {
        let connection = owner.upgrade().map_or(0, |inner| inner.id);
        Self {
            wire: WireSession {
                owner,
                generation,
                connection,
                transport,
                handle,
                marshaller,
            },
            jobs,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(job) = self.jobs.recv().await {
            match job {
                Job::Exchange(exchange) => {
                    if let Err(error) = exchange.run(self.wire.clone()).await {
                        self.tear_down(&error).await;
                        return;
                    }
                }
                Job::Probe(reply) => {
                    let alive = self.wire.transport.probe(self.wire.handle).await;
                    if reply.send(alive).is_err() {
                        tracing::trace!(target: CONNECTION_TARGET, "probe caller went away");
                    }
                }
                Job::Shutdown(done) => {
                    self.close_session().await;
                    if done.send(()).is_err() {
                        tracing::trace!(target: CONNECTION_TARGET, "close caller went away");
                    }
                    return;
                }
            }
        }
        // Every sender is gone: the connection was dropped while open.
        self.close_session().await;
    }

    async fn tear_down(&mut self, error: &TransportError) {
        tracing::warn!(
            target: CONNECTION_TARGET,
            event = "session_lost",
            connection = self.wire.connection,
            error = %error,
            "session torn down after transport failure"
        );
        self.wire.invalidate();
        self.jobs.close();
        self.close_session().await;
        while let Ok(job) = self.jobs.try_recv() {
            job.abort(ConnectionError::Transport(error.clone()));
        }
    }

    async fn close_session(&self) {
        self.wire.transport.close_session(self.wire.handle).await;
        tracing::debug!(
            target: CONNECTION_TARGET,
            event = "session_closed",
            connection = self.wire.connection,
            session = self.wire.handle.raw(),
            "session closed"
        );
    }
}
