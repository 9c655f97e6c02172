//! Connection state machine.
//!
//! A [`Connection`] moves between [`ConnectionState::Closed`],
//! [`ConnectionState::Open`] and, while a session is being replaced,
//! [`ConnectionState::Reopening`]. Lifecycle operations on one connection are
//! serialized by an async mutex; requests travel through the session worker's
//! queue so they reach the wire in submission order.

mod state;
mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rfc_config::{ClientOptions, ConnectionParameters};
use rfc_marshal::{Codepage, Marshaller};
use tokio::sync::{mpsc, oneshot};

pub use state::ConnectionState;
pub(crate) use worker::{BoxFuture, Exchange, Job, WireSession};

use crate::error::{ClientOperation, ConnectionError, RfcError};
use crate::info::ConnectionInfo;
use crate::transport::Transport;
use state::{OpenSession, SessionState};
use worker::SessionWorker;

pub(crate) const CONNECTION_TARGET: &str = "rfc_client::connection";

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// One logical connection to the remote system.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) id: u64,
    parameters: ConnectionParameters,
    options: ClientOptions,
    transport: Arc<dyn Transport>,
    state: Mutex<SessionState>,
    lifecycle: tokio::sync::Mutex<()>,
    generations: AtomicU64,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: SessionState) -> Option<OpenSession> {
        self.lock_state().take_session(next)
    }

    /// Marks the connection closed if `generation` is still the live session.
    pub(crate) fn mark_closed(&self, generation: u64) {
        let mut state = self.lock_state();
        if state
            .session()
            .is_some_and(|session| session.generation == generation)
        {
            *state = SessionState::Closed;
        }
    }
}

impl Connection {
    /// Creates a closed connection bound to `transport`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        parameters: ConnectionParameters,
        options: ClientOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
                parameters,
                options,
                transport,
                state: Mutex::new(SessionState::Closed),
                lifecycle: tokio::sync::Mutex::new(()),
                generations: AtomicU64::new(1),
            }),
        }
    }

    /// Process-wide unique identifier, always positive.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock_state().public()
    }

    /// True iff a session is open.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Metadata of the open session, or `None` while closed.
    #[must_use]
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.inner
            .lock_state()
            .session()
            .map(|session| session.info.clone())
    }

    /// Value options decoded results follow.
    #[must_use]
    pub fn options(&self) -> ClientOptions {
        self.inner.options
    }

    /// Opens a session. Does nothing when one is already open.
    ///
    /// # Errors
    ///
    /// Returns [`RfcError::Connection`] when the parameters are invalid, the
    /// transport refuses the session or the negotiated codepage is not
    /// supported.
    pub async fn connect(&self) -> Result<(), RfcError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.is_alive() {
            return Ok(());
        }
        self.open_locked(ClientOperation::Connect).await
    }

    /// Closes the session.
    ///
    /// Requests queued before the call still run; later submissions fail with
    /// [`ConnectionError::NotOpen`]. Closing a closed connection is a no-op.
    pub async fn close(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.shutdown_locked(SessionState::Closed).await;
    }

    /// Replaces the session with a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`RfcError::Connection`] when the new session cannot be opened.
    /// The connection is then closed.
    pub async fn reopen(&self) -> Result<(), RfcError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.shutdown_locked(SessionState::Reopening).await;
        self.open_locked(ClientOperation::Reopen).await
    }

    /// Round-trips a liveness probe. False when not open.
    pub async fn ping(&self) -> bool {
        let (reply, answer) = oneshot::channel();
        if self.send(Job::Probe(reply)).is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }

    /// Queues a job on the open session, handing it back when there is none.
    pub(crate) fn send(&self, job: Job) -> Result<(), Job> {
        let state = self.inner.lock_state();
        match state.session() {
            Some(session) => session
                .jobs
                .send(job)
                .map_err(|mpsc::error::SendError(rejected)| rejected),
            None => Err(job),
        }
    }

    async fn open_locked(&self, operation: ClientOperation) -> Result<(), RfcError> {
        let result = self.open_session().await;
        if let Err(error) = &result {
            self.inner.set_state(SessionState::Closed);
            tracing::warn!(
                target: CONNECTION_TARGET,
                event = "open_failed",
                connection = self.inner.id,
                operation = %operation,
                error = %error,
                "could not open session"
            );
        }
        result.map_err(|source| RfcError::connection(self.inner.id, operation, source))
    }

    async fn open_session(&self) -> Result<(), ConnectionError> {
        let inner = &self.inner;
        inner
            .parameters
            .validate()
            .map_err(ConnectionError::InvalidParameters)?;
        let session = inner
            .transport
            .open_session(&inner.parameters)
            .await
            .map_err(ConnectionError::Transport)?;
        let Ok(codepage) = session.info.codepage.parse::<Codepage>() else {
            inner.transport.close_session(session.handle).await;
            return Err(ConnectionError::UnsupportedCodepage {
                codepage: session.info.codepage,
            });
        };

        let generation = inner.generations.fetch_add(1, Ordering::Relaxed);
        let (jobs, queue) = mpsc::unbounded_channel();
        let worker = SessionWorker::new(
            Arc::downgrade(inner),
            generation,
            Arc::clone(&inner.transport),
            session.handle,
            Marshaller::new(inner.options, codepage),
            queue,
        );
        tokio::spawn(worker.run());

        tracing::info!(
            target: CONNECTION_TARGET,
            event = "session_opened",
            connection = inner.id,
            session = session.handle.raw(),
            conversation = %session.info.cpic_conv_id,
            codepage = %codepage,
            "session opened"
        );
        inner.set_state(SessionState::Open(OpenSession {
            generation,
            jobs,
            info: session.info,
        }));
        Ok(())
    }

    async fn shutdown_locked(&self, next: SessionState) {
        let Some(session) = self.inner.set_state(next) else {
            return;
        };
        let (done, finished) = oneshot::channel();
        if session.jobs.send(Job::Shutdown(done)).is_err() {
            return;
        }
        if finished.await.is_err() {
            tracing::debug!(
                target: CONNECTION_TARGET,
                connection = self.inner.id,
                "session worker exited before acknowledging close"
            );
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
