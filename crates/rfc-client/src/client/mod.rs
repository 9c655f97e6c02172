//! Caller-facing client bound to one connection.

use rfc_config::{ClientOptions, ConnectionParameters};
use rfc_marshal::{CallResult, Structure};

use crate::backend::Backend;
use crate::connection::{Connection, ConnectionState};
use crate::dispatcher::{CallHandle, CallOptions, Dispatcher};
use crate::error::{ImmutabilityError, RfcError};
use crate::info::ConnectionInfo;
use crate::version::Version;

/// A connection plus the dispatcher that submits calls to it.
///
/// Clones share the connection. The version and value options are fixed at
/// construction.
#[derive(Debug, Clone)]
pub struct Client {
    dispatcher: Dispatcher,
    version: Version,
}

impl Client {
    /// Builds a closed client.
    #[must_use]
    pub fn new(backend: &Backend, parameters: ConnectionParameters, options: ClientOptions) -> Self {
        let transport = backend.transport();
        let version = Version::from_library(transport.library_version());
        let connection = Connection::new(transport, parameters, options);
        Self {
            dispatcher: Dispatcher::new(connection, backend.signatures()),
            version,
        }
    }

    /// Process-wide unique identifier, always positive.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.connection().id()
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        self.dispatcher.connection()
    }

    /// Opens the session. Does nothing when already open.
    ///
    /// # Errors
    ///
    /// Returns [`RfcError::Connection`] when the session cannot be opened.
    pub async fn connect(&self) -> Result<(), RfcError> {
        self.connection().connect().await
    }

    /// Closes the session after already queued calls finish.
    pub async fn close(&self) {
        self.connection().close().await;
    }

    /// Replaces the session with a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`RfcError::Connection`] when the new session cannot be
    /// opened; the client is then closed.
    pub async fn reopen(&self) -> Result<(), RfcError> {
        self.connection().reopen().await
    }

    /// Round-trips a liveness probe. False when closed.
    pub async fn ping(&self) -> bool {
        self.connection().ping().await
    }

    /// True iff the session is open.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.connection().is_alive()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection().state()
    }

    /// Metadata of the open session, or `None` while closed.
    #[must_use]
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.connection().connection_info()
    }

    /// Library and client crate versions.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// Value options applied to decoded results.
    #[must_use]
    pub fn options(&self) -> ClientOptions {
        self.connection().options()
    }

    /// Always fails: the version is read-only.
    ///
    /// # Errors
    ///
    /// Always returns [`RfcError::Immutable`].
    pub const fn set_version(&self, _version: &Version) -> Result<(), RfcError> {
        Err(RfcError::Immutable(ImmutabilityError {
            property: "version",
        }))
    }

    /// Always fails: options are fixed at construction.
    ///
    /// # Errors
    ///
    /// Always returns [`RfcError::Immutable`].
    pub const fn set_options(&self, _options: ClientOptions) -> Result<(), RfcError> {
        Err(RfcError::Immutable(ImmutabilityError {
            property: "options",
        }))
    }

    /// Calls `function` and waits for its result.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::invoke`].
    pub async fn invoke(
        &self,
        function: impl Into<String>,
        parameters: Structure,
    ) -> Result<CallResult, RfcError> {
        self.dispatcher.invoke(function, parameters).await
    }

    /// Calls `function` with per-call options.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::invoke_with`].
    pub async fn invoke_with(
        &self,
        function: impl Into<String>,
        parameters: Structure,
        options: CallOptions,
    ) -> Result<CallResult, RfcError> {
        self.dispatcher
            .invoke_with(function, parameters, options)
            .await
    }

    /// Queues a call and returns its handle without waiting.
    pub fn submit(
        &self,
        function: impl Into<String>,
        parameters: Structure,
        options: CallOptions,
    ) -> CallHandle {
        self.dispatcher.submit(function, parameters, options)
    }
}
