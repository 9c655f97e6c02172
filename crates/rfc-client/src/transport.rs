//! Boundary to the native transport that moves bytes to the remote system.
//!
//! The client never opens sockets itself. A [`Transport`] implementation owns
//! sessions, and the client drives it through this narrow interface, which
//! also lets tests substitute an in-memory backend.

use async_trait::async_trait;
use bytes::Bytes;
use rfc_config::ConnectionParameters;
use thiserror::Error;

use crate::info::ConnectionInfo;

/// Opaque session identifier assigned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    /// Wraps a transport-specific identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The transport-specific identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A freshly opened session and the metadata negotiated for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Handle for later exchanges.
    pub handle: SessionHandle,
    /// Negotiated session metadata.
    pub info: ConnectionInfo,
}

/// Version of the native transport library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch level.
    pub patch_level: u32,
}

/// Failures reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote host refused the session.
    #[error("connection to '{host}' refused: {message}")]
    Refused {
        /// Host that refused.
        host: String,
        /// Transport message.
        message: String,
    },
    /// Logon credentials were rejected.
    #[error("logon rejected: {message}")]
    Authentication {
        /// Transport message.
        message: String,
    },
    /// Protocol or codepage negotiation failed.
    #[error("session negotiation failed: {message}")]
    Negotiation {
        /// Transport message.
        message: String,
    },
    /// The session broke during an exchange.
    #[error("session lost: {message}")]
    Lost {
        /// Transport message.
        message: String,
    },
    /// The exchange did not complete before its deadline.
    #[error("exchange timed out")]
    TimedOut,
}

impl TransportError {
    /// Whether the session is unusable after this error.
    #[must_use]
    pub const fn tears_down_session(&self) -> bool {
        matches!(self, Self::Lost { .. } | Self::TimedOut)
    }
}

/// Native transport consumed by connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a session with logon and codepage negotiation.
    async fn open_session(
        &self,
        parameters: &ConnectionParameters,
    ) -> Result<Session, TransportError>;

    /// Closes a session. Closing an unknown handle is a no-op.
    async fn close_session(&self, handle: SessionHandle);

    /// Sends one request frame and waits for its response frame.
    async fn send_receive(
        &self,
        handle: SessionHandle,
        request: Bytes,
    ) -> Result<Bytes, TransportError>;

    /// Round-trips a liveness probe.
    async fn probe(&self, handle: SessionHandle) -> bool;

    /// Version of the underlying library.
    fn library_version(&self) -> LibraryVersion;
}
