//! Error types surfaced by clients, dispatchers and pools.

use std::fmt;

use rfc_config::ConfigError;
use rfc_marshal::{MarshalError, RemoteFault};
use thiserror::Error;

use crate::transport::TransportError;

/// Operation being executed when a connection-level error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOperation {
    /// Opening a session.
    Connect,
    /// Closing a session.
    Close,
    /// Replacing a session with a fresh one.
    Reopen,
    /// Liveness probe.
    Ping,
    /// Remote function call.
    Invoke,
    /// Waiting for a pooled connection.
    Acquire,
}

impl fmt::Display for ClientOperation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connect => "connect",
            Self::Close => "close",
            Self::Reopen => "reopen",
            Self::Ping => "ping",
            Self::Invoke => "invoke",
            Self::Acquire => "acquire",
        };
        formatter.write_str(label)
    }
}

/// Why a connection could not serve a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The connection is closed or reopening.
    #[error("connection is not open")]
    NotOpen,
    /// The connection parameters failed validation.
    #[error("invalid connection parameters: {0}")]
    InvalidParameters(#[source] ConfigError),
    /// The transport refused, rejected, lost or timed out the session.
    #[error("transport failure: {0}")]
    Transport(#[source] TransportError),
    /// The session negotiated a codepage the client cannot speak.
    #[error("negotiated codepage '{codepage}' is not supported")]
    UnsupportedCodepage {
        /// Codepage reported by the transport.
        codepage: String,
    },
    /// The session went away before the request was answered.
    #[error("request abandoned before a reply arrived")]
    Abandoned,
    /// No pooled connection became free in time.
    #[error("no pooled connection became available within {waited_ms} ms")]
    PoolTimeout {
        /// Time spent waiting.
        waited_ms: u64,
    },
    /// An unhealthy pool member could not be reopened.
    #[error("connection still unhealthy after {attempts} reopen attempts")]
    ReopenExhausted {
        /// Attempts made under the reopen policy.
        attempts: u32,
    },
}

/// Error raised by the remote system for a specific function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{function} failed with {key} (group {group}, code {code}): {message}")]
pub struct RemoteError {
    /// Function that raised the error.
    pub function: String,
    /// Remote return code.
    pub code: u32,
    /// Remote error group.
    pub group: String,
    /// Remote exception key.
    pub key: String,
    /// Remote message text.
    pub message: String,
}

impl RemoteError {
    /// Attributes a decoded fault to `function`.
    #[must_use]
    pub fn from_fault(function: impl Into<String>, fault: RemoteFault) -> Self {
        Self {
            function: function.into(),
            code: fault.code,
            group: fault.group,
            key: fault.key,
            message: fault.message,
        }
    }
}

/// Attempt to overwrite a read-only client property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("property '{property}' is read-only")]
pub struct ImmutabilityError {
    /// Name of the property.
    pub property: &'static str,
}

/// Errors returned by the client API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RfcError {
    /// The connection could not serve the operation.
    #[error("connection {id} failed during {operation}: {source}")]
    Connection {
        /// Connection identifier.
        id: u64,
        /// Operation that failed.
        operation: ClientOperation,
        /// Underlying failure.
        #[source]
        source: ConnectionError,
    },
    /// The pool could not hand out a connection.
    #[error("pool failed during {operation}: {source}")]
    Pool {
        /// Operation that failed.
        operation: ClientOperation,
        /// Underlying failure.
        #[source]
        source: ConnectionError,
    },
    /// The remote function raised an error.
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// Parameters did not fit the function signature.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    /// A read-only property was written.
    #[error(transparent)]
    Immutable(#[from] ImmutabilityError),
}

impl RfcError {
    /// Wraps a connection-level failure.
    pub(crate) const fn connection(
        id: u64,
        operation: ClientOperation,
        source: ConnectionError,
    ) -> Self {
        Self::Connection {
            id,
            operation,
            source,
        }
    }

    /// The connection-level cause, if this is a connection or pool error.
    #[must_use]
    pub const fn connection_error(&self) -> Option<&ConnectionError> {
        match self {
            Self::Connection { source, .. } | Self::Pool { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The remote error, if the remote function raised one.
    #[must_use]
    pub const fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(error) => Some(error),
            _ => None,
        }
    }

    /// The marshalling error, if parameters were rejected.
    #[must_use]
    pub const fn marshal_error(&self) -> Option<&MarshalError> {
        match self {
            Self::Marshal(error) => Some(error),
            _ => None,
        }
    }
}
