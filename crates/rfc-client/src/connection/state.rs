//! Lifecycle state of a connection.

use std::fmt;

use tokio::sync::mpsc;

use super::worker::Job;
use crate::info::ConnectionInfo;

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No session. The initial state.
    Closed,
    /// A session is open and accepting requests.
    Open,
    /// The session is being replaced.
    Reopening,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Reopening => "reopening",
        };
        formatter.write_str(label)
    }
}

/// Internal state, including the queue feeding the session worker.
pub(crate) enum SessionState {
    Closed,
    Open(OpenSession),
    Reopening,
}

/// Everything tied to one open session.
pub(crate) struct OpenSession {
    /// Distinguishes this session from earlier ones on the same connection.
    pub(crate) generation: u64,
    pub(crate) jobs: mpsc::UnboundedSender<Job>,
    pub(crate) info: ConnectionInfo,
}

impl SessionState {
    pub(crate) const fn public(&self) -> ConnectionState {
        match self {
            Self::Closed => ConnectionState::Closed,
            Self::Open(_) => ConnectionState::Open,
            Self::Reopening => ConnectionState::Reopening,
        }
    }

    pub(crate) const fn session(&self) -> Option<&OpenSession> {
        match self {
            Self::Open(session) => Some(session),
            _ => None,
        }
    }

    /// Replaces the state, returning the session it held, if any.
    pub(crate) fn take_session(&mut self, next: Self) -> Option<OpenSession> {
        match std::mem::replace(self, next) {
            Self::Open(session) => Some(session),
            Self::Closed | Self::Reopening => None,
        }
    }
}
