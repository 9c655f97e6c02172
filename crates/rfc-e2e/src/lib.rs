//! End-to-end harness for the RFC client.
//!
//! [`EchoSystem`] stands in for a remote system: it implements both the
//! client's [`Transport`](rfc_client::Transport) and
//! [`SignatureLookup`](rfc_client::SignatureLookup), decodes request frames
//! with the same marshaller the client uses, and serves the connectivity
//! test modules listed in [`functions`]. The suites under `tests/` drive real
//! clients and pools against it.

pub mod functions;
mod system;

pub use system::EchoSystem;

use std::sync::Arc;

use rfc_client::{Backend, ConnectionParameters};

/// Logon parameters accepted by [`EchoSystem`].
#[must_use]
pub fn parameters() -> ConnectionParameters {
    ConnectionParameters::new("echo.example", "00", "100")
        .with_credentials("demo", "welcome")
        .with_language("EN")
}

/// A backend whose transport and metadata are both `system`.
#[must_use]
pub fn backend(system: &Arc<EchoSystem>) -> Backend {
    Backend::new(Arc::clone(system) as _, Arc::clone(system) as _)
}
