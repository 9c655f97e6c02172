//! Asynchronous client for remote function calls.
//!
//! A [`Client`] owns one logical connection to the remote system and submits
//! calls through a per-connection FIFO queue: calls on one connection reach
//! the wire in submission order, while calls on different connections run
//! independently. Each submission returns immediately with a [`CallHandle`]
//! that completes exactly once with the decoded [`CallResult`] or an
//! [`RfcError`].
//!
//! The crate performs no network I/O itself. The native library is reached
//! through the [`Transport`] trait and function signatures through
//! [`SignatureLookup`]; a [`Backend`] bundles both for the clients and
//! [`Pool`]s built on it. Values are converted by `rfc-marshal` using the
//! codepage negotiated when the session opens.
//!
//! ## Pooling
//!
//! A [`Pool`] lends clients out exclusively. Members are created lazily,
//! health-checked on every acquisition and reopened, never evicted, when the
//! check fails, up to the pool's reopen policy. Pool events are reported to a
//! [`HealthReporter`]; the default one emits structured `tracing` events.
//!
//! ## Telemetry
//!
//! All components log through `tracing` under the `rfc_client::*` targets.
//! [`telemetry::initialise`] installs a default subscriber, or leaves the
//! application's own in place when it already has one.

mod backend;
mod client;
mod connection;
mod dispatcher;
mod error;
mod health;
mod info;
mod metadata;
mod pool;
pub mod telemetry;
mod transport;
mod version;

pub use backend::Backend;
pub use client::Client;
pub use connection::{Connection, ConnectionState};
pub use dispatcher::{CallHandle, CallOptions, Dispatcher};
pub use error::{ClientOperation, ConnectionError, ImmutabilityError, RemoteError, RfcError};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use info::ConnectionInfo;
pub use metadata::{SignatureCache, SignatureLookup};
pub use pool::{Lease, Pool, PoolStatus};
pub use telemetry::{SubscriberOwner, TelemetryError, TelemetryHandle};
pub use transport::{LibraryVersion, Session, SessionHandle, Transport, TransportError};
pub use version::{BINDING_VERSION, Version};

pub use rfc_config::{
    BcdRepresentation, ClientOptions, ConnectionParameters, DateRepresentation, LogFormat,
    LogSettings, PoolSettings, ReopenPolicy, TimeRepresentation,
};
pub use rfc_marshal::{
    CallResult, Codepage, Decimal, FieldDescriptor, FieldType, FieldValue, FunctionSignature,
    MarshalError, ParameterDescriptor, ParameterDirection, RemoteFault, Structure, StructureType,
};

#[cfg(test)]
mod tests;
