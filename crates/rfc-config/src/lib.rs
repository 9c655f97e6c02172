//! Construction-time configuration shared by the RFC client crates.
//!
//! Everything here is plain data. The embedding application (or whatever
//! external source it reads credentials and settings from) deserializes these
//! types with `serde` and hands them to `rfc-client` when it builds a client
//! or a pool. The crate never reads files or the environment on its own.
//!
//! - [`ClientOptions`] fixes how decoded values are represented.
//! - [`ConnectionParameters`] carries logon data for one backend system.
//! - [`PoolSettings`] bounds a connection pool and carries its
//!   [`ReopenPolicy`].
//! - [`LogSettings`] drives the optional telemetry bootstrap.

mod defaults;
mod error;
mod logging;
mod options;
mod parameters;
mod pool;

pub use defaults::{
    DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_LANGUAGE, DEFAULT_LOG_FILTER, DEFAULT_POOL_CAPACITY,
    DEFAULT_REOPEN_ATTEMPTS, DEFAULT_REOPEN_BACKOFF_MS, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use error::ConfigError;
pub use logging::{LogFormat, LogFormatParseError, LogSettings};
pub use options::{
    BcdRepresentation, ClientOptions, DateRepresentation, RepresentationParseError,
    TimeRepresentation,
};
pub use parameters::ConnectionParameters;
pub use pool::{PoolSettings, ReopenPolicy};
