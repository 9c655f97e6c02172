//! Default values shared by the configuration types.

use crate::logging::LogFormat;

/// Default log filter expression used by [`crate::LogSettings`].
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default number of physical connections a pool may open.
pub const DEFAULT_POOL_CAPACITY: usize = 4;

/// Default time a caller waits for a pooled connection, in milliseconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;

/// Default number of reopen attempts for a pool member failing its health check.
pub const DEFAULT_REOPEN_ATTEMPTS: u32 = 3;

/// Default pause between two reopen attempts, in milliseconds.
pub const DEFAULT_REOPEN_BACKOFF_MS: u64 = 200;

/// Default logon language.
pub const DEFAULT_LANGUAGE: &str = "EN";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
