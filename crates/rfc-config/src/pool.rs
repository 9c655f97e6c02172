//! Bounds and recovery policy for a connection pool.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_POOL_CAPACITY, DEFAULT_REOPEN_ATTEMPTS,
    DEFAULT_REOPEN_BACKOFF_MS,
};
use crate::error::ConfigError;

/// How often a pool member that fails its health check is reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReopenPolicy {
    /// Reopen attempts before the acquisition fails. Zero disables reopening.
    pub max_attempts: u32,
    /// Pause before each attempt after the first, in milliseconds.
    pub backoff_ms: u64,
}

impl ReopenPolicy {
    /// A policy that never reopens.
    #[must_use]
    pub const fn never() -> Self {
        Self {
            max_attempts: 0,
            backoff_ms: 0,
        }
    }

    /// Pause between attempts.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for ReopenPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_REOPEN_ATTEMPTS,
            backoff_ms: DEFAULT_REOPEN_BACKOFF_MS,
        }
    }
}

/// Pool size, acquisition deadline and reopen policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Maximum number of physical connections.
    pub capacity: usize,
    /// How long `acquire` waits for a free connection, in milliseconds.
    pub acquire_timeout_ms: u64,
    /// Recovery policy for unhealthy members.
    pub reopen: ReopenPolicy,
}

impl PoolSettings {
    /// Settings for a pool of `capacity` connections with default timing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Returns a copy with the given acquisition deadline.
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns a copy with the given reopen policy.
    #[must_use]
    pub const fn with_reopen(mut self, reopen: ReopenPolicy) -> Self {
        self.reopen = reopen;
        self
    }

    /// Acquisition deadline.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Checks the settings describe a usable pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPool`] for a zero capacity and
    /// [`ConfigError::ZeroAcquireTimeout`] for a zero deadline.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::EmptyPool);
        }
        if self.acquire_timeout_ms == 0 {
            return Err(ConfigError::ZeroAcquireTimeout);
        }
        Ok(())
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_CAPACITY,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            reopen: ReopenPolicy::default(),
        }
    }
}
