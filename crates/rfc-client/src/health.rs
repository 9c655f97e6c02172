//! Structured health reporting for pool lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use crate::error::RfcError;

const HEALTH_TARGET: &str = "rfc_client::health";

/// Observer trait used to surface pool events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// A pool member opened its session.
    fn member_opened(&self, connection: u64);

    /// A pool member could not open its session.
    fn member_open_failed(&self, connection: u64, error: &RfcError);

    /// A pool member failed its health check on acquisition.
    fn member_unhealthy(&self, connection: u64);

    /// A reopen attempt brought an unhealthy member back.
    fn member_reopened(&self, connection: u64, attempt: u32);

    /// A reopen attempt failed.
    fn reopen_failed(&self, connection: u64, attempt: u32, error: &RfcError);

    /// A member was lent out.
    fn lease_granted(&self, connection: u64);

    /// A lent member came back.
    fn lease_released(&self, connection: u64);

    /// No member became free before the acquisition deadline.
    fn acquire_timed_out(&self, waited: Duration);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn member_opened(&self, connection: u64) {
        (**self).member_opened(connection);
    }

    fn member_open_failed(&self, connection: u64, error: &RfcError) {
        (**self).member_open_failed(connection, error);
    }

    fn member_unhealthy(&self, connection: u64) {
        (**self).member_unhealthy(connection);
    }

    fn member_reopened(&self, connection: u64, attempt: u32) {
        (**self).member_reopened(connection, attempt);
    }

    fn reopen_failed(&self, connection: u64, attempt: u32, error: &RfcError) {
        (**self).reopen_failed(connection, attempt, error);
    }

    fn lease_granted(&self, connection: u64) {
        (**self).lease_granted(connection);
    }

    fn lease_released(&self, connection: u64) {
        (**self).lease_released(connection);
    }

    fn acquire_timed_out(&self, waited: Duration) {
        (**self).acquire_timed_out(waited);
    }
}

/// Default reporter that records pool events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn member_opened(&self, connection: u64) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "member_opened",
            connection,
            "pool member opened"
        );
    }

    fn member_open_failed(&self, connection: u64, error: &RfcError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "member_open_failed",
            connection,
            error = %error,
            "pool member failed to open"
        );
    }

    fn member_unhealthy(&self, connection: u64) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "member_unhealthy",
            connection,
            "pool member failed its health check"
        );
    }

    fn member_reopened(&self, connection: u64, attempt: u32) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "member_reopened",
            connection,
            attempt,
            "pool member reopened"
        );
    }

    fn reopen_failed(&self, connection: u64, attempt: u32, error: &RfcError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "reopen_failed",
            connection,
            attempt,
            error = %error,
            "pool member reopen attempt failed"
        );
    }

    fn lease_granted(&self, connection: u64) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "lease_granted",
            connection,
            "pool member leased"
        );
    }

    fn lease_released(&self, connection: u64) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "lease_released",
            connection,
            "pool member returned"
        );
    }

    fn acquire_timed_out(&self, waited: Duration) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "acquire_timed_out",
            waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            "no pool member became available"
        );
    }
}
