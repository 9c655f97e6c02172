//! Structured telemetry initialisation for embedding applications.
//!
//! The client only emits `tracing` events. An application that already runs
//! its own subscriber keeps it and receives those events there; one without a
//! subscriber can have the client install a default.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use rfc_config::{LogFormat, LogSettings};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static SUBSCRIBER_OWNER: OnceCell<SubscriberOwner> = OnceCell::new();

/// Who installed the global subscriber that receives client events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberOwner {
    /// [`initialise`] installed the client's own subscriber.
    Client,
    /// The embedding application had already installed one.
    Application,
}

/// Handle returned once client events have a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    owner: SubscriberOwner,
}

impl TelemetryHandle {
    /// Who owns the active global subscriber.
    #[must_use]
    pub const fn owner(self) -> SubscriberOwner {
        self.owner
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
}

/// Makes sure client events reach a global subscriber.
///
/// The first successful call decides the outcome and later calls repeat it.
/// When the application installed a subscriber beforehand, that one is left in
/// place and the handle reports [`SubscriberOwner::Application`].
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter.
pub fn initialise(settings: &LogSettings) -> Result<TelemetryHandle, TelemetryError> {
    SUBSCRIBER_OWNER
        .get_or_try_init(|| install_subscriber(settings))
        .map(|owner| TelemetryHandle { owner: *owner })
}

fn install_subscriber(settings: &LogSettings) -> Result<SubscriberOwner, TelemetryError> {
    let filter = EnvFilter::try_new(settings.filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    if tracing::dispatcher::has_been_set() {
        return Ok(SubscriberOwner::Application);
    }

    let builder = |env_filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    // Another thread may install one between the check above and this call.
    Ok(tracing::subscriber::set_global_default(subscriber)
        .map_or(SubscriberOwner::Application, |()| SubscriberOwner::Client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filters_are_reported() {
        let settings = LogSettings::new("rfc_client=notalevel", LogFormat::Compact);
        let error = install_subscriber(&settings).expect_err("filter should be rejected");
        assert!(matches!(error, TelemetryError::Filter(_)));
    }

    #[test]
    fn application_subscribers_are_left_in_place() {
        let application = tracing_subscriber::fmt().with_test_writer().finish();
        let installed = tracing::subscriber::set_global_default(application).is_ok();
        assert!(installed || tracing::dispatcher::has_been_set());

        let settings = LogSettings::new("rfc_client=debug", LogFormat::Json);
        let first = initialise(&settings).expect("initialise");
        let second = initialise(&settings).expect("initialise again");

        assert_eq!(first.owner(), SubscriberOwner::Application);
        assert_eq!(second, first);
    }
}
