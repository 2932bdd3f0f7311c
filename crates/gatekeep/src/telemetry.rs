//! Log output for hosts that do not install their own subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::GatekeepError;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `info`.
///
/// # Errors
/// [`GatekeepError::Telemetry`] if a global subscriber is already set.
pub fn init() -> Result<(), GatekeepError> {
    init_with_default("info")
}

/// Like [`init`], with a custom fallback directive such as
/// `"gatekeep=debug"`.
///
/// # Errors
/// [`GatekeepError::Telemetry`] if the directive does not parse or a
/// global subscriber is already set.
pub fn init_with_default(directive: &str) -> Result<(), GatekeepError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive)
            .map_err(|e| GatekeepError::Telemetry(e.to_string()))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| GatekeepError::Telemetry(e.to_string()))
}
