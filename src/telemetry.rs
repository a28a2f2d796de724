//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// `default_directive` (e.g. `"info,datamap=debug"`) applies when `RUST_LOG`
/// is unset or invalid. Calling this twice is harmless: the second call
/// leaves the first subscriber in place.
pub fn init_tracing(default_directive: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .try_init();
}
