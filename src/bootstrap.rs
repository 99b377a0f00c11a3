//! Process bootstrap for the `orderwallet` binary.

use crate::config::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing from the ORDERWALLET_LOG environment variable.
///
/// Defaults to "warn". Logs go to stderr so stdout stays a clean CSV report.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
