//! Logging setup for the proxy process.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize the logging subscriber.
///
/// Default to "info" level only - "debug" adds overhead in hot paths.
/// Use RUST_LOG=debug for development/debugging.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
