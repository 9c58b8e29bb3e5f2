//! Logging initialization and configuration.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter applied when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info,gsync=debug";

/// Initialize the logging system with tracing.
///
/// Equivalent to [`init_logging_with`] using [`DEFAULT_FILTER`].
///
/// # Example
/// ```
/// gsync_core::init_logging();
/// tracing::info!("Test bench started");
/// ```
pub fn init_logging() {
    init_logging_with(DEFAULT_FILTER);
}

/// Initialize tracing with `RUST_LOG`, falling back to `default_filter`.
///
/// Calling this twice is harmless; the second subscriber is discarded.
pub fn init_logging_with(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}
