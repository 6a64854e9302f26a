//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info,swapframe=debug,swapframe_renderer=debug";

/// Initialize the tracing subscriber.
///
/// Filtering follows `RUST_LOG` when present, [`DEFAULT_FILTER`] otherwise.
/// Calling this twice is harmless: the second registration is ignored.
///
/// # Example
/// ```
/// swapframe_core::init_logging();
/// tracing::info!("renderer starting");
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}
