//! Subscriber installation.
//!
//! Filtering follows `RUST_LOG` when it is set and parses; otherwise the
//! caller-provided default directive applies.

use tracing_subscriber::EnvFilter;

fn filter_or(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// JSON logs + timestamps, configurable via `RUST_LOG`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_json(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_or(default_directive))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Compact, captured-by-libtest output for unit and integration tests.
pub fn init_test(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_or(default_directive))
        .compact()
        .with_test_writer()
        .try_init()
        .is_ok()
}
