//! Tracing/logging initialization.
//!
//! JSON lines on stdout, filtered via `RUST_LOG`. Integrity faults and
//! authentication rejections are emitted as structured events by the crates
//! that detect them; nothing here interprets them.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops), which keeps it
/// usable from both `main` and per-test setup.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
