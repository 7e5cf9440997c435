//! Tracing bootstrap for binaries and tests.
//!
//! The library itself only emits `tracing` events; it never installs a
//! subscriber on its own. Callers own the subscriber lifecycle and can call
//! [`init`] once at startup, or install their own.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber reading the filter from `RUST_LOG`
/// (default `info`). Safe to call more than once: later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
