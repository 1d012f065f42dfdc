//! Tracing subscriber setup shared by binaries and integration tests.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Filter comes from `REFGRAPH_LOG` (falling back to `RUST_LOG`, then `info`).
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = std::env::var("REFGRAPH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(true)
        .try_init();
}
