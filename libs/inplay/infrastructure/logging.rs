//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize tracing at `info`, honouring RUST_LOG when set
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Initialize tracing at the given level, honouring RUST_LOG when set
pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .try_init();
}
