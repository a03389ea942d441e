//! Diagnostic logging setup.

use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count. Zero defers to `RUST_LOG`.
pub fn level_for(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Installs the stderr fmt subscriber.
///
/// Without `-v` the filter comes from `RUST_LOG`, falling back to `warn`.
pub fn init(verbose: u8) {
    let filter = match level_for(verbose) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    // No-op when a global subscriber is already set.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .try_init();
}
