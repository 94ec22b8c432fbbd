//! Tracing setup shared by the plugin binaries.

use std::io;

use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber. The `--debug` flag lowers the default
/// filter to `debug`; an explicit `RUST_LOG` wins either way.
pub fn init(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
