//! Log output setup

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber filtered by `RUST_LOG`
///
/// Without `RUST_LOG` the level is INFO, or DEBUG with `--debug`.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "debug" } else { "info" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
