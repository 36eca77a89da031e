use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies (e.g. `"info"`).
/// Logs go to stderr so command output on stdout stays clean. Calling this
/// twice is harmless: the second install is ignored.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
