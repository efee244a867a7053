use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber filtered at `level`.
///
/// `RUST_LOG` takes precedence when set. Calling this twice is harmless; the
/// second install attempt is ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
