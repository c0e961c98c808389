use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging to stderr.
///
/// Use `RUST_LOG` to override the default filter, e.g.
/// `RUST_LOG=compiler=debug,vm=trace`. Default is `warn`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
