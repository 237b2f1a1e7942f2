use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "lmsctl=info";

/// Installs the fmt subscriber on stderr so stdout stays clean for reports.
/// `RUST_LOG` overrides the default filter.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
