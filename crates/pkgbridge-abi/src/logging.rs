use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `pkgbridge_abi=debug`.
pub const LOG_ENV: &str = "PKGBRIDGE_LOG";

/// Install a stderr subscriber filtered by [`LOG_ENV`]. Returns false when a
/// global subscriber is already set, which leaves that one in place.
pub fn install_subscriber(default_level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
