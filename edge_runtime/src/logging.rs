use crate::config::RuntimeConfig;
use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber unless the host program already set one.
pub fn init(config: &RuntimeConfig) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
