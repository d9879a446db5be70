use std::env;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn filter_directive() -> String {
    for var in ["TIERSYNC_LOG", "RUST_LOG"] {
        if let Ok(v) = env::var(var) {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    DEFAULT_FILTER.to_string()
}

/// Install the stderr subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_new(filter_directive())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let plain = env::var_os("TIERSYNC_LOG_PLAIN").is_some();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!plain)
        .with_target(false)
        .try_init();
}
