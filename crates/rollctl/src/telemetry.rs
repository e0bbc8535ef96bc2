//! Console logging for `rollctl`.

use tracing_subscriber::EnvFilter;

/// Crates whose per-request chatter is quietened unless `RUST_LOG` asks
/// for it.
const QUIET: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"];

/// Filter directive for `level` with the HTTP stack held at `warn`.
pub fn directive(level: &str) -> String {
    let mut directive = level.to_string();
    for quiet in QUIET {
        directive.push(',');
        directive.push_str(quiet);
    }
    directive
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
