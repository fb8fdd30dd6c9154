//! Logging setup for the hostvar CLI.
//!
//! Logs go to stderr so command output on stdout stays pipeable.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are shown by default.
const TARGETS: [&str; 4] = [
    "hostvar",
    "hostvar_domain",
    "hostvar_application",
    "hostvar_infrastructure",
];

/// Builds the default filter directive for a verbosity level.
fn default_directive(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initializes the global subscriber.
///
/// `RUST_LOG` takes precedence over `verbose`.
pub fn init(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_file(false)
        .with_line_number(false)
        .compact();

    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init();
}
