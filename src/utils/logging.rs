// Logging setup

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, wins over `--debug`
pub const LOG_ENV: &str = "SCAFFOLD_LOG";

/// Install the stderr subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

const fn default_directive(debug: bool) -> &'static str {
    if debug {
        "scaffold=debug"
    } else {
        "scaffold=info"
    }
}
