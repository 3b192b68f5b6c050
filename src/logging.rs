//! Log subscriber setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity level.
///
/// `quiet` wins over `verbose`. Logs from dependencies stay at `warn`.
pub fn default_directive(verbose: u8, quiet: bool) -> String {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    format!("warn,pullscope={level}")
}

/// Install the global stderr subscriber. `RUST_LOG` overrides the default.
pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    // A second call (as in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
