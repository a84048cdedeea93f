//! Logging setup
//!
//! Logs go to stderr so stdout stays clean for piping. `RUST_LOG` wins over
//! the `--verbose`/`--quiet` flags.

use tracing_subscriber::EnvFilter;

use crate::cli::GlobalOpts;

/// Default filter directive for the given flags
pub fn default_directive(global: &GlobalOpts) -> &'static str {
    if global.verbose {
        "bomx=debug,info"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    }
}

/// Install the global tracing subscriber
pub fn init(global: &GlobalOpts) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(global)));

    // A second init (e.g. in tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(global.verbose)
        .try_init();
}
