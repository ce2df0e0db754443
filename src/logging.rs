//! Logging setup
//!
//! Uses `tracing` with `tracing-subscriber`. `RUST_LOG` overrides the level
//! chosen from the command line flags, e.g. `RUST_LOG=guesttracker=trace`.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging to stderr
///
/// `verbosity`: 0 = warn, 1 = info, 2+ = debug. `quiet` forces errors only.
pub fn init(verbosity: u8, quiet: bool) {
    let level = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .with_line_number(verbosity > 1)
        .try_init();
}

/// Logging for tests, captured by the test harness
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
