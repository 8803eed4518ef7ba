//! Diagnostic logger on stderr.

use log::{LevelFilter, debug};

/// Install the global logger. `verbose` lowers the default level to debug;
/// `RUST_LOG` still overrides either default.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .format_target(false)
        .target(env_logger::Target::Stderr)
        .try_init();

    route_panics_to_log();
}

/// Send panic messages through the logger at debug level instead of the
/// default hook. Decoder panics are caught and reported as errors, so the raw
/// message would only duplicate that report.
fn route_panics_to_log() {
    std::panic::set_hook(Box::new(|info| debug!("panic: {info}")));
}
