// ============================================================================
// vconv-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: env_logger Initialization
//
// The CLI uses the standard `log` facade with `env_logger` as the backend:
// - default level: info
// - --verbose: debug, which includes every raw encoder line (target
//   `vconv::encoder`)
// - RUST_LOG overrides both, e.g. RUST_LOG=vconv_core=trace

use log::LevelFilter;

/// Initializes the global logger. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(verbose)
        .parse_default_env()
        .try_init();
}
