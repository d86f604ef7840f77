// vconv-cli/src/lib.rs
//
// Library portion of the vconv CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, ConvertArgs, EncoderArgs, ProbeArgs, ReapArgs};
pub use commands::convert::run_convert;
pub use commands::probe::run_probe;
pub use commands::reap::run_reap;
pub use config::exit_code_for;
