//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Runs one supervised conversion job.
pub mod convert;
/// Lists the hardware encoders the encoder binary reports.
pub mod probe;
/// Kills stray encoder processes.
pub mod reap;
