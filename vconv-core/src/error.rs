// ============================================================================
// vconv-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types for the Supervisor Library
//
// Errors that affect a single line of encoder output are absorbed and logged
// by the reader; errors that affect the process lifecycle are surfaced here.
// A non-zero encoder exit is not an error: it is reported as the `Failed`
// terminal state of the job.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Custom error types for vconv-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Encoder binary not found: {0}")]
    EncoderNotFound(String),

    #[error("Failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("A job is already running")]
    AlreadyRunning,

    #[error("Failed to read encoder output: {0}")]
    StreamRead(#[source] io::Error),

    #[error("Failed to terminate encoder process {pid}: {message}")]
    TerminationFailed { pid: u32, message: String },

    #[error("Capability probe unavailable for '{binary}': {message}")]
    ProbeUnavailable { binary: String, message: String },

    #[error("Invalid job parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    OperationFailed(String),
}

/// Result type for vconv-core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Maps a spawn failure onto the taxonomy: a missing binary is
/// `EncoderNotFound`, anything else is `SpawnFailed`.
pub(crate) fn command_start_error(program: &str, source: io::Error) -> CoreError {
    if source.kind() == io::ErrorKind::NotFound {
        CoreError::EncoderNotFound(program.to_string())
    } else {
        CoreError::SpawnFailed {
            program: program.to_string(),
            source,
        }
    }
}

pub(crate) fn probe_unavailable_error(binary: &Path, message: impl Into<String>) -> CoreError {
    CoreError::ProbeUnavailable {
        binary: binary.display().to_string(),
        message: message.into(),
    }
}

pub(crate) fn termination_failed_error(pid: u32, source: &io::Error) -> CoreError {
    CoreError::TerminationFailed {
        pid,
        message: source.to_string(),
    }
}
