// ============================================================================
// vconv-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// Commands return `CoreError` so that the binary maps every failure the same
// way. Filesystem errors raised by the CLI itself are wrapped with the action
// and path that failed.

use vconv_core::{CoreError, CoreResult};

use std::io;
use std::path::Path;

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Extension trait naming the action and path of a failed filesystem call.
pub trait PathErrorContext<T> {
    fn path_context(self, action: &str, path: &Path) -> CliResult<T>;
}

impl<T> PathErrorContext<T> for io::Result<T> {
    fn path_context(self, action: &str, path: &Path) -> CliResult<T> {
        self.map_err(|e| {
            CoreError::OperationFailed(format!("Failed to {action} '{}': {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_context_names_action_and_path() {
        let result: io::Result<()> = Err(io::Error::from(io::ErrorKind::PermissionDenied));
        let err = result
            .path_context("create output directory", Path::new("/videos/out"))
            .unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed(_)));
        assert!(
            err.to_string()
                .starts_with("Failed to create output directory '/videos/out': ")
        );

        let ok: io::Result<u8> = Ok(7);
        assert_eq!(ok.path_context("read", Path::new("x")).unwrap(), 7);
    }
}
