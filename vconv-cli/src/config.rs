// vconv-cli/src/config.rs
//
// CLI-level defaults: output naming and process exit codes.

use std::path::{Path, PathBuf};
use vconv_core::{Container, JobState};

/// Suffix appended to the file stem when the default output path would
/// overwrite the input.
pub const CONVERTED_SUFFIX: &str = "_converted";

/// Exit code for a job that ran and failed.
pub const EXIT_JOB_FAILED: u8 = 2;

/// Exit code for a cancelled job, as for a process ended by SIGINT.
pub const EXIT_JOB_CANCELLED: u8 = 130;

/// Output path used when none is given: the input path with the container's
/// extension, or `<stem>_converted.<ext>` if that is the input itself.
#[must_use]
pub fn default_output_path(input: &Path, container: Container) -> PathBuf {
    let same_extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(container.extension()));
    if !same_extension {
        return input.with_extension(container.extension());
    }

    let stem = input
        .file_stem()
        .map_or_else(|| "output".into(), |s| s.to_string_lossy());
    input.with_file_name(format!(
        "{stem}{CONVERTED_SUFFIX}.{}",
        container.extension()
    ))
}

/// Process exit code for a job's final state.
#[must_use]
pub fn exit_code_for(state: JobState) -> u8 {
    match state {
        JobState::Completed => 0,
        JobState::Cancelled => EXIT_JOB_CANCELLED,
        JobState::Failed | JobState::Idle | JobState::Running => EXIT_JOB_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/videos/clip.avi"), Container::Mp4),
            PathBuf::from("/videos/clip.mp4")
        );
        assert_eq!(
            default_output_path(Path::new("/videos/clip.mp4"), Container::Mp4),
            PathBuf::from("/videos/clip_converted.mp4")
        );
        assert_eq!(
            default_output_path(Path::new("CLIP.MP4"), Container::Mp4),
            PathBuf::from("CLIP_converted.mp4")
        );
        assert_eq!(
            default_output_path(Path::new("clip.mp4"), Container::Mkv),
            PathBuf::from("clip.mkv")
        );
        assert_eq!(
            default_output_path(Path::new("noext"), Container::Mov),
            PathBuf::from("noext.mov")
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(JobState::Completed), 0);
        assert_eq!(exit_code_for(JobState::Failed), EXIT_JOB_FAILED);
        assert_eq!(exit_code_for(JobState::Cancelled), EXIT_JOB_CANCELLED);
    }
}
