//! Job records and their lifecycle states.

use crate::command::EncodeCommand;
use crate::config::JobParams;
use crate::progress::EncoderEvent;
use crate::utils::progress_percent;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Opaque job handle, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job.
///
/// ```text
/// Idle --start--> Running --exit 0--> Completed
///                 Running --exit != 0--> Failed
///                 Running --cancel--> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-known progress of a job.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ProgressSnapshot {
    /// Set at most once, from the first duration announcement.
    pub total_duration_secs: Option<f64>,
    /// Non-decreasing and never negative.
    pub current_time_secs: f64,
    pub speed: f64,
}

impl ProgressSnapshot {
    /// Folds one parsed event into the snapshot.
    pub fn apply(&mut self, event: &EncoderEvent) {
        match *event {
            EncoderEvent::DurationKnown { total_secs } => {
                if self.total_duration_secs.is_none() {
                    self.total_duration_secs = Some(total_secs);
                }
            }
            EncoderEvent::Progress { current_secs, speed } => {
                if current_secs.is_finite() {
                    self.current_time_secs = self.current_time_secs.max(current_secs.max(0.0));
                }
                self.speed = speed;
            }
        }
    }

    /// Completion percentage, when the total duration is known.
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        progress_percent(self.current_time_secs, self.total_duration_secs)
    }
}

/// Point-in-time copy of a job record.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub id: JobId,
    /// OS process id of the encoder.
    pub pid: u32,
    pub params: JobParams,
    pub command: EncodeCommand,
    pub state: JobState,
    /// Set once the process exits on its own; never set for cancelled jobs.
    pub exit_code: Option<i32>,
    pub progress: ProgressSnapshot,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl JobSnapshot {
    pub(crate) fn new(id: JobId, pid: u32, params: JobParams, command: EncodeCommand) -> Self {
        Self {
            id,
            pid,
            params,
            command,
            state: JobState::Running,
            exit_code: None,
            progress: ProgressSnapshot::default(),
            started_at: Local::now(),
            finished_at: None,
        }
    }

    /// Moves the job to a terminal state. Only the first call has any effect.
    pub(crate) fn finish(&mut self, state: JobState, exit_code: Option<i32>) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        self.exit_code = if state == JobState::Cancelled { None } else { exit_code };
        self.finished_at = Some(Local::now());
    }

    /// Wall-clock time from start to finish, or to now while running.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Local::now) - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::build_encode_command;
    use std::path::Path;

    fn job() -> JobSnapshot {
        let params = JobParams::new("in.mkv", "out.mp4").with_gpu(false);
        let command = build_encode_command(Path::new("ffmpeg"), &params, None);
        JobSnapshot::new(JobId::new(), 4242, params, command)
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Idle.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert_eq!(serde_json::to_string(&JobState::Cancelled).unwrap(), "\"cancelled\"");
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut progress = ProgressSnapshot::default();
        progress.apply(&EncoderEvent::DurationKnown { total_secs: 120.0 });
        progress.apply(&EncoderEvent::Progress { current_secs: 60.0, speed: 1.0 });
        progress.apply(&EncoderEvent::Progress { current_secs: 30.0, speed: 0.5 });
        assert_eq!(progress.current_time_secs, 60.0);
        assert_eq!(progress.speed, 0.5);
        assert_eq!(progress.percent(), Some(50.0));

        // Later announcements never replace the total
        progress.apply(&EncoderEvent::DurationKnown { total_secs: 10.0 });
        assert_eq!(progress.total_duration_secs, Some(120.0));

        progress.apply(&EncoderEvent::Progress { current_secs: 120.0, speed: 1.0 });
        assert_eq!(progress.percent(), Some(100.0));
    }

    #[test]
    fn test_progress_without_total() {
        let mut progress = ProgressSnapshot::default();
        progress.apply(&EncoderEvent::Progress { current_secs: 5.0, speed: 2.0 });
        assert_eq!(progress.percent(), None);
        assert_eq!(progress.current_time_secs, 5.0);
    }

    #[test]
    fn test_finish_is_set_once() {
        let mut job = job();
        assert_eq!(job.state, JobState::Running);
        assert!(job.finished_at.is_none());

        job.finish(JobState::Failed, Some(1));
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.exit_code, Some(1));
        assert!(job.finished_at.is_some());

        job.finish(JobState::Completed, Some(0));
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.exit_code, Some(1));
    }

    #[test]
    fn test_cancelled_discards_exit_code() {
        let mut job = job();
        job.finish(JobState::Cancelled, Some(255));
        assert_eq!(job.state, JobState::Cancelled);
        assert_eq!(job.exit_code, None);
    }
}
