// ============================================================================
// vconv-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Progress bar driven by supervisor events
//
// `ProgressReporter` is registered as an event handler on the supervisor. It
// renders progress samples with indicatif and keeps the last few raw encoder
// lines so they can be shown when a job fails.

use indicatif::{ProgressBar, ProgressStyle};
use vconv_core::{
    EventHandler, JobState, SupervisorEvent, eta_seconds, format_duration, progress_percent,
};

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Number of encoder output lines kept for failure reports.
pub const RECENT_LINES: usize = 10;

// ETA comes from the encode speed rather than indicatif's rate estimate
const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {percent}% {msg}";

pub struct ProgressReporter {
    bar: ProgressBar,
    recent: Mutex<VecDeque<String>>,
}

impl ProgressReporter {
    /// Creates a reporter. With `hidden` the bar is never drawn, which keeps
    /// verbose log output readable; recent lines are still collected.
    pub fn new(hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(100);
            let style = ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░ ");
            bar.set_style(style);
            bar.set_message("Starting");
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };

        Self {
            bar,
            recent: Mutex::new(VecDeque::with_capacity(RECENT_LINES)),
        }
    }

    /// The most recent encoder output lines, oldest first.
    pub fn recent_lines(&self) -> Vec<String> {
        self.recent
            .lock()
            .map(|recent| recent.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn remember(&self, line: &str) {
        if let Ok(mut recent) = self.recent.lock() {
            if recent.len() == RECENT_LINES {
                recent.pop_front();
            }
            recent.push_back(line.to_string());
        }
    }
}

impl EventHandler for ProgressReporter {
    fn handle(&self, event: &SupervisorEvent) {
        match event {
            SupervisorEvent::Log { line, .. } => self.remember(line),
            SupervisorEvent::Progress {
                current_secs,
                total_secs,
                speed,
                ..
            } => {
                let position = match total_secs {
                    Some(total) => format!(
                        "{} / {}",
                        format_duration(*current_secs),
                        format_duration(*total)
                    ),
                    None => format_duration(*current_secs),
                };
                let message = match eta_seconds(*current_secs, *total_secs, *speed) {
                    Some(eta) => format!("{position} at {speed:.2}x, ETA {}", format_duration(eta)),
                    None => format!("{position} at {speed:.2}x"),
                };
                self.bar.set_message(message);
                if let Some(percent) = progress_percent(*current_secs, *total_secs) {
                    self.bar.set_position(percent.round() as u64);
                }
            }
            SupervisorEvent::Terminal { state, .. } => {
                if *state == JobState::Completed {
                    self.bar.set_position(100);
                    self.bar.finish_with_message("Done");
                } else {
                    self.bar.abandon_with_message(state.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vconv_core::JobId;

    #[test]
    fn test_keeps_only_recent_lines() {
        let reporter = ProgressReporter::new(true);
        let job_id = JobId::new();
        for n in 0..25 {
            reporter.handle(&SupervisorEvent::Log {
                job_id,
                line: format!("line {n}"),
            });
        }

        let lines = reporter.recent_lines();
        assert_eq!(lines.len(), RECENT_LINES);
        assert_eq!(lines.first().map(String::as_str), Some("line 15"));
        assert_eq!(lines.last().map(String::as_str), Some("line 24"));
    }

    #[test]
    fn test_progress_moves_bar() {
        let reporter = ProgressReporter::new(true);
        let job_id = JobId::new();
        reporter.handle(&SupervisorEvent::Progress {
            job_id,
            current_secs: 30.0,
            total_secs: Some(120.0),
            speed: 1.5,
        });
        assert_eq!(reporter.bar.position(), 25);

        reporter.handle(&SupervisorEvent::Terminal {
            job_id,
            state: JobState::Completed,
            exit_code: Some(0),
        });
        assert_eq!(reporter.bar.position(), 100);
        assert!(reporter.bar.is_finished());
    }
}
