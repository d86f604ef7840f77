//! JSON event handler for structured output
//!
//! Writes one JSON object per line for every supervisor event, for
//! consumption by tools that drive vconv as a subprocess.

use super::{EventHandler, SupervisorEvent};

use parking_lot::Mutex;
use serde_json::Value;

use std::io::{self, Write};

/// Event handler that outputs events as JSON lines to stdout
pub struct JsonEventHandler {
    output: Mutex<Box<dyn Write + Send>>,
    include_logs: bool,
}

impl JsonEventHandler {
    /// Create a new JSON event handler that writes to stdout
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Create a new JSON event handler with a custom writer
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(writer),
            include_logs: true,
        }
    }

    /// Whether raw encoder lines are written too (default: yes)
    #[must_use]
    pub fn with_logs(mut self, include_logs: bool) -> Self {
        self.include_logs = include_logs;
        self
    }

    fn write_json(&self, value: &Value) {
        if let Ok(json_str) = serde_json::to_string(value) {
            let mut output = self.output.lock();
            let _ = writeln!(output, "{json_str}");
            let _ = output.flush();
        }
    }
}

impl EventHandler for JsonEventHandler {
    fn handle(&self, event: &SupervisorEvent) {
        if !self.include_logs && matches!(event, SupervisorEvent::Log { .. }) {
            return;
        }

        let Ok(mut value) = serde_json::to_value(event) else {
            return;
        };
        if let Value::Object(map) = &mut value {
            if let SupervisorEvent::Progress {
                current_secs,
                total_secs,
                ..
            } = event
            {
                map.insert(
                    "percent".to_string(),
                    crate::utils::progress_percent(*current_secs, *total_secs).into(),
                );
            }
            map.insert(
                "timestamp".to_string(),
                chrono::Utc::now().timestamp().into(),
            );
        }
        self.write_json(&value);
    }
}

impl Default for JsonEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobId, JobState};
    use std::sync::Arc;

    struct MockWriter {
        content: Arc<Mutex<Vec<u8>>>,
    }

    impl MockWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let content = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    content: content.clone(),
                },
                content,
            )
        }
    }

    impl Write for MockWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.content.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn lines(content: &Arc<Mutex<Vec<u8>>>) -> Vec<Value> {
        String::from_utf8(content.lock().clone())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_progress_json() {
        let (writer, content) = MockWriter::new();
        let handler = JsonEventHandler::with_writer(Box::new(writer));
        let job_id = JobId::new();

        handler.handle(&SupervisorEvent::Progress {
            job_id,
            current_secs: 30.0,
            total_secs: Some(120.0),
            speed: 1.5,
        });

        let parsed = &lines(&content)[0];
        assert_eq!(parsed["type"], "progress");
        assert_eq!(parsed["job_id"], job_id.to_string());
        assert_eq!(parsed["percent"], 25.0);
        assert_eq!(parsed["speed"], 1.5);
        assert!(parsed["timestamp"].is_i64());
    }

    #[test]
    fn test_terminal_json() {
        let (writer, content) = MockWriter::new();
        let handler = JsonEventHandler::with_writer(Box::new(writer));

        handler.handle(&SupervisorEvent::Terminal {
            job_id: JobId::new(),
            state: JobState::Failed,
            exit_code: Some(1),
        });

        let parsed = &lines(&content)[0];
        assert_eq!(parsed["type"], "terminal");
        assert_eq!(parsed["state"], "failed");
        assert_eq!(parsed["exit_code"], 1);
    }

    #[test]
    fn test_logs_can_be_suppressed() {
        let (writer, content) = MockWriter::new();
        let handler = JsonEventHandler::with_writer(Box::new(writer)).with_logs(false);
        let job_id = JobId::new();

        handler.handle(&SupervisorEvent::Log {
            job_id,
            line: "Stream mapping:".to_string(),
        });
        handler.handle(&SupervisorEvent::Terminal {
            job_id,
            state: JobState::Completed,
            exit_code: Some(0),
        });

        let parsed = lines(&content);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["type"], "terminal");
    }
}
