//! Supervisor events and their delivery.
//!
//! Every job produces a stream of `Log` and `Progress` events followed by
//! exactly one `Terminal` event. Events are emitted from the job's reader
//! thread in production order and fanned out to the registered handlers.

use crate::job::{JobId, JobState};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, trace};
use parking_lot::RwLock;
use serde::Serialize;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod json_handler;

pub use json_handler::JsonEventHandler;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupervisorEvent {
    /// One raw line of encoder output.
    Log { job_id: JobId, line: String },

    /// A progress sample. `current_secs` never decreases within a job.
    Progress {
        job_id: JobId,
        current_secs: f64,
        total_secs: Option<f64>,
        speed: f64,
    },

    /// The job reached a terminal state. Always the last event of a job.
    Terminal {
        job_id: JobId,
        state: JobState,
        exit_code: Option<i32>,
    },
}

impl SupervisorEvent {
    #[must_use]
    pub fn job_id(&self) -> JobId {
        match self {
            SupervisorEvent::Log { job_id, .. }
            | SupervisorEvent::Progress { job_id, .. }
            | SupervisorEvent::Terminal { job_id, .. } => *job_id,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SupervisorEvent::Terminal { .. })
    }
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &SupervisorEvent);

    /// A closed handler wants no further events and is dropped by the
    /// dispatcher after the next emit.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Fans events out to every registered handler, in registration order.
pub struct EventDispatcher {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().push(handler);
    }

    pub fn emit(&self, event: SupervisorEvent) {
        // Handlers run without the lock so they may register others
        let handlers = self.handlers.read().clone();
        let mut any_closed = false;
        for handler in &handlers {
            handler.handle(&event);
            any_closed |= handler.is_closed();
        }
        if any_closed {
            self.handlers.write().retain(|handler| !handler.is_closed());
        }
    }

    /// Registers a channel handler and returns its receiving end.
    pub fn subscribe(&self) -> Receiver<SupervisorEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.add_handler(Arc::new(ChannelEventHandler::new(tx)));
        rx
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards events into a channel. Closes once the receiver is gone.
pub struct ChannelEventHandler {
    sender: Sender<SupervisorEvent>,
    disconnected: AtomicBool,
}

impl ChannelEventHandler {
    pub fn new(sender: Sender<SupervisorEvent>) -> Self {
        Self {
            sender,
            disconnected: AtomicBool::new(false),
        }
    }
}

impl EventHandler for ChannelEventHandler {
    fn handle(&self, event: &SupervisorEvent) {
        if self.sender.send(event.clone()).is_err() {
            self.disconnected.store(true, Ordering::Relaxed);
        }
    }

    fn is_closed(&self) -> bool {
        self.disconnected.load(Ordering::Relaxed)
    }
}

/// Writes events to the `log` facade. Raw encoder lines go to the
/// `vconv::encoder` target at debug level.
#[derive(Debug, Default)]
pub struct LogEventHandler;

impl EventHandler for LogEventHandler {
    fn handle(&self, event: &SupervisorEvent) {
        match event {
            SupervisorEvent::Log { line, .. } => {
                debug!(target: "vconv::encoder", "{line}");
            }
            SupervisorEvent::Progress {
                job_id,
                current_secs,
                total_secs,
                speed,
            } => {
                trace!(
                    "Job {job_id}: {current_secs:.2}s of {} at {speed}x",
                    total_secs.map_or_else(|| "?".to_string(), |t| format!("{t:.2}s"))
                );
            }
            SupervisorEvent::Terminal {
                job_id,
                state,
                exit_code,
            } => match exit_code {
                Some(code) => info!("Job {job_id} {state} (exit code {code})"),
                None => info!("Job {job_id} {state}"),
            },
        }
    }
}
