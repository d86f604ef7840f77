// ============================================================================
// vconv-core/src/supervisor.rs
// ============================================================================
//
// JOB SUPERVISOR: Lifecycle of the External Encoder Process
//
// The supervisor owns at most one running encoder process. Starting a job
// spawns the encoder with stdout and stderr merged into one pipe and hands
// the read end to a dedicated reader thread. The reader turns output into
// events and, once the stream closes, records how the process ended.
//
// STATE:
// All mutable job state lives in one `SupervisorState` behind one mutex. The
// lock is never held across blocking I/O or while events are delivered.
//
// TERMINATION:
// `cancel` marks the job cancel-requested under the lock before signalling
// the process. Whichever side observes the exit afterwards (reader or
// canceller) finalizes the job as `Cancelled`, so a cancel racing a natural
// exit always resolves the same way. Only the reader emits the terminal
// event, after the last log and progress events.

use crate::capabilities::{EncoderCapabilities, probe_encoders};
use crate::command::{EncodeCommand, build_encode_command};
use crate::config::{JobParams, SupervisorConfig};
use crate::error::{CoreError, CoreResult, command_start_error, termination_failed_error};
use crate::events::{EventDispatcher, EventHandler, SupervisorEvent};
use crate::job::{JobId, JobSnapshot, JobState};
use crate::output::LineReader;
use crate::progress::{EncoderEvent, ProgressParser};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use parking_lot::Mutex;

use std::io::{self, PipeReader};
use std::path::PathBuf;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// How often exit status is polled while waiting for a process.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Consecutive read failures after which the output stream counts as closed.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 3;

// ============================================================================
// SHARED STATE
// ============================================================================

#[derive(Default)]
struct SupervisorState {
    active: Option<ActiveJob>,
    last: Option<JobSnapshot>,
    /// Completion signal of the last job's reader, kept until it disconnects.
    draining: Option<Receiver<()>>,
    /// A `start` call is between its checks and the spawn.
    starting: bool,
}

struct ActiveJob {
    job: JobSnapshot,
    child: Child,
    cancel_requested: bool,
    /// Disconnects once the reader has delivered the terminal event.
    done: Receiver<()>,
    /// Thread delivering this job's events, set when the reader starts.
    reader: Option<ThreadId>,
}

impl SupervisorState {
    fn active_job(&mut self, id: JobId) -> Option<&mut ActiveJob> {
        self.active.as_mut().filter(|active| active.job.id == id)
    }

    /// Finalizes the active job `id`, moving it to `last`. No-op if `id` is
    /// no longer the active job.
    fn finalize(&mut self, id: JobId, state: JobState, exit_code: Option<i32>) {
        if self.active_job(id).is_none() {
            return;
        }
        if let Some(mut active) = self.active.take() {
            active.job.finish(state, exit_code);
            self.last = Some(active.job);
            self.draining = Some(active.done);
        }
    }

    /// Completion signal of the current or last reader.
    fn reader_done(&self) -> Option<Receiver<()>> {
        self.active
            .as_ref()
            .map(|active| active.done.clone())
            .or_else(|| self.draining.clone())
    }

    /// Terminal state recorded for `id`, if it has finished.
    fn outcome(&self, id: JobId) -> Option<(JobState, Option<i32>)> {
        self.last
            .as_ref()
            .filter(|job| job.id == id)
            .map(|job| (job.state, job.exit_code))
    }
}

/// Clears the `starting` reservation when `start` returns, on every path.
struct StartReservation<'a> {
    state: &'a Mutex<SupervisorState>,
}

impl Drop for StartReservation<'_> {
    fn drop(&mut self) {
        self.state.lock().starting = false;
    }
}

// ============================================================================
// JOB SUPERVISOR
// ============================================================================

/// Supervises one external encoder process at a time.
///
/// The supervisor is `Send + Sync`; share it between threads with an `Arc`.
/// Dropping it cancels a running job.
pub struct JobSupervisor {
    config: SupervisorConfig,
    state: Arc<Mutex<SupervisorState>>,
    events: Arc<EventDispatcher>,
    capabilities: Mutex<Option<EncoderCapabilities>>,
}

impl JobSupervisor {
    /// # Errors
    ///
    /// Returns `CoreError::Config` if the configuration is invalid.
    pub fn new(config: SupervisorConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: Arc::new(Mutex::new(SupervisorState::default())),
            events: Arc::new(EventDispatcher::new()),
            capabilities: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Registers a handler for events of all subsequent jobs.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.events.add_handler(handler);
    }

    /// Returns a channel receiving every event from now on.
    pub fn subscribe(&self) -> Receiver<SupervisorEvent> {
        self.events.subscribe()
    }

    /// Hardware encoder capabilities, probed on first use and cached.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EncoderNotFound` if the encoder cannot be located,
    /// or `CoreError::ProbeUnavailable` if it cannot be run.
    pub fn capabilities(&self) -> CoreResult<EncoderCapabilities> {
        let mut cached = self.capabilities.lock();
        if let Some(capabilities) = cached.as_ref() {
            return Ok(capabilities.clone());
        }
        let program = self.locate_encoder()?;
        let capabilities = probe_encoders(&program, self.config.probe_timeout)?;
        *cached = Some(capabilities.clone());
        Ok(capabilities)
    }

    /// Starts a new job.
    ///
    /// # Errors
    ///
    /// - `CoreError::AlreadyRunning` while another job runs or starts
    /// - `CoreError::InvalidParams` for unusable parameters
    /// - `CoreError::EncoderNotFound` if the encoder cannot be located
    /// - `CoreError::ProbeUnavailable` if GPU encoding was requested and the
    ///   capability probe cannot run
    /// - `CoreError::SpawnFailed` if the process cannot be created
    pub fn start(&self, params: JobParams) -> CoreResult<JobId> {
        {
            let mut state = self.state.lock();
            if state.starting || state.active.is_some() {
                return Err(CoreError::AlreadyRunning);
            }
            state.starting = true;
        }
        let _reservation = StartReservation { state: &self.state };

        params.validate()?;
        let program = self.locate_encoder()?;
        let capabilities = if params.use_gpu {
            Some(self.capabilities()?)
        } else {
            None
        };
        let command = build_encode_command(&program, &params, capabilities.as_ref());
        if params.use_gpu && !command.uses_hardware() {
            info!(
                "No hardware {} encoder available; using software encoding",
                params.codec
            );
        }

        let (child, output) = spawn_encoder(&command)?;
        let id = JobId::new();
        let pid = child.id();
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);

        info!("Job {id} started (pid {pid}): {command}");
        self.state.lock().active = Some(ActiveJob {
            job: JobSnapshot::new(id, pid, params, command),
            child,
            cancel_requested: false,
            done: done_rx,
            reader: None,
        });

        let reader = JobReader {
            id,
            state: Arc::clone(&self.state),
            events: Arc::clone(&self.events),
            _done: done_tx,
        };
        let spawned = thread::Builder::new()
            .name(format!("vconv-reader-{pid}"))
            .spawn(move || reader.run(output));

        if let Err(e) = spawned {
            warn!("Failed to start output reader for job {id}: {e}");
            self.abandon_job(id);
            return Err(CoreError::Io(e));
        }

        Ok(id)
    }

    /// Cancels the running job, if any, and waits until its process is gone.
    ///
    /// Safe to call from any thread, any number of times, and while the job
    /// is exiting on its own. Without a running job this returns immediately.
    ///
    /// Called from an event handler, it returns once the process is gone; the
    /// terminal event follows after the handler returns.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::TerminationFailed` if the process could not be
    /// force-killed. The job is still marked `Cancelled` and the process is
    /// left to the orphan reaper.
    pub fn cancel(&self) -> CoreResult<()> {
        let (id, pid, done, on_reader) = {
            let mut state = self.state.lock();
            let Some(active) = state.active.as_mut() else {
                return Ok(());
            };
            let first_request = !active.cancel_requested;
            active.cancel_requested = true;
            let id = active.job.id;
            let pid = active.child.id();

            // Only signal a process we haven't reaped, so the pid can't be reused
            if matches!(active.child.try_wait(), Ok(None)) {
                if first_request {
                    info!("Cancelling job {id} (pid {pid})");
                }
                if let Err(e) = request_termination(pid) {
                    warn!("Graceful termination request for pid {pid} failed: {e}");
                }
            }
            let on_reader = active.reader == Some(thread::current().id());
            (id, pid, active.done.clone(), on_reader)
        };

        if !self.poll_exit(id, Some(self.config.grace_period)) {
            debug!("Job {id} still alive after grace period; killing pid {pid}");
            let mut state = self.state.lock();
            if let Some(active) = state.active_job(id) {
                if let Err(e) = active.child.kill() {
                    // The Child handle is dropped with the job: the process is detached
                    warn!("Failed to kill pid {pid}: {e}; detaching job {id}");
                    state.finalize(id, JobState::Cancelled, None);
                    return Err(termination_failed_error(pid, &e));
                }
            }
            drop(state);
            self.poll_exit(id, None);
        }

        self.state.lock().finalize(id, JobState::Cancelled, None);
        if on_reader {
            // The reader can't finish while it runs this handler
            return Ok(());
        }

        match done.recv_timeout(self.config.grace_period) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                warn!("Output reader of job {id} did not finish; detaching it");
            }
        }
        Ok(())
    }

    /// Blocks until the current job is finished or `timeout` elapses, and
    /// returns the state at that point.
    pub fn wait(&self, timeout: Duration) -> JobState {
        let done = self.state.lock().reader_done();
        if let Some(done) = done {
            let _ = done.recv_timeout(timeout);
        }
        self.state()
    }

    /// State of the running job, or of the last finished one.
    #[must_use]
    pub fn state(&self) -> JobState {
        let state = self.state.lock();
        match (&state.active, &state.last) {
            (Some(active), _) => active.job.state,
            (None, Some(last)) => last.state,
            (None, None) => JobState::Idle,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == JobState::Running
    }

    /// Snapshot of the running job, or of the last finished one.
    #[must_use]
    pub fn current_job(&self) -> Option<JobSnapshot> {
        let state = self.state.lock();
        state
            .active
            .as_ref()
            .map(|active| active.job.clone())
            .or_else(|| state.last.clone())
    }

    /// Tears down job `id` when its reader could not be started: kills the
    /// process, records the job as failed and emits its terminal event.
    fn abandon_job(&self, id: JobId) {
        {
            let mut state = self.state.lock();
            let Some(active) = state.active_job(id) else {
                return;
            };
            let pid = active.child.id();
            if let Err(e) = active.child.kill() {
                warn!("Failed to kill pid {pid} of job {id}: {e}");
            }
            match active.child.wait() {
                Ok(status) => debug!("Job {id} (pid {pid}) exited with {status}"),
                Err(e) => warn!("Failed to reap pid {pid} of job {id}: {e}"),
            }
            state.finalize(id, JobState::Failed, None);
        }
        info!("Job {id} {}", JobState::Failed);
        self.events.emit(SupervisorEvent::Terminal {
            job_id: id,
            state: JobState::Failed,
            exit_code: None,
        });
    }

    fn locate_encoder(&self) -> CoreResult<PathBuf> {
        which::which(&self.config.encoder)
            .map_err(|_| CoreError::EncoderNotFound(self.config.encoder.display().to_string()))
    }

    /// Polls until job `id`'s process has exited or `limit` elapses. Returns
    /// whether the process is known to be gone.
    fn poll_exit(&self, id: JobId, limit: Option<Duration>) -> bool {
        let started = Instant::now();
        loop {
            {
                let mut state = self.state.lock();
                let Some(active) = state.active_job(id) else {
                    // Finalized elsewhere, which only happens after exit
                    return true;
                };
                match active.child.try_wait() {
                    Ok(Some(_)) => return true,
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Failed to query exit status of job {id}: {e}");
                        return true;
                    }
                }
            }
            if limit.is_some_and(|limit| started.elapsed() >= limit) {
                return false;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for JobSupervisor {
    fn drop(&mut self) {
        if let Err(e) = self.cancel() {
            warn!("Failed to cancel running job on shutdown: {e}");
        }
    }
}

// ============================================================================
// OUTPUT READER
// ============================================================================

struct JobReader {
    id: JobId,
    state: Arc<Mutex<SupervisorState>>,
    events: Arc<EventDispatcher>,
    /// Dropped when the reader returns, signalling completion.
    _done: Sender<()>,
}

impl JobReader {
    fn run(self, output: PipeReader) {
        if let Some(active) = self.state.lock().active_job(self.id) {
            active.reader = Some(thread::current().id());
        }
        let mut lines = LineReader::new(output);
        let mut parser = ProgressParser::new();
        let mut failures = 0;

        loop {
            match lines.next_line() {
                Ok(Some(line)) => {
                    failures = 0;
                    self.handle_line(&mut parser, line);
                }
                Ok(None) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    failures += 1;
                    warn!("Job {}: {}", self.id, CoreError::StreamRead(e));
                    if failures >= MAX_CONSECUTIVE_READ_ERRORS {
                        warn!("Job {}: giving up on encoder output", self.id);
                        break;
                    }
                }
            }
        }

        let (state, exit_code) = self.await_exit();
        match exit_code {
            Some(code) => info!("Job {} {state} (exit code {code})", self.id),
            None => info!("Job {} {state}", self.id),
        }
        self.events.emit(SupervisorEvent::Terminal {
            job_id: self.id,
            state,
            exit_code,
        });
    }

    fn handle_line(&self, parser: &mut ProgressParser, line: String) {
        let event = parser.parse(&line);
        self.events.emit(SupervisorEvent::Log {
            job_id: self.id,
            line,
        });

        let Some(event) = event else {
            return;
        };
        let progress = {
            let mut state = self.state.lock();
            let Some(active) = state.active_job(self.id) else {
                return;
            };
            active.job.progress.apply(&event);
            active.job.progress
        };

        if let EncoderEvent::Progress { .. } = event {
            self.events.emit(SupervisorEvent::Progress {
                job_id: self.id,
                current_secs: progress.current_time_secs,
                total_secs: progress.total_duration_secs,
                speed: progress.speed,
            });
        }
    }

    /// Waits for the process to exit after its output closed, finalizes the
    /// job and returns its terminal state.
    fn await_exit(&self) -> (JobState, Option<i32>) {
        loop {
            {
                let mut state = self.state.lock();
                let Some(active) = state.active_job(self.id) else {
                    // Finalized by cancel, or detached after a failed kill
                    return state.outcome(self.id).unwrap_or((JobState::Cancelled, None));
                };
                let outcome = match active.child.try_wait() {
                    Ok(Some(_)) if active.cancel_requested => Some((JobState::Cancelled, None)),
                    Ok(Some(status)) => Some(classify_exit(status)),
                    Ok(None) => None,
                    Err(e) => {
                        warn!("Failed to query exit status of job {}: {e}", self.id);
                        Some(if active.cancel_requested {
                            (JobState::Cancelled, None)
                        } else {
                            (JobState::Failed, None)
                        })
                    }
                };
                if let Some((job_state, exit_code)) = outcome {
                    state.finalize(self.id, job_state, exit_code);
                    return state.outcome(self.id).unwrap_or((job_state, exit_code));
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn classify_exit(status: ExitStatus) -> (JobState, Option<i32>) {
    match status.code() {
        Some(0) => (JobState::Completed, Some(0)),
        code => (JobState::Failed, code),
    }
}

// ============================================================================
// PROCESS HELPERS
// ============================================================================

/// Spawns the encoder with stdout and stderr writing into one pipe.
fn spawn_encoder(command: &EncodeCommand) -> CoreResult<(Child, PipeReader)> {
    let (reader, writer) = io::pipe()?;
    let mut cmd = command.to_command();
    cmd.stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);

    let child = cmd
        .spawn()
        .map_err(|e| command_start_error(&command.program.display().to_string(), e))?;
    // The command still holds our copies of the write end; the reader only
    // sees end-of-stream once they are closed
    drop(cmd);
    Ok((child, reader))
}

#[cfg(unix)]
fn request_termination(pid: u32) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = i32::try_from(pid).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(windows)]
fn request_termination(pid: u32) -> io::Result<()> {
    use std::process::Command;

    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("taskkill exited with {status}")))
    }
}
