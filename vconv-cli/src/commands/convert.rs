//! Implementation of the 'convert' subcommand.
//!
//! Builds the job from the CLI arguments, runs it under a `JobSupervisor`
//! and renders its events either as a progress bar or as JSON lines.

use crate::cli::ConvertArgs;
use crate::config::default_output_path;
use crate::error::{CliResult, PathErrorContext};
use crate::progress::ProgressReporter;
use crate::terminal;

use log::{debug, warn};
use vconv_core::{
    Container, JobParams, JobSnapshot, JobState, JobSupervisor, JsonEventHandler,
    LogEventHandler, SupervisorConfig, format_duration,
};

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often the wait loop checks the timeout.
const WAIT_SLICE: Duration = Duration::from_millis(250);

/// Resolves the job parameters from the CLI arguments.
fn build_params(args: &ConvertArgs) -> JobParams {
    let output_path: PathBuf = args.output_path.clone().unwrap_or_else(|| {
        default_output_path(&args.input_path, args.container.unwrap_or_default())
    });
    let container = args
        .container
        .or_else(|| Container::from_path(&output_path))
        .unwrap_or_default();

    JobParams::new(&args.input_path, output_path)
        .with_codec(args.codec)
        .with_gpu(!args.no_gpu)
        .with_container(container)
}

fn display_job_info(job: &JobSnapshot) {
    terminal::print_heading("CONVERT");
    terminal::print_info("Input", job.params.input.display());
    terminal::print_info("Output", job.params.output.display());
    terminal::print_info("Container", job.params.container);
    let encoder = job
        .command
        .video_encoder()
        .map_or_else(|| "unknown".to_string(), |e| e.to_string_lossy().into_owned());
    terminal::print_info("Encoder", encoder);
    terminal::print_info("Started", job.started_at.format("%Y-%m-%d %H:%M:%S"));
}

fn display_summary(job: &JobSnapshot, reporter: Option<&ProgressReporter>) {
    terminal::print_heading("SUMMARY");
    let elapsed = job.elapsed().num_milliseconds() as f64 / 1000.0;
    terminal::print_info("Time", format_duration(elapsed));
    terminal::print_info("Converted", format_duration(job.progress.current_time_secs));

    match job.state {
        JobState::Completed => {
            terminal::print_success(&format!("Wrote {}", job.params.output.display()));
        }
        JobState::Cancelled => terminal::print_warning("Job cancelled"),
        _ => {
            let code = job
                .exit_code
                .map_or_else(|| "unknown".to_string(), |c| c.to_string());
            terminal::print_error(&format!("Encoder failed with exit code {code}"));
            if let Some(reporter) = reporter {
                terminal::print_encoder_output(&reporter.recent_lines());
            }
        }
    }
}

/// Runs one conversion job to its end and returns the final state.
///
/// With `timeout`, a job still running after that many seconds is cancelled.
pub fn run_convert(args: ConvertArgs, verbose: bool) -> CliResult<JobState> {
    debug!("Run started: {}", chrono::Local::now());
    let params = build_params(&args);
    params.validate()?;

    if let Some(parent) = params
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        fs::create_dir_all(parent).path_context("create output directory", parent)?;
    }

    let grace_period = Duration::from_secs(args.grace_period);
    let config = SupervisorConfig::default()
        .with_encoder(args.encoder.encoder)
        .with_grace_period(grace_period);
    let supervisor = JobSupervisor::new(config)?;

    let reporter = if args.json {
        supervisor.add_handler(Arc::new(JsonEventHandler::new().with_logs(verbose)));
        None
    } else {
        let reporter = Arc::new(ProgressReporter::new(verbose));
        supervisor.add_handler(reporter.clone());
        Some(reporter)
    };
    if verbose {
        supervisor.add_handler(Arc::new(LogEventHandler));
    }

    let job_id = supervisor.start(params)?;
    debug!("Started job {job_id}");
    if !args.json {
        if let Some(job) = supervisor.current_job() {
            display_job_info(&job);
        }
    }

    let deadline = args
        .timeout
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let state = loop {
        let state = supervisor.wait(WAIT_SLICE);
        if state.is_terminal() {
            break state;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            warn!("Job {job_id} exceeded its timeout; cancelling");
            supervisor.cancel()?;
            // Let the reader deliver the terminal event before reporting
            break supervisor.wait(grace_period);
        }
    };

    if !args.json {
        if let Some(job) = supervisor.current_job() {
            display_summary(&job, reporter.as_deref());
        }
    }
    debug!("Finished at: {}", chrono::Local::now());
    Ok(state)
}
