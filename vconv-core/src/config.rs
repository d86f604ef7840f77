// ============================================================================
// vconv-core/src/config.rs
// ============================================================================
//
// CONFIGURATION: Supervisor Configuration and Job Parameters
//
// This module defines the configuration structures and constants used by the
// supervisor, and the per-job parameters supplied by callers (CLI, GUI, tests).
//
// KEY COMPONENTS:
// - SupervisorConfig: encoder location and termination/probe timeouts
// - JobParams: input/output paths, codec choice, GPU preference, container
// - VideoCodec / Container: the user-selectable parts of the encode policy
//
// USAGE:
// Consumers build a SupervisorConfig once, hand it to JobSupervisor::new, and
// pass a JobParams to every JobSupervisor::start call.

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};

// ---- External crate imports ----
use serde::{Deserialize, Serialize};

// ---- Standard library imports ----
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// DEFAULT CONSTANTS
// ============================================================================

/// Encoder executable used when none is configured.
pub const DEFAULT_ENCODER: &str = "ffmpeg";

/// How long `cancel` waits after the graceful termination request before it
/// force-kills the encoder.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Upper bound for the capability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// CODEC AND CONTAINER
// ============================================================================

/// Video codec family requested by the caller.
///
/// The concrete encoder (hardware or software variant) is chosen at start
/// time from this value, the GPU preference and the capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
}

impl VideoCodec {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoCodec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h264" | "avc" | "x264" => Ok(VideoCodec::H264),
            "h265" | "hevc" | "x265" => Ok(VideoCodec::H265),
            other => Err(CoreError::InvalidParams(format!(
                "unknown codec '{other}' (expected h264 or h265)"
            ))),
        }
    }
}

/// Output container. Muxer settings are fixed policy per container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Mkv,
    Mov,
}

impl Container {
    /// Name of the ffmpeg muxer passed with `-f`.
    #[must_use]
    pub fn muxer(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "matroska",
            Container::Mov => "mov",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "mkv",
            Container::Mov => "mov",
        }
    }

    /// Whether the container understands `-movflags +faststart`.
    #[must_use]
    pub fn supports_faststart(self) -> bool {
        matches!(self, Container::Mp4 | Container::Mov)
    }

    /// Infers the container from a path's extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Container {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" | "m4v" => Ok(Container::Mp4),
            "mkv" | "matroska" => Ok(Container::Mkv),
            "mov" => Ok(Container::Mov),
            other => Err(CoreError::InvalidParams(format!(
                "unsupported container '{other}' (expected mp4, mkv or mov)"
            ))),
        }
    }
}

// ============================================================================
// JOB PARAMETERS
// ============================================================================

/// Parameters for one transcoding job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    pub input: PathBuf,
    pub output: PathBuf,
    pub codec: VideoCodec,
    /// Prefer the hardware encoder when the probe reports it.
    pub use_gpu: bool,
    pub container: Container,
}

impl JobParams {
    /// Creates parameters with the default codec, GPU preference enabled and
    /// the container inferred from the output extension (mp4 otherwise).
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let container = Container::from_path(&output).unwrap_or_default();
        Self {
            input: input.into(),
            output,
            codec: VideoCodec::default(),
            use_gpu: true,
            container,
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    /// Checks the parameters before anything is spawned.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidParams` for empty paths, a missing input
    /// file, or an output path equal to the input path.
    pub fn validate(&self) -> CoreResult<()> {
        if self.input.as_os_str().is_empty() {
            return Err(CoreError::InvalidParams("input path is empty".to_string()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(CoreError::InvalidParams("output path is empty".to_string()));
        }
        if !self.input.is_file() {
            return Err(CoreError::InvalidParams(format!(
                "input file not found: {}",
                self.input.display()
            )));
        }
        if self.input == self.output {
            return Err(CoreError::InvalidParams(
                "output path must differ from the input path".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SUPERVISOR CONFIGURATION
// ============================================================================

/// Configuration shared by every job a supervisor runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Encoder executable: a bare name looked up on PATH, or a path.
    pub encoder: PathBuf,
    pub grace_period: Duration,
    pub probe_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            encoder: PathBuf::from(DEFAULT_ENCODER),
            grace_period: DEFAULT_GRACE_PERIOD,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl SupervisorConfig {
    #[must_use]
    pub fn with_encoder(mut self, encoder: impl Into<PathBuf>) -> Self {
        self.encoder = encoder.into();
        self
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Executable name of the encoder as it appears in the process table,
    /// e.g. `ffmpeg` for both `ffmpeg` and `/usr/bin/ffmpeg.exe`.
    #[must_use]
    pub fn process_name(&self) -> String {
        self.encoder
            .file_stem()
            .map_or_else(|| DEFAULT_ENCODER.to_string(), |s| s.to_string_lossy().into_owned())
    }

    /// # Errors
    ///
    /// Returns `CoreError::Config` for an empty encoder or zero timeouts.
    pub fn validate(&self) -> CoreResult<()> {
        if self.encoder.as_os_str().is_empty() {
            return Err(CoreError::Config("encoder must not be empty".to_string()));
        }
        if self.grace_period.is_zero() {
            return Err(CoreError::Config("grace period must be positive".to_string()));
        }
        if self.probe_timeout.is_zero() {
            return Err(CoreError::Config("probe timeout must be positive".to_string()));
        }
        Ok(())
    }
}
