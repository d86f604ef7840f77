//! Core library for supervising long-running external transcoding processes.
//!
//! This crate launches an external encoder (ffmpeg by default), consumes its
//! interleaved diagnostic and progress output in real time, reports structured
//! progress to the caller, and guarantees that the encoder (and any orphans of
//! the same kind) can always be terminated deterministically.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use vconv_core::{JobParams, JobSupervisor, SupervisorConfig, SupervisorEvent, VideoCodec};
//!
//! let supervisor = JobSupervisor::new(SupervisorConfig::default()).unwrap();
//! let events = supervisor.subscribe();
//!
//! let params = JobParams::new("/path/to/input.mkv", "/path/to/output.mp4")
//!     .with_codec(VideoCodec::H265);
//! supervisor.start(params).unwrap();
//!
//! for event in events {
//!     match event {
//!         SupervisorEvent::Progress { current_secs, total_secs, .. } => {
//!             println!("{current_secs:.1}s of {total_secs:?}");
//!         }
//!         SupervisorEvent::Terminal { state, .. } => {
//!             println!("finished: {state}");
//!             break;
//!         }
//!         SupervisorEvent::Log { .. } => {}
//!     }
//! }
//! ```

pub mod capabilities;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod job;
pub mod output;
pub mod progress;
pub mod reaper;
pub mod supervisor;
pub mod utils;

// Re-exports for public API
pub use capabilities::{EncoderCapabilities, parse_encoder_listing, probe_encoders};
pub use command::{EncodeCommand, build_encode_command};
pub use config::{Container, JobParams, SupervisorConfig, VideoCodec};
pub use error::{CoreError, CoreResult};
pub use events::{
    ChannelEventHandler, EventDispatcher, EventHandler, JsonEventHandler, LogEventHandler,
    SupervisorEvent,
};
pub use job::{JobId, JobSnapshot, JobState, ProgressSnapshot};
pub use progress::{EncoderEvent, ProgressParser, parse_line, parse_timestamp};
pub use reaper::{ReapSummary, reap_all};
pub use supervisor::JobSupervisor;
pub use utils::{eta_seconds, format_duration, progress_percent};
