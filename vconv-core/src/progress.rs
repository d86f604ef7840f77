//! Encoder progress parsing
//!
//! Turns single lines of the encoder's human-readable diagnostic output into
//! structured events. Two kinds of lines carry information:
//!
//! ```text
//!   Duration: 00:02:00.00, start: 0.000000, bitrate: 1205 kb/s
//! frame=  750 fps=250 q=28.0 size=  1024kB time=00:00:30.00 bitrate= 279.6kbits/s speed=1.0x
//! ```
//!
//! Everything else yields no event. The patterns are a best-effort contract
//! against ffmpeg's text output; there is no fallback if that format changes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Duration:\s*([^,\s]+)").expect("valid duration pattern"));

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\btime=\s*(\S+)").expect("valid time pattern"));

static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bspeed=\s*(\d+(?:\.\d+)?)x").expect("valid speed pattern"));

/// Structured information extracted from one line of encoder output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EncoderEvent {
    /// Total input duration in seconds.
    DurationKnown { total_secs: f64 },
    /// Encoded position in seconds and the encode speed multiplier.
    Progress { current_secs: f64, speed: f64 },
}

/// Parses an `H:M:S.cc` timestamp into seconds. Returns None if invalid.
///
/// Every field must be a plain non-negative decimal number; signs, exponents
/// and `N/A` are rejected.
#[must_use]
pub fn parse_timestamp(time: &str) -> Option<f64> {
    let parts: Vec<&str> = time.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let mut fields = [0.0_f64; 3];
    for (field, part) in fields.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        *field = part.parse::<f64>().ok()?;
    }

    let [hours, minutes, seconds] = fields;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Extracts an event from a single line without any per-job state.
#[must_use]
pub fn parse_line(line: &str) -> Option<EncoderEvent> {
    if let Some(caps) = DURATION_RE.captures(line) {
        return parse_timestamp(&caps[1]).map(|total_secs| EncoderEvent::DurationKnown { total_secs });
    }

    let time = TIME_RE.captures(line)?;
    let speed = SPEED_RE.captures(line)?;
    let current_secs = parse_timestamp(&time[1])?;
    let speed = speed[1].parse::<f64>().ok()?;
    Some(EncoderEvent::Progress { current_secs, speed })
}

/// Per-job accumulator around [`parse_line`].
///
/// Only the first duration announcement of a job is reported; later ones are
/// swallowed so the total stays fixed for the job's lifetime.
#[derive(Debug, Default, Clone)]
pub struct ProgressParser {
    total_duration: Option<f64>,
}

impl ProgressParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, line: &str) -> Option<EncoderEvent> {
        match parse_line(line)? {
            EncoderEvent::DurationKnown { total_secs } => {
                if self.total_duration.is_some() {
                    return None;
                }
                self.total_duration = Some(total_secs);
                Some(EncoderEvent::DurationKnown { total_secs })
            }
            progress => Some(progress),
        }
    }

    #[must_use]
    pub fn total_duration(&self) -> Option<f64> {
        self.total_duration
    }
}
