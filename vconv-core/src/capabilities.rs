//! Hardware encoder capability probe
//!
//! Asks the encoder binary for its encoder listing once and answers whether a
//! hardware-accelerated encoder is available for a codec. The probe is the
//! only source of truth: no driver or device inspection is attempted.

use crate::config::VideoCodec;
use crate::error::{CoreResult, probe_unavailable_error};

use log::{debug, warn};
use serde::Serialize;

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Hardware encoders the argument policy knows how to drive.
pub const HARDWARE_ENCODERS: [(VideoCodec, &str); 2] = [
    (VideoCodec::H264, "h264_nvenc"),
    (VideoCodec::H265, "hevc_nvenc"),
];

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Set of known hardware encoders reported by the probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EncoderCapabilities {
    encoders: BTreeSet<String>,
}

impl EncoderCapabilities {
    /// Capabilities with nothing available; what a failed or timed out probe yields.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn supports(&self, encoder: &str) -> bool {
        self.encoders.contains(encoder)
    }

    /// Hardware encoder to use for `codec`, if the probe reported it.
    #[must_use]
    pub fn hardware_encoder_for(&self, codec: VideoCodec) -> Option<&'static str> {
        HARDWARE_ENCODERS
            .iter()
            .find(|(c, name)| *c == codec && self.supports(name))
            .map(|(_, name)| *name)
    }

    pub fn encoders(&self) -> impl Iterator<Item = &str> {
        self.encoders.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

/// Scans an encoder listing for whitespace-delimited tokens equal to a known
/// hardware encoder id.
#[must_use]
pub fn parse_encoder_listing(listing: &str) -> EncoderCapabilities {
    let encoders = listing
        .split_whitespace()
        .filter_map(|token| {
            HARDWARE_ENCODERS
                .iter()
                .find(|(_, name)| *name == token)
                .map(|(_, name)| (*name).to_string())
        })
        .collect();
    EncoderCapabilities { encoders }
}

/// Runs `<binary> -hide_banner -encoders` and parses its combined output.
///
/// A probe that exceeds `timeout` is killed and reports no capabilities, as
/// does a probe that exits unsuccessfully.
///
/// # Errors
///
/// Returns `CoreError::ProbeUnavailable` if the binary cannot be run at all.
pub fn probe_encoders(binary: &Path, timeout: Duration) -> CoreResult<EncoderCapabilities> {
    debug!("Probing encoders: {} -hide_banner -encoders", binary.display());

    let mut child = Command::new(binary)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| probe_unavailable_error(binary, e.to_string()))?;

    // Drain both pipes so a chatty binary can't stall on a full pipe buffer
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                warn!(
                    "Encoder probe timed out after {:.1}s; assuming no hardware encoders",
                    timeout.as_secs_f64()
                );
                let _ = child.kill();
                let _ = child.wait();
                return Ok(EncoderCapabilities::none());
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(probe_unavailable_error(binary, e.to_string())),
        }
    };

    let mut listing = String::new();
    for handle in [stdout, stderr].into_iter().flatten() {
        listing.push_str(&handle.join().unwrap_or_default());
        listing.push('\n');
    }

    if !status.success() {
        warn!("Encoder probe exited with {status}; assuming no hardware encoders");
        return Ok(EncoderCapabilities::none());
    }

    let capabilities = parse_encoder_listing(&listing);
    debug!(
        "Hardware encoders available: {:?}",
        capabilities.encoders().collect::<Vec<_>>()
    );
    Ok(capabilities)
}

fn drain<R: Read + Send + 'static>(mut source: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = source.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    })
}
