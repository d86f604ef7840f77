// ============================================================================
// vconv-core/src/command.rs
// ============================================================================
//
// ARGUMENT POLICY: Deterministic Encoder Command Lines
//
// The command line of a job is built exactly once, at start time, from the
// job parameters and the capability probe result. The same inputs always
// produce the same argument vector.
//
// Layout:
//
//   <program> -hide_banner -nostdin -y
//     [-hwaccel cuda]
//     -i <input>
//     -c:v <encoder> <encoder settings>
//     -pix_fmt yuv420p
//     -c:a aac -b:a 192k -ar 48000 -ac 2
//     [-movflags +faststart]
//     -f <muxer> <output>

use crate::capabilities::EncoderCapabilities;
use crate::config::{Container, JobParams, VideoCodec};

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Resolved, immutable command line of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl EncodeCommand {
    /// Video encoder selected by the policy (the value following `-c:v`).
    #[must_use]
    pub fn video_encoder(&self) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|arg| arg == "-c:v")
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    #[must_use]
    pub fn uses_hardware(&self) -> bool {
        self.args.iter().any(|arg| arg == "-hwaccel")
    }

    /// A `std::process::Command` with program and arguments set; stdio is
    /// left to the caller.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for EncodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Builds the command line for `params`.
///
/// The hardware path is taken only when GPU encoding is requested and the
/// capabilities report the matching hardware encoder.
#[must_use]
pub fn build_encode_command(
    program: &Path,
    params: &JobParams,
    capabilities: Option<&EncoderCapabilities>,
) -> EncodeCommand {
    let hardware_encoder = capabilities
        .filter(|_| params.use_gpu)
        .and_then(|caps| caps.hardware_encoder_for(params.codec));

    let mut args = CommandArgs::default();
    args.push_all(["-hide_banner", "-nostdin", "-y"]);

    if hardware_encoder.is_some() {
        args.push_all(["-hwaccel", "cuda"]);
    }

    args.push("-i");
    args.push(params.input.as_os_str());

    match hardware_encoder {
        Some(encoder) => push_hardware_video(&mut args, encoder, params.codec),
        None => push_software_video(&mut args, params.codec, params.container),
    }

    args.push_all(["-pix_fmt", "yuv420p"]);
    args.push_all(["-c:a", "aac", "-b:a", "192k", "-ar", "48000", "-ac", "2"]);

    if params.container.supports_faststart() {
        args.push_all(["-movflags", "+faststart"]);
    }

    args.push_all(["-f", params.container.muxer()]);
    args.push(params.output.as_os_str());

    EncodeCommand {
        program: program.to_path_buf(),
        args: args.0,
    }
}

fn push_hardware_video(args: &mut CommandArgs, encoder: &str, codec: VideoCodec) {
    let profile = match codec {
        VideoCodec::H264 => "high",
        VideoCodec::H265 => "main",
    };
    args.push_all(["-c:v", encoder]);
    args.push_all(["-preset", "p3", "-rc", "vbr", "-cq", "23"]);
    args.push_all(["-b:v", "5M", "-maxrate", "8M", "-bufsize", "10M"]);
    args.push_all(["-profile:v", profile]);
}

fn push_software_video(args: &mut CommandArgs, codec: VideoCodec, container: Container) {
    match codec {
        VideoCodec::H264 => {
            args.push_all(["-c:v", "libx264", "-preset", "medium"]);
            args.push_all(["-profile:v", "main", "-level:v", "4.0"]);
            args.push_all(["-b:v", "4M", "-maxrate", "5M", "-bufsize", "8M"]);
        }
        VideoCodec::H265 => {
            args.push_all(["-c:v", "libx265", "-preset", "medium"]);
            args.push_all(["-profile:v", "main"]);
            args.push_all(["-b:v", "3M", "-maxrate", "4M", "-bufsize", "6M"]);
            // QuickTime players only recognise HEVC tagged as hvc1
            if container.supports_faststart() {
                args.push_all(["-tag:v", "hvc1"]);
            }
        }
    }
}

#[derive(Default)]
struct CommandArgs(Vec<OsString>);

impl CommandArgs {
    fn push(&mut self, arg: impl AsRef<OsStr>) {
        self.0.push(arg.as_ref().to_os_string());
    }

    fn push_all<const N: usize>(&mut self, args: [&str; N]) {
        self.0.extend(args.into_iter().map(OsString::from));
    }
}
