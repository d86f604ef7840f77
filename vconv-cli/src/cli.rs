// vconv-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vconv_core::config::{DEFAULT_ENCODER, DEFAULT_GRACE_PERIOD, DEFAULT_PROBE_TIMEOUT};
use vconv_core::{Container, VideoCodec};

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "vconv: Supervised video conversion",
    long_about = "Runs ffmpeg conversion jobs with live progress, deterministic cancellation and orphan cleanup."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging, including every line of encoder output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converts one video file
    Convert(ConvertArgs),
    /// Lists the hardware encoders the encoder binary reports
    Probe(ProbeArgs),
    /// Kills every running encoder process, tracked or not
    Reap(ReapArgs),
}

/// Options shared by every command that runs the encoder.
#[derive(Args, Debug, Clone)]
pub struct EncoderArgs {
    /// Encoder executable: a name looked up on PATH, or a path
    #[arg(
        long,
        value_name = "PATH",
        env = "VCONV_ENCODER",
        default_value = DEFAULT_ENCODER
    )]
    pub encoder: PathBuf,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input video file
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_FILE")]
    pub input_path: PathBuf,

    /// Output file (defaults to the input path with the container's extension)
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE")]
    pub output_path: Option<PathBuf>,

    /// Video codec: h264 or h265
    #[arg(short, long, value_name = "CODEC", default_value = "h264")]
    pub codec: VideoCodec,

    /// Output container: mp4, mkv or mov (defaults from the output extension)
    #[arg(long, value_name = "FORMAT")]
    pub container: Option<Container>,

    /// Never use the hardware encoder, even if available
    #[arg(long)]
    pub no_gpu: bool,

    #[command(flatten)]
    pub encoder: EncoderArgs,

    /// Seconds to wait after asking the encoder to stop before killing it
    #[arg(
        long,
        value_name = "SECONDS",
        env = "VCONV_GRACE_PERIOD",
        default_value_t = DEFAULT_GRACE_PERIOD.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub grace_period: u64,

    /// Cancel the job if it has not finished after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Print events as JSON lines instead of a progress bar
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub encoder: EncoderArgs,

    /// Seconds before the probe is abandoned
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_PROBE_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ReapArgs {
    #[command(flatten)]
    pub encoder: EncoderArgs,

    /// Process name to reap (defaults to the encoder's executable name)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert_basic_args() {
        let cli = Cli::parse_from(["vconv", "convert", "-i", "input.avi"]);
        assert!(!cli.verbose);

        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.input_path, PathBuf::from("input.avi"));
                assert!(args.output_path.is_none());
                assert_eq!(args.codec, VideoCodec::H264);
                assert!(args.container.is_none());
                assert!(!args.no_gpu);
                assert_eq!(args.grace_period, 3);
                assert!(args.timeout.is_none());
                assert!(!args.json);
            }
            other => panic!("Expected Convert command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_convert_with_options() {
        let cli = Cli::parse_from([
            "vconv",
            "convert",
            "--input",
            "in.mov",
            "--output",
            "out.mkv",
            "--codec",
            "hevc",
            "--container",
            "mkv",
            "--no-gpu",
            "--encoder",
            "/opt/ffmpeg/bin/ffmpeg",
            "--grace-period",
            "5",
            "--timeout",
            "600",
            "--json",
            "--verbose",
        ]);
        assert!(cli.verbose);

        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.output_path, Some(PathBuf::from("out.mkv")));
                assert_eq!(args.codec, VideoCodec::H265);
                assert_eq!(args.container, Some(Container::Mkv));
                assert!(args.no_gpu);
                assert_eq!(args.encoder.encoder, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
                assert_eq!(args.grace_period, 5);
                assert_eq!(args.timeout, Some(600));
                assert!(args.json);
            }
            other => panic!("Expected Convert command, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Cli::try_parse_from(["vconv", "convert", "-i", "a.avi", "--codec", "vp9"]).is_err());
        assert!(Cli::try_parse_from(["vconv", "convert", "-i", "a.avi", "--container", "avi"]).is_err());
        assert!(Cli::try_parse_from(["vconv", "convert", "-i", "a.avi", "--grace-period", "0"]).is_err());
        assert!(Cli::try_parse_from(["vconv", "convert"]).is_err());
    }

    #[test]
    fn test_parse_probe_and_reap() {
        match Cli::parse_from(["vconv", "probe", "--timeout", "2"]).command {
            Commands::Probe(args) => {
                assert_eq!(args.timeout, 2);
                assert_eq!(args.encoder.encoder, PathBuf::from("ffmpeg"));
            }
            other => panic!("Expected Probe command, got {other:?}"),
        }

        match Cli::parse_from(["vconv", "reap", "--name", "ffmpeg.exe"]).command {
            Commands::Reap(args) => assert_eq!(args.name.as_deref(), Some("ffmpeg.exe")),
            other => panic!("Expected Reap command, got {other:?}"),
        }
    }
}
