//! Implementation of the 'probe' subcommand.

use crate::cli::ProbeArgs;
use crate::error::CliResult;
use crate::terminal;

use vconv_core::{JobSupervisor, SupervisorConfig, VideoCodec};

use std::time::Duration;

/// Probes the encoder binary and prints the hardware encoders it reports.
pub fn run_probe(args: ProbeArgs) -> CliResult<()> {
    let config = SupervisorConfig::default()
        .with_encoder(args.encoder.encoder)
        .with_probe_timeout(Duration::from_secs(args.timeout));
    let supervisor = JobSupervisor::new(config)?;
    let capabilities = supervisor.capabilities()?;
    let encoders: Vec<&str> = capabilities.encoders().collect();

    if args.json {
        let report = serde_json::json!({
            "encoder": supervisor.config().encoder.display().to_string(),
            "hardware_encoders": encoders,
        });
        println!("{report}");
        return Ok(());
    }

    terminal::print_heading("HARDWARE ENCODERS");
    terminal::print_info("Encoder", supervisor.config().encoder.display());
    if encoders.is_empty() {
        terminal::print_info("Available", "none (software encoding only)");
    } else {
        terminal::print_info("Available", encoders.join(", "));
    }
    for codec in [VideoCodec::H264, VideoCodec::H265] {
        let selected = capabilities
            .hardware_encoder_for(codec)
            .unwrap_or("software");
        terminal::print_info(codec.as_str(), selected);
    }
    Ok(())
}
