//! Implementation of the 'reap' subcommand.

use crate::cli::ReapArgs;
use crate::error::CliResult;
use crate::terminal;

use log::debug;
use vconv_core::{SupervisorConfig, reap_all};

/// Kills every process named like the encoder and prints what was done.
pub fn run_reap(args: ReapArgs) -> CliResult<()> {
    let name = args.name.unwrap_or_else(|| {
        SupervisorConfig::default()
            .with_encoder(args.encoder.encoder)
            .process_name()
    });
    debug!("Reaping processes named '{name}'");
    let summary = reap_all(&name);

    if args.json {
        let report = serde_json::json!({
            "name": name,
            "killed": summary.killed,
            "fallback_used": summary.fallback_used,
            "fallback_succeeded": summary.fallback_succeeded,
        });
        println!("{report}");
        return Ok(());
    }

    terminal::print_heading("REAP");
    terminal::print_info("Process", &name);
    if summary.fallback_used {
        let outcome = if summary.fallback_succeeded {
            "killed by name (count unknown)"
        } else {
            "nothing killed"
        };
        terminal::print_info("Fallback", outcome);
    } else {
        terminal::print_info("Killed", summary.killed);
    }
    Ok(())
}
