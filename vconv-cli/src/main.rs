// vconv-cli/src/main.rs
//
// Entry point for the vconv binary: parses arguments, sets up logging,
// dispatches to the command and maps the outcome to a process exit code.
//
// Exit codes:
// - 0: success
// - 1: invalid input or a supervisor error
// - 2: the encoder ran and failed
// - 130: the job was cancelled

use clap::Parser;
use std::process::ExitCode;
use vconv_cli::{Cli, Commands, exit_code_for, logging, run_convert, run_probe, run_reap, terminal};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Convert(args) => run_convert(args, cli.verbose).map(exit_code_for),
        Commands::Probe(args) => run_probe(args).map(|()| 0),
        Commands::Reap(args) => run_reap(args).map(|()| 0),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            terminal::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
