// ============================================================================
// vconv-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: Styled lines for human-readable output
//
// Headings and info lines go to stdout; warnings and errors go to stderr so
// that `--json` output on stdout stays machine-readable. Styling is dropped
// automatically when the stream is not a terminal.

use console::style;
use std::fmt::Display;

/// Width of the label column in info lines.
const LABEL_WIDTH: usize = 12;

/// Print a section heading.
pub fn print_heading(text: &str) {
    println!();
    println!("{}", style(format!("===== {text} =====")).cyan().bold());
}

/// Print an indented `label: value` line with the label highlighted.
pub fn print_info<T: Display>(label: &str, value: T) {
    let label = format!("{label}:");
    println!("  {} {value}", style(format!("{label:<LABEL_WIDTH$}")).cyan());
}

pub fn print_success(message: &str) {
    println!("{} {message}", style("✓").green().bold());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {message}", style("Warning:").yellow().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{} {message}", style("Error:").red().bold());
}

/// Print raw encoder output lines, dimmed and indented, to stderr.
pub fn print_encoder_output(lines: &[String]) {
    for line in lines {
        eprintln!("    {}", style(line).dim());
    }
}
