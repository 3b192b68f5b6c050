//! CLI command definitions and argument parsing.
//!
//! Uses clap derive macros for ergonomic argument definitions.

pub mod args;

use colored::Colorize;

/// Print a highlighted notice to stderr, keeping stdout clean for piping.
pub fn notice(label: &str, message: &str) {
    eprintln!("{} {message}", format!("{label}:").yellow().bold());
}
