//! Codejudge - staged LLM review of C submissions
//!
//! Runs a four-stage analysis of a C program against its test results,
//! grades it, and writes a JSON artifact plus a plain-text report. Can
//! also generate test cases for a program.

mod cli;
mod commands;

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use cli::Cli;
use codejudge_core::error::ExitCode as JudgeExitCode;
use codejudge_core::logging;

fn main() -> ExitCode {
    let start = Instant::now();

    let cli = Cli::parse();

    // Initialize structured logging
    if let Err(e) = logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json) {
        // If tracing initialization fails, fall back to stderr
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::debug!(elapsed = ?start.elapsed(), "parse_args");

    match commands::dispatch::run(&cli, start) {
        Ok(()) => ExitCode::from(JudgeExitCode::Success as u8),
        Err(e) => {
            if cli.log_json {
                eprintln!("{}", e.to_json());
            } else {
                eprintln!("error: {}", e);
            }

            ExitCode::from(e.exit_code() as u8)
        }
    }
}
