//! CLI argument parsing for codejudge
//!
//! Supports global flags: --config, --backend-url, --model, --verbose,
//! --log-level, --log-json

pub mod args;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use args::{AnalyzeArgs, GenTestsArgs};

/// Codejudge - staged LLM review and test generation for C submissions
#[derive(Parser, Debug)]
#[command(name = "codejudge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./codejudge.toml when present)
    #[arg(long, global = true, env = "CODEJUDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Inference backend base URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Model used for the analysis stages, or for test generation with gen-tests
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level or filter directives (overrides --verbose)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs and errors as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the four-stage analysis and write the JSON artifact and report
    Analyze(AnalyzeArgs),

    /// Generate test cases for a C program
    GenTests(GenTestsArgs),
}
