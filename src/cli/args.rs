//! Arguments for the subcommands

use std::path::PathBuf;

use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// C source file to review
    pub source: PathBuf,

    /// Evaluation result file produced by the test harness
    pub results: PathBuf,

    /// Where to write the full analysis as JSON
    #[arg(long, default_value = "comprehensive_analysis.json")]
    pub json_out: PathBuf,

    /// Where to write the human-readable report
    #[arg(long, default_value = "feedback_report.txt")]
    pub report_out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct GenTestsArgs {
    /// C source file to generate tests for
    pub source: PathBuf,

    /// Where to write the generated test spec
    pub output: PathBuf,
}
