//! CLI commands for codejudge

pub mod analyze;
pub mod dispatch;

use std::fs;
use std::path::Path;

use codejudge_core::error::{JudgeError, Result};

/// Write a finished artifact, naming the path on failure.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| JudgeError::write_output(path, e))
}
