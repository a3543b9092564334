//! Error types and exit codes for codejudge
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure (backend unavailable, output could not be written)
//! - 2: Usage error (bad flags, invalid configuration)
//! - 3: Input error (unreadable source, unreadable or invalid metrics file)
//!
//! Malformed model output never becomes a [`JudgeError`]; it is downgraded
//! to a degraded stage result or a fallback test spec instead.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/config (2)
    Usage = 2,
    /// Input error - unreadable or invalid input artifacts (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during a codejudge run
#[derive(Error, Debug)]
pub enum JudgeError {
    // Input errors (exit code 3)
    #[error("failed to read {path:?}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metrics file {path:?}: {reason}")]
    InvalidMetrics { path: PathBuf, reason: String },

    // Usage errors (exit code 2)
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    // Generic failures (exit code 1)
    #[error("backend unavailable after {attempts} attempt(s): {message}")]
    Backend { attempts: u32, message: String },

    #[error("failed to write {path:?}: {reason}")]
    WriteOutput { path: PathBuf, reason: String },

    #[error("test-case generation produced no test cases")]
    EmptyTestSpec,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl JudgeError {
    /// Create an error for an input file that could not be read
    pub fn read_input(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JudgeError::ReadInput {
            path: path.into(),
            source,
        }
    }

    /// Create an error for a metrics file with unusable content
    pub fn invalid_metrics(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        JudgeError::InvalidMetrics {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an error for an invalid configuration value
    pub fn config(reason: impl std::fmt::Display) -> Self {
        JudgeError::Config {
            reason: reason.to_string(),
        }
    }

    /// Create an error for an output artifact that could not be written
    pub fn write_output(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        JudgeError::WriteOutput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the fatal backend-unavailability class
    pub fn is_backend(&self) -> bool {
        matches!(self, JudgeError::Backend { .. })
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            JudgeError::ReadInput { .. } | JudgeError::InvalidMetrics { .. } => ExitCode::Data,

            JudgeError::Config { .. } => ExitCode::Usage,

            JudgeError::Backend { .. }
            | JudgeError::WriteOutput { .. }
            | JudgeError::EmptyTestSpec
            | JudgeError::Io(_)
            | JudgeError::Json(_)
            | JudgeError::Toml(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    fn error_type(&self) -> &'static str {
        match self {
            JudgeError::ReadInput { .. } => "read_input",
            JudgeError::InvalidMetrics { .. } => "invalid_metrics",
            JudgeError::Config { .. } => "config",
            JudgeError::Backend { .. } => "backend_unavailable",
            JudgeError::WriteOutput { .. } => "write_output",
            JudgeError::EmptyTestSpec => "empty_test_spec",
            JudgeError::Io(_) => "io_error",
            JudgeError::Json(_) => "json_error",
            JudgeError::Toml(_) => "toml_error",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for codejudge operations
pub type Result<T> = std::result::Result<T, JudgeError>;
