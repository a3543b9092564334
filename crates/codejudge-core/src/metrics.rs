//! Quantitative results of a prior test run
//!
//! The evaluation result file is produced by the external test harness.
//! Missing fields take neutral defaults; present fields of the wrong type
//! make the file invalid.

use std::fs;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{JudgeError, Result};

fn unknown() -> String {
    "unknown".to_string()
}

/// Read-only record of one test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeMetrics {
    #[serde(default)]
    pub passrate: f64,
    #[serde(default)]
    pub weighted_score: f64,
    #[serde(default)]
    pub memory_score: f64,
    #[serde(default)]
    pub robustness_score: f64,
    #[serde(default)]
    pub tests_passed: u64,
    #[serde(default)]
    pub tests_failed: u64,
    #[serde(default)]
    pub total_tests: u64,
    #[serde(default)]
    pub execution_time_ms: u64,
    #[serde(default, rename = "failed_test_details", alias = "failed_tests")]
    pub failed_tests: Vec<String>,
    #[serde(default)]
    pub potential_edge_cases: Vec<String>,
    #[serde(default = "unknown")]
    pub program_type: String,
    #[serde(default = "unknown")]
    pub difficulty_level: String,
}

impl Default for QuantitativeMetrics {
    fn default() -> Self {
        Self {
            passrate: 0.0,
            weighted_score: 0.0,
            memory_score: 0.0,
            robustness_score: 0.0,
            tests_passed: 0,
            tests_failed: 0,
            total_tests: 0,
            execution_time_ms: 0,
            failed_tests: Vec::new(),
            potential_edge_cases: Vec::new(),
            program_type: unknown(),
            difficulty_level: unknown(),
        }
    }
}

/// Numeric subset persisted in the analysis artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub passrate: f64,
    pub weighted_score: f64,
    pub memory_score: f64,
    pub robustness_score: f64,
    pub tests_passed: u64,
    pub tests_failed: u64,
    pub total_tests: u64,
    pub execution_time_ms: u64,
}

impl QuantitativeMetrics {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| JudgeError::read_input(path, e))?;
        Self::from_json_str(&content).map_err(|e| JudgeError::invalid_metrics(path, e))
    }

    /// Parse a result file. Only a JSON object is accepted.
    pub fn from_json_str(content: &str) -> std::result::Result<Self, serde_json::Error> {
        match serde_json::from_str(content)? {
            value @ Value::Object(_) => serde_json::from_value(value),
            _ => Err(serde_json::Error::custom("expected a JSON object")),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_tests.is_empty()
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            passrate: self.passrate,
            weighted_score: self.weighted_score,
            memory_score: self.memory_score,
            robustness_score: self.robustness_score,
            tests_passed: self.tests_passed,
            tests_failed: self.tests_failed,
            total_tests: self.total_tests,
            execution_time_ms: self.execution_time_ms,
        }
    }
}
