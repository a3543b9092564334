//! Single-shot test-case generation for a C program.
//!
//! One backend call, one extraction, one validation. Anything that goes
//! wrong on the way (backend down, unparseable reply, missing description,
//! no test cases) yields the fixed fallback spec instead, so generation
//! itself never fails.

use std::fs;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{ChatBackend, DecodingOptions};
use crate::client::InferenceClient;
use crate::error::{JudgeError, Result};
use crate::extract::{extract_structured, Extraction};
use crate::features::{io_profile, IoProfile};
use crate::prompt;
use crate::source::SourceUnit;

pub const FALLBACK_DESCRIPTION: &str = "Unknown program (LLM analysis failed)";

fn default_category() -> String {
    "normal".to_string()
}

fn default_weight() -> f64 {
    1.0
}

fn default_program_type() -> String {
    "other".to_string()
}

fn default_difficulty() -> String {
    "basic".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl TestCase {
    fn new(input: &str, expected_output: &str, description: &str, category: &str) -> Self {
        Self {
            input: input.to_string(),
            expected_output: expected_output.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            weight: default_weight(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    LlmAnalysis,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    pub program_description: String,
    pub program_type: String,
    pub difficulty_level: String,
    pub test_cases: Vec<TestCase>,
    pub potential_edge_cases: Vec<String>,
    pub source_file: String,
    pub generation_method: GenerationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_analysis: Option<IoProfile>,
}

impl TestSpec {
    /// Fixed substitute used whenever generation cannot be trusted.
    pub fn fallback(source_file: impl Into<String>) -> Self {
        Self {
            program_description: FALLBACK_DESCRIPTION.to_string(),
            program_type: default_program_type(),
            difficulty_level: default_difficulty(),
            test_cases: vec![
                TestCase::new("5\n", "5", "Basic numeric input test", "normal"),
                TestCase::new("\n", "", "Empty input test", "edge"),
            ],
            potential_edge_cases: vec![
                "Input validation".to_string(),
                "Boundary conditions".to_string(),
            ],
            source_file: source_file.into(),
            generation_method: GenerationMethod::Fallback,
            code_analysis: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.generation_method == GenerationMethod::Fallback
    }

    /// Write the spec as indented JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if self.test_cases.is_empty() {
            return Err(JudgeError::EmptyTestSpec);
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| JudgeError::write_output(path, e))
    }
}

/// Accept any JSON scalar where text is expected. Null reads as empty.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected a scalar, found {other}"))),
    }
}

/// A test case as the backend wrote it. Null optional fields take defaults.
#[derive(Debug, Deserialize)]
struct CandidateCase {
    #[serde(deserialize_with = "scalar_string")]
    input: String,
    #[serde(deserialize_with = "scalar_string")]
    expected_output: String,
    #[serde(default, deserialize_with = "scalar_string")]
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    weight: Option<f64>,
}

impl From<CandidateCase> for TestCase {
    fn from(case: CandidateCase) -> Self {
        Self {
            input: case.input,
            expected_output: case.expected_output,
            description: case.description,
            category: case.category.unwrap_or_else(default_category),
            weight: case.weight.unwrap_or_else(default_weight),
        }
    }
}

/// The shape a backend reply must have before it is accepted.
#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    program_description: Option<String>,
    #[serde(default)]
    program_type: Option<String>,
    #[serde(default)]
    difficulty_level: Option<String>,
    #[serde(default)]
    test_cases: Option<Vec<CandidateCase>>,
    #[serde(default)]
    potential_edge_cases: Option<Vec<String>>,
}

/// Why a backend reply was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("backend unavailable: {0}")]
    Backend(String),

    #[error("reply contained no JSON object")]
    Unparseable,

    #[error("reply does not match the test spec schema: {0}")]
    Schema(String),

    #[error("missing program_description")]
    MissingDescription,

    #[error("no test cases generated")]
    NoTestCases,
}

/// Validate an extracted object; all-or-nothing.
fn validate(
    fields: Map<String, Value>,
    source: &SourceUnit,
    profile: IoProfile,
) -> std::result::Result<TestSpec, Rejection> {
    let candidate: Candidate = serde_json::from_value(Value::Object(fields))
        .map_err(|e| Rejection::Schema(e.to_string()))?;

    let program_description = candidate
        .program_description
        .filter(|d| !d.trim().is_empty())
        .ok_or(Rejection::MissingDescription)?;
    let test_cases = candidate
        .test_cases
        .filter(|cases| !cases.is_empty())
        .ok_or(Rejection::NoTestCases)?;

    Ok(TestSpec {
        program_description,
        program_type: candidate.program_type.unwrap_or_else(default_program_type),
        difficulty_level: candidate.difficulty_level.unwrap_or_else(default_difficulty),
        test_cases: test_cases.into_iter().map(TestCase::from).collect(),
        potential_edge_cases: candidate.potential_edge_cases.unwrap_or_default(),
        source_file: source.display_path(),
        generation_method: GenerationMethod::LlmAnalysis,
        code_analysis: Some(profile),
    })
}

pub struct TestCaseGenerator<'a, B> {
    client: &'a InferenceClient<B>,
}

impl<'a, B: ChatBackend> TestCaseGenerator<'a, B> {
    pub fn new(client: &'a InferenceClient<B>) -> Self {
        Self { client }
    }

    /// Generate a spec for `source`, falling back on any failure.
    pub async fn generate(&self, source: &SourceUnit) -> TestSpec {
        match self.try_generate(source).await {
            Ok(spec) => {
                info!(
                    cases = spec.test_cases.len(),
                    program_type = %spec.program_type,
                    "generated test cases"
                );
                spec
            }
            Err(rejection) => {
                warn!(reason = %rejection, "using fallback test cases");
                TestSpec::fallback(source.display_path())
            }
        }
    }

    /// Generation without the fallback, for callers that want the reason.
    pub async fn try_generate(&self, source: &SourceUnit) -> std::result::Result<TestSpec, Rejection> {
        let profile = io_profile(&source.text);
        let messages = prompt::build_test_generation(&source.text, &profile);
        let reply = self
            .client
            .invoke(&messages, &DecodingOptions::TEST_GENERATION)
            .await
            .map_err(|e| Rejection::Backend(e.to_string()))?;

        match extract_structured(&reply) {
            Extraction::WellFormed { fields, .. } => validate(fields, source, profile),
            Extraction::Degraded { .. } => Err(Rejection::Unparseable),
        }
    }
}
