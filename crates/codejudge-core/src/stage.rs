//! Analysis stages and their structured results.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::backend::DecodingOptions;

/// Marker stored under `error` in a degraded result
pub const PARSE_FAILED: &str = "parse_failed";

/// `severity_assessment` of the synthesized failure analysis
pub const NO_FAILURES_SENTINEL: &str = "No test failures - excellent!";

/// The four analysis passes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CodeUnderstanding,
    FailureAnalysis,
    EdgeCaseDiscovery,
    ComprehensiveFeedback,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::CodeUnderstanding,
        Stage::FailureAnalysis,
        Stage::EdgeCaseDiscovery,
        Stage::ComprehensiveFeedback,
    ];

    /// Name recorded in the conversation history
    pub fn name(self) -> &'static str {
        match self {
            Stage::CodeUnderstanding => "code_understanding",
            Stage::FailureAnalysis => "failure_analysis",
            Stage::EdgeCaseDiscovery => "edge_case_discovery",
            Stage::ComprehensiveFeedback => "comprehensive_feedback",
        }
    }

    /// Key of this stage's result in the persisted analysis
    pub fn artifact_key(self) -> &'static str {
        match self {
            Stage::CodeUnderstanding => "stage_1_code_analysis",
            Stage::FailureAnalysis => "stage_2_failure_analysis",
            Stage::EdgeCaseDiscovery => "stage_3_edge_case_analysis",
            Stage::ComprehensiveFeedback => "stage_4_comprehensive_feedback",
        }
    }

    /// Section heading in the rendered report
    pub fn title(self) -> &'static str {
        match self {
            Stage::CodeUnderstanding => "STAGE 1: ALGORITHM & CODE STRUCTURE ANALYSIS",
            Stage::FailureAnalysis => "STAGE 2: TEST FAILURE ANALYSIS",
            Stage::EdgeCaseDiscovery => "STAGE 3: EDGE CASE & SECURITY ANALYSIS",
            Stage::ComprehensiveFeedback => "STAGE 4: COMPREHENSIVE EDUCATIONAL FEEDBACK",
        }
    }

    pub fn options(self) -> DecodingOptions {
        match self {
            Stage::CodeUnderstanding => DecodingOptions::CODE_UNDERSTANDING,
            _ => DecodingOptions::ANALYSIS,
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::CodeUnderstanding => Some(Stage::FailureAnalysis),
            Stage::FailureAnalysis => Some(Stage::EdgeCaseDiscovery),
            Stage::EdgeCaseDiscovery => Some(Stage::ComprehensiveFeedback),
            Stage::ComprehensiveFeedback => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One stage's structured judgement.
///
/// Either well-formed (the stage's documented schema, as far as the model
/// honoured it) or degraded (`error` plus the verbatim `raw_response`).
/// Key order is the order the model produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageResult(Map<String, Value>);

impl StageResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn degraded(raw_response: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("error".to_string(), Value::String(PARSE_FAILED.to_string()));
        fields.insert(
            "raw_response".to_string(),
            Value::String(raw_response.into()),
        );
        Self(fields)
    }

    /// Canned failure analysis used when no test failed.
    pub fn no_failures() -> Self {
        let value = json!({
            "failure_pattern_analysis": {
                "common_root_causes": [],
                "severity_assessment": NO_FAILURES_SENTINEL,
                "fix_priority": []
            },
            "detailed_failure_analysis": [],
            "cascading_effects": {
                "issues_that_could_cause_multiple_failures": [],
                "hidden_dependencies": []
            }
        });
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }

    /// True when the stage yielded no usable structured data
    pub fn is_degraded(&self) -> bool {
        self.0.contains_key("error")
    }

    pub fn raw_response(&self) -> Option<&str> {
        self.0.get("raw_response").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Copy of this result with one extra top-level field
    pub fn with_field(&self, key: &str, value: Value) -> Self {
        let mut fields = self.0.clone();
        fields.insert(key.to_string(), value);
        Self(fields)
    }
}

/// Rendering shape of a stage result, decided by which well-known key it
/// carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageShape {
    Algorithm,
    FailurePatterns,
    EdgeCases,
    Feedback,
    Generic,
    Degraded,
}

impl StageShape {
    const MARKERS: [(&'static str, StageShape); 4] = [
        ("algorithm_analysis", StageShape::Algorithm),
        ("failure_pattern_analysis", StageShape::FailurePatterns),
        ("critical_missing_edge_cases", StageShape::EdgeCases),
        ("executive_summary", StageShape::Feedback),
    ];

    pub fn of(result: &StageResult) -> StageShape {
        if result.is_empty() || result.is_degraded() {
            return StageShape::Degraded;
        }
        Self::MARKERS
            .iter()
            .find(|(key, _)| result.get(key).is_some())
            .map_or(StageShape::Generic, |(_, shape)| *shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_chain_is_linear() {
        let mut order = vec![Stage::CodeUnderstanding];
        while let Some(next) = order.last().and_then(|s| s.next()) {
            order.push(next);
        }
        assert_eq!(order, Stage::ALL.to_vec());
    }

    #[test]
    fn test_degraded_result() {
        let result = StageResult::degraded("garbled");
        assert!(result.is_degraded());
        assert_eq!(result.get("error"), Some(&json!("parse_failed")));
        assert_eq!(result.raw_response(), Some("garbled"));
        assert_eq!(StageShape::of(&result), StageShape::Degraded);
    }

    #[test]
    fn test_no_failures_sentinel() {
        let result = StageResult::no_failures();
        assert!(!result.is_degraded());
        assert_eq!(
            result.get("failure_pattern_analysis").unwrap()["severity_assessment"],
            NO_FAILURES_SENTINEL
        );
        assert_eq!(StageShape::of(&result), StageShape::FailurePatterns);
    }

    #[test]
    fn test_shape_dispatch_priority() {
        let both: Map<String, Value> = serde_json::from_value(json!({
            "executive_summary": {},
            "algorithm_analysis": {}
        }))
        .unwrap();
        assert_eq!(StageShape::of(&StageResult::new(both)), StageShape::Algorithm);

        let other: Map<String, Value> =
            serde_json::from_value(json!({"verdict": "fine"})).unwrap();
        assert_eq!(StageShape::of(&StageResult::new(other)), StageShape::Generic);
        assert_eq!(StageShape::of(&StageResult::default()), StageShape::Degraded);
    }

    #[test]
    fn test_with_field_copies() {
        let base = StageResult::no_failures();
        let extended = base.with_field("extra", json!(1));
        assert!(base.get("extra").is_none());
        assert_eq!(extended.get("extra"), Some(&json!(1)));
    }
}
