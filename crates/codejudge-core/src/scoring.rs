//! Final score and letter grade.
//!
//! The base is the mean of the weighted, memory and robustness scores from
//! the test run. The final stage's judgement then shifts it: learning level
//! bonus, critical-issue penalty, and per-vulnerability penalties. The
//! result is clamped to `0..=100` and mapped through a fixed step table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metrics::QuantitativeMetrics;
use crate::stage::{Stage, StageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "F")]
    F,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

/// Inclusive lower bounds, highest first
const GRADE_STEPS: [(f64, Grade); 10] = [
    (95.0, Grade::APlus),
    (90.0, Grade::A),
    (85.0, Grade::AMinus),
    (80.0, Grade::BPlus),
    (75.0, Grade::B),
    (70.0, Grade::BMinus),
    (65.0, Grade::CPlus),
    (60.0, Grade::C),
    (55.0, Grade::CMinus),
    (50.0, Grade::D),
];

impl Grade {
    pub fn from_score(score: f64) -> Grade {
        GRADE_STEPS
            .iter()
            .find(|(floor, _)| score >= *floor)
            .map_or(Grade::F, |(_, grade)| *grade)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ADVANCED_BONUS: f64 = 5.0;
const INTERMEDIATE_BONUS: f64 = 2.0;
const MANY_CRITICAL_ISSUES_PENALTY: f64 = 15.0;
const SOME_CRITICAL_ISSUES_PENALTY: f64 = 8.0;
const CRITICAL_VULNERABILITY_PENALTY: f64 = 15.0;
const VULNERABILITY_PENALTY: f64 = 3.0;

/// Score a run. Missing or mistyped fields count as neutral.
pub fn score(metrics: &QuantitativeMetrics, final_stage: &StageResult) -> (Grade, f64) {
    let base = (metrics.weighted_score + metrics.memory_score + metrics.robustness_score) / 3.0;
    let total = (base + adjustments(final_stage)).clamp(0.0, 100.0);
    (Grade::from_score(total), total)
}

fn adjustments(final_stage: &StageResult) -> f64 {
    let summary = final_stage.get("executive_summary");
    let mut delta = 0.0;

    let level = summary
        .and_then(|s| s.get("learning_level"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    if level.contains("advanced") {
        delta += ADVANCED_BONUS;
    } else if level.contains("intermediate") {
        delta += INTERMEDIATE_BONUS;
    }

    let critical_issues = summary
        .and_then(|s| s.get("critical_issues"))
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if critical_issues > 3 {
        delta -= MANY_CRITICAL_ISSUES_PENALTY;
    } else if critical_issues > 1 {
        delta -= SOME_CRITICAL_ISSUES_PENALTY;
    }

    for vulnerability in vulnerabilities(final_stage) {
        if is_critical(vulnerability) {
            delta -= CRITICAL_VULNERABILITY_PENALTY;
        }
        delta -= VULNERABILITY_PENALTY;
    }

    delta
}

/// Top-level list first, then the embedded edge-case stage.
fn vulnerabilities(final_stage: &StageResult) -> &[Value] {
    final_stage
        .get("security_vulnerabilities")
        .and_then(Value::as_array)
        .or_else(|| {
            final_stage
                .get(Stage::EdgeCaseDiscovery.artifact_key())
                .and_then(|edge| edge.get("security_vulnerabilities"))
                .and_then(Value::as_array)
        })
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn is_critical(vulnerability: &Value) -> bool {
    vulnerability
        .get("severity")
        .and_then(Value::as_str)
        .is_some_and(|severity| severity.trim().eq_ignore_ascii_case("critical"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn result(value: Value) -> StageResult {
        let fields: Map<String, Value> = serde_json::from_value(value).unwrap();
        StageResult::new(fields)
    }

    fn metrics(weighted: f64, memory: f64, robustness: f64) -> QuantitativeMetrics {
        QuantitativeMetrics {
            weighted_score: weighted,
            memory_score: memory,
            robustness_score: robustness,
            ..QuantitativeMetrics::default()
        }
    }

    #[test]
    fn test_grade_boundaries_are_inclusive() {
        assert_eq!(Grade::from_score(90.0), Grade::A);
        assert_eq!(Grade::from_score(89.999), Grade::AMinus);
        assert_eq!(Grade::from_score(85.0), Grade::AMinus);
        assert_eq!(Grade::from_score(84.999), Grade::BPlus);
        assert_eq!(Grade::from_score(95.0), Grade::APlus);
        assert_eq!(Grade::from_score(50.0), Grade::D);
        assert_eq!(Grade::from_score(49.99), Grade::F);
    }

    #[test]
    fn test_grade_table_is_monotone() {
        let mut previous = Grade::F;
        for tenth in 0..=1000 {
            let grade = Grade::from_score(f64::from(tenth) / 10.0);
            assert!(grade >= previous);
            previous = grade;
        }
    }

    #[test]
    fn test_extremes_without_adjustments() {
        let empty = StageResult::default();
        assert_eq!(score(&metrics(0.0, 0.0, 0.0), &empty), (Grade::F, 0.0));
        assert_eq!(score(&metrics(100.0, 100.0, 100.0), &empty), (Grade::APlus, 100.0));
    }

    #[test]
    fn test_intermediate_with_issues_and_one_vulnerability() {
        let final_stage = result(json!({
            "executive_summary": {
                "learning_level": "intermediate",
                "critical_issues": ["no bounds check", "leaks buffer"]
            },
            "security_vulnerabilities": [
                {"vulnerability_type": "buffer overflow", "severity": "high"}
            ]
        }));
        let (grade, total) = score(&metrics(80.0, 90.0, 70.0), &final_stage);
        assert_eq!(total, 71.0);
        assert_eq!(grade, Grade::BMinus);
        assert_eq!(grade.to_string(), "B-");
    }

    #[test]
    fn test_advanced_bonus_is_case_insensitive() {
        let final_stage = result(json!({"executive_summary": {"learning_level": "Advanced"}}));
        assert_eq!(score(&metrics(60.0, 60.0, 60.0), &final_stage).1, 65.0);
    }

    #[test]
    fn test_many_critical_issues() {
        let final_stage = result(json!({
            "executive_summary": {"critical_issues": ["a", "b", "c", "d"]}
        }));
        assert_eq!(score(&metrics(60.0, 60.0, 60.0), &final_stage).1, 45.0);
    }

    #[test]
    fn test_vulnerabilities_from_embedded_edge_stage() {
        let final_stage = result(json!({
            "stage_3_edge_case_analysis": {
                "security_vulnerabilities": [
                    {"severity": " CRITICAL "},
                    {"severity": "low"}
                ]
            }
        }));
        // -15 -3 for the critical one, -3 for the low one
        assert_eq!(score(&metrics(90.0, 90.0, 90.0), &final_stage).1, 69.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let final_stage = result(json!({
            "security_vulnerabilities": [
                {"severity": "critical"}, {"severity": "critical"}
            ]
        }));
        assert_eq!(score(&metrics(10.0, 10.0, 10.0), &final_stage), (Grade::F, 0.0));
    }

    #[test]
    fn test_degraded_final_stage_is_neutral() {
        let degraded = StageResult::degraded("oops");
        assert_eq!(score(&metrics(75.0, 75.0, 75.0), &degraded), (Grade::B, 75.0));
    }

    #[test]
    fn test_grade_serializes_as_letter() {
        assert_eq!(serde_json::to_value(Grade::APlus).unwrap(), json!("A+"));
        assert_eq!(serde_json::to_value(Grade::CMinus).unwrap(), json!("C-"));
    }
}
