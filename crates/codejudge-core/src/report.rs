//! Plain-text rendering of an [`AnalysisRun`].
//!
//! Output depends only on the run; fields render in the order they were
//! produced. Each stage section picks its renderer from the result's
//! [`StageShape`].

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::metrics::MetricsSummary;
use crate::pipeline::{AnalysisRun, FinalAssessment};
use crate::stage::{Stage, StageResult, StageShape};
use crate::text::title_case;

const RULE_WIDTH: usize = 100;
const SUBRULE_WIDTH: usize = 50;

pub const STAGE_FAILED: &str = "Analysis stage failed or returned incomplete data.";
pub const NONE_IDENTIFIED: &str = "None identified.";

type Renderer = fn(&mut String, &Map<String, Value>);

fn renderer(shape: StageShape) -> Option<Renderer> {
    match shape {
        StageShape::Algorithm => Some(render_sections),
        StageShape::FailurePatterns => Some(render_failures),
        StageShape::EdgeCases => Some(render_edge_cases),
        StageShape::Feedback => Some(render_feedback),
        StageShape::Generic => Some(render_generic),
        StageShape::Degraded => None,
    }
}

/// Render the full report.
pub fn render(run: &AnalysisRun) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("{:^width$}\n", "COMPREHENSIVE CODE ANALYSIS REPORT", width = RULE_WIDTH));
    out.push_str(&format!("{:^width$}\n", "Multi-Stage Analysis", width = RULE_WIDTH));
    out.push_str(&format!("{rule}\n\n"));

    render_assessment(&mut out, &run.final_assessment);
    render_metrics(&mut out, &run.quantitative_metrics);

    for stage in Stage::ALL {
        out.push_str(&render_stage(stage.title(), run.stage(stage)));
    }

    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("{:^width$}\n", "END OF COMPREHENSIVE ANALYSIS", width = RULE_WIDTH));
    out.push_str(&format!("{rule}\n"));
    out
}

fn render_assessment(out: &mut String, assessment: &FinalAssessment) {
    out.push_str(&format!("FINAL GRADE: {}\n", assessment.grade));
    out.push_str(&format!("COMPREHENSIVE SCORE: {:.1}/100\n", assessment.score));
    out.push_str(&format!(
        "ANALYSIS CONFIDENCE: {}\n\n",
        assessment.assessment_confidence.to_uppercase()
    ));
}

fn render_metrics(out: &mut String, metrics: &MetricsSummary) {
    out.push_str("QUANTITATIVE METRICS SUMMARY:\n");
    out.push_str(&format!("{}\n", "-".repeat(SUBRULE_WIDTH)));
    out.push_str(&format!(
        "    Test Success Rate: {:.1}% ({}/{} tests)\n",
        metrics.passrate, metrics.tests_passed, metrics.total_tests
    ));
    out.push_str(&format!("    Weighted Test Score: {:.1}%\n", metrics.weighted_score));
    out.push_str(&format!("    Memory Management: {:.1}/100\n", metrics.memory_score));
    out.push_str(&format!("    Robustness Score: {:.1}/100\n", metrics.robustness_score));
    out.push_str(&format!("    Execution Time: {}ms\n\n", metrics.execution_time_ms));
}

/// Render one stage section, heading included.
pub fn render_stage(title: &str, result: &StageResult) -> String {
    let mut out = format!("\n{}\n{}\n", title, "=".repeat(RULE_WIDTH));
    match renderer(StageShape::of(result)) {
        Some(draw) => {
            draw(&mut out, result.fields());
            out.push('\n');
        }
        None => out.push_str(&format!("{STAGE_FAILED}\n\n")),
    }
    out
}

/// Scalars as-is, lists comma-joined, null as `N/A`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn heading(out: &mut String, key: &str) {
    out.push_str(&format!("\n--- {} ---\n", title_case(key)));
}

fn labelled_fields(out: &mut String, fields: &Map<String, Value>, indent: &str) {
    for (key, value) in fields {
        out.push_str(&format!("{}{}: {}\n", indent, title_case(key), display_value(value)));
    }
}

/// One section per top-level key.
fn render_sections(out: &mut String, fields: &Map<String, Value>) {
    for (key, value) in fields {
        heading(out, key);
        match value {
            Value::Object(inner) => labelled_fields(out, inner, "  "),
            Value::Array(items) => {
                for item in items {
                    out.push_str(&format!("- {}\n", display_value(item)));
                }
            }
            scalar => out.push_str(&format!("{}\n", display_value(scalar))),
        }
    }
}

fn render_failures(out: &mut String, fields: &Map<String, Value>) {
    if let Some(patterns) = non_empty_object(fields.get("failure_pattern_analysis")) {
        heading(out, "failure_pattern_analysis");
        labelled_fields(out, patterns, "  ");
    }

    if let Some(details) = non_empty_array(fields.get("detailed_failure_analysis")) {
        heading(out, "detailed_failure_analysis");
        for (i, failure) in details.iter().enumerate() {
            out.push_str(&format!("\n  Failure #{}:\n", i + 1));
            render_item(out, failure, "    ");
        }
    }

    if let Some(effects) = non_empty_object(fields.get("cascading_effects")) {
        heading(out, "cascading_effects");
        labelled_fields(out, effects, "  ");
    }
}

fn render_edge_cases(out: &mut String, fields: &Map<String, Value>) {
    for (key, value) in fields {
        heading(out, key);
        match non_empty_array(Some(value)) {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    out.push_str(&format!("\n  Item #{}:\n", i + 1));
                    render_item(out, item, "    ");
                }
            }
            None => out.push_str(&format!("  {NONE_IDENTIFIED}\n")),
        }
    }
}

fn render_feedback(out: &mut String, fields: &Map<String, Value>) {
    if let Some(summary) = non_empty_object(fields.get("executive_summary")) {
        heading(out, "executive_summary");
        labelled_fields(out, summary, "  ");
    }

    if let Some(improvements) = non_empty_array(fields.get("prioritized_improvements")) {
        heading(out, "prioritized_improvements");
        for item in by_priority(improvements) {
            render_improvement(out, item);
        }
    }

    for key in ["educational_insights", "mentorship_guidance", "detailed_explanations"] {
        if let Some(section) = non_empty_object(fields.get(key)) {
            heading(out, key);
            labelled_fields(out, section, "  ");
        }
    }
}

fn render_improvement(out: &mut String, item: &Value) {
    let field = |key: &str| item.get(key).map_or_else(|| "N/A".to_string(), display_value);
    out.push_str(&format!(
        "\n  Priority {}: {}\n",
        field("priority"),
        field("improvement_area")
    ));
    out.push_str(&format!("    Why Important: {}\n", field("why_important")));
    out.push_str(&format!("    Learning Concepts: {}\n", field("learning_concepts")));
    out.push_str(&format!("    Example:\n```c\n{}\n```\n", field("code_example")));
}

/// Ascending numeric priority; entries without one keep their order at the end.
fn by_priority(items: &[Value]) -> Vec<&Value> {
    let mut sorted: Vec<&Value> = items.iter().collect();
    sorted.sort_by(|a, b| match (priority_of(a), priority_of(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}

fn priority_of(item: &Value) -> Option<f64> {
    match item.get("priority")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn render_item(out: &mut String, item: &Value, indent: &str) {
    match item {
        Value::Object(fields) => labelled_fields(out, fields, indent),
        other => out.push_str(&format!("{}{}\n", indent, display_value(other))),
    }
}

fn render_generic(out: &mut String, fields: &Map<String, Value>) {
    let dump = serde_json::to_string_pretty(fields).unwrap_or_default();
    out.push_str(&format!("{dump}\n"));
}

fn non_empty_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object).filter(|m| !m.is_empty())
}

fn non_empty_array(value: Option<&Value>) -> Option<&Vec<Value>> {
    value.and_then(Value::as_array).filter(|a| !a.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ConversationRecord, MetaInformation};
    use crate::scoring::Grade;
    use serde_json::json;

    fn result(value: Value) -> StageResult {
        let fields: Map<String, Value> = serde_json::from_value(value).unwrap();
        StageResult::new(fields)
    }

    fn run() -> AnalysisRun {
        AnalysisRun {
            meta_information: MetaInformation {
                analysis_timestamp: "2026-01-01T00:00:00+00:00".to_string(),
                source_file: "sum.c".to_string(),
                source_sha256: "00".to_string(),
                model_used: "m".to_string(),
                analysis_stages_completed: 4,
            },
            quantitative_metrics: MetricsSummary {
                passrate: 75.0,
                weighted_score: 80.0,
                memory_score: 90.0,
                robustness_score: 70.0,
                tests_passed: 3,
                tests_failed: 1,
                total_tests: 4,
                execution_time_ms: 1520,
            },
            final_assessment: FinalAssessment {
                grade: Grade::BMinus,
                score: 71.0,
                assessment_confidence: "high".to_string(),
            },
            code_analysis: result(json!({
                "algorithm_analysis": {
                    "time_complexity": "O(n)",
                    "alternative_approaches": ["prefix sums", "closed form"]
                },
                "potential_hidden_bugs": ["overflow on large n"]
            })),
            failure_analysis: StageResult::no_failures(),
            edge_case_analysis: result(json!({
                "critical_missing_edge_cases": [
                    {"case_description": "empty input", "risk_level": "high"}
                ],
                "security_vulnerabilities": []
            })),
            comprehensive_feedback: StageResult::degraded("garbled"),
            conversation_history: ConversationRecord::default(),
        }
    }

    #[test]
    fn test_header_and_metrics() {
        let report = render(&run());
        assert!(report.contains("FINAL GRADE: B-\n"));
        assert!(report.contains("COMPREHENSIVE SCORE: 71.0/100\n"));
        assert!(report.contains("ANALYSIS CONFIDENCE: HIGH\n"));
        assert!(report.contains("    Test Success Rate: 75.0% (3/4 tests)\n"));
        assert!(report.contains("    Execution Time: 1520ms\n"));
        assert!(report.trim_end().ends_with(&"=".repeat(RULE_WIDTH)));
    }

    #[test]
    fn test_stage_sections_in_order() {
        let report = render(&run());
        let positions: Vec<usize> = Stage::ALL
            .iter()
            .map(|stage| report.find(stage.title()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_algorithm_sections() {
        let text = render_stage("T", &run().code_analysis);
        assert!(text.contains("--- Algorithm Analysis ---\n  Time Complexity: O(n)\n"));
        assert!(text.contains("  Alternative Approaches: prefix sums, closed form\n"));
        assert!(text.contains("--- Potential Hidden Bugs ---\n- overflow on large n\n"));
    }

    #[test]
    fn test_degraded_stage() {
        let text = render_stage("T", &StageResult::degraded("x"));
        assert!(text.contains(STAGE_FAILED));
        assert!(render_stage("T", &StageResult::default()).contains(STAGE_FAILED));
    }

    #[test]
    fn test_failure_numbering() {
        let text = render_stage(
            "T",
            &result(json!({
                "failure_pattern_analysis": {"severity_assessment": "moderate"},
                "detailed_failure_analysis": [
                    {"root_cause": "off by one", "fix_complexity": "easy"},
                    {"root_cause": "no null check"}
                ]
            })),
        );
        assert!(text.contains("  Severity Assessment: moderate\n"));
        assert!(text.contains("  Failure #1:\n    Root Cause: off by one\n    Fix Complexity: easy\n"));
        assert!(text.contains("  Failure #2:\n    Root Cause: no null check\n"));
    }

    #[test]
    fn test_edge_cases_numbering_and_empty_lists() {
        let text = render_stage("T", &run().edge_case_analysis);
        assert!(text.contains("  Item #1:\n    Case Description: empty input\n    Risk Level: high\n"));
        assert!(text.contains("--- Security Vulnerabilities ---\n  None identified.\n"));
    }

    #[test]
    fn test_improvements_sorted_by_priority() {
        let text = render_stage(
            "T",
            &result(json!({
                "executive_summary": {"learning_level": "beginner"},
                "prioritized_improvements": [
                    {"improvement_area": "unranked"},
                    {"priority": 2, "improvement_area": "naming"},
                    {"priority": 1, "improvement_area": "bounds checks"}
                ]
            })),
        );
        let first = text.find("Priority 1: bounds checks").unwrap();
        let second = text.find("Priority 2: naming").unwrap();
        let last = text.find("Priority N/A: unranked").unwrap();
        assert!(first < second && second < last);
        assert!(text.contains("  Learning Level: beginner\n"));
    }

    #[test]
    fn test_generic_fallback_dumps_fields() {
        let text = render_stage("T", &result(json!({"verdict": "fine", "n": 1})));
        assert!(text.contains("\"verdict\": \"fine\""));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!(null)), "N/A");
        assert_eq!(display_value(&json!("plain")), "plain");
        assert_eq!(display_value(&json!(["a", 1, true])), "a, 1, true");
        assert_eq!(display_value(&json!(3.5)), "3.5");
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(render(&run()), render(&run()));
    }
}
