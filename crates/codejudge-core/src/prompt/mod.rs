//! Message rendering for each backend call.
//!
//! Every request is two messages: the stage's fixed instructions as the
//! system message, and a generated context block as the user message. The
//! context is a pure function of its inputs so identical runs send
//! identical prompts.

pub mod templates;

use crate::backend::ChatMessage;
use crate::features::{IoProfile, StructuralFeatures};
use crate::metrics::QuantitativeMetrics;
use crate::stage::{Stage, StageResult};

/// Everything a stage prompt may draw on.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub source: &'a str,
    pub metrics: &'a QuantitativeMetrics,
    pub features: &'a StructuralFeatures,
    /// Results of the stages already run, in execution order
    pub prior: &'a [(Stage, StageResult)],
}

pub fn system_prompt(stage: Stage) -> &'static str {
    match stage {
        Stage::CodeUnderstanding => templates::CODE_UNDERSTANDING,
        Stage::FailureAnalysis => templates::FAILURE_ANALYSIS,
        Stage::EdgeCaseDiscovery => templates::EDGE_CASE_DISCOVERY,
        Stage::ComprehensiveFeedback => templates::COMPREHENSIVE_FEEDBACK,
    }
}

/// Render the `[system, user]` message pair for `stage`.
pub fn build(stage: Stage, ctx: &PromptContext<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(stage)),
        ChatMessage::user(user_context(stage, ctx)),
    ]
}

fn task_line(stage: Stage) -> &'static str {
    match stage {
        Stage::CodeUnderstanding => {
            "Analyse the algorithm, structure and hidden defects of this C program."
        }
        Stage::FailureAnalysis => "Explain why each failed test failed and how to fix it.",
        Stage::EdgeCaseDiscovery => {
            "Find the edge cases, vulnerabilities and production risks the tests missed."
        }
        Stage::ComprehensiveFeedback => {
            "Write the final educational feedback, drawing on every earlier stage."
        }
    }
}

fn user_context(stage: Stage, ctx: &PromptContext<'_>) -> String {
    let metrics = ctx.metrics;
    let mut sections = vec![
        format!("# Task\n{}", task_line(stage)),
        format!(
            "# Program\n- Type: {}\n- Difficulty: {}",
            metrics.program_type, metrics.difficulty_level
        ),
        format!("# Test Results\n{}", metrics_block(metrics)),
    ];

    match stage {
        Stage::CodeUnderstanding => {
            sections.push(format!("# Structural Features\n{}", features_block(ctx.features)));
        }
        Stage::FailureAnalysis => {
            sections.push(format!("# Failed Tests\n{}", bullets(&metrics.failed_tests)));
        }
        Stage::EdgeCaseDiscovery => {
            sections.push(format!("# Structural Features\n{}", features_block(ctx.features)));
            sections.push(format!(
                "# Suspected Edge Cases\n{}",
                bullets(&metrics.potential_edge_cases)
            ));
        }
        Stage::ComprehensiveFeedback => {
            sections.push(format!("# Failed Tests\n{}", bullets(&metrics.failed_tests)));
            sections.push(format!(
                "# Suspected Edge Cases\n{}",
                bullets(&metrics.potential_edge_cases)
            ));
        }
    }

    if !ctx.prior.is_empty() {
        sections.push(format!("# Earlier Analysis\n{}", prior_block(ctx.prior)));
    }

    sections.push(format!("# Source Code\n```c\n{}\n```", ctx.source));
    sections.push("Respond with the JSON object only.".to_string());
    sections.join("\n\n")
}

fn metrics_block(metrics: &QuantitativeMetrics) -> String {
    format!(
        "- Pass rate: {}%\n- Weighted score: {}/100\n- Memory score: {}/100\n- Robustness score: {}/100\n- Tests passed: {}/{}\n- Tests failed: {}\n- Execution time: {} ms",
        metrics.passrate,
        metrics.weighted_score,
        metrics.memory_score,
        metrics.robustness_score,
        metrics.tests_passed,
        metrics.total_tests,
        metrics.tests_failed,
        metrics.execution_time_ms
    )
}

fn features_block(f: &StructuralFeatures) -> String {
    let rows = [
        ("Functions", f.function_count.to_string()),
        ("Custom functions", f.has_custom_functions.to_string()),
        ("Loops", f.loop_count.to_string()),
        ("Nested loops", f.nested_loops.to_string()),
        ("Conditional complexity", f.conditional_complexity.to_string()),
        ("Dynamic allocation", f.dynamic_allocation.to_string()),
        ("Array usage", f.array_usage.to_string()),
        ("Pointer usage", f.pointer_usage.to_string()),
        ("Error checking", f.error_checking.to_string()),
        ("Return value checking", f.return_value_checking.to_string()),
        ("Lines", f.line_count.to_string()),
        ("Comment lines", f.comment_lines.to_string()),
        ("Average function length", f.average_function_length.to_string()),
    ];
    rows.iter()
        .map(|(label, value)| format!("- {}: {}", label, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prior results verbatim, one fenced block per stage.
fn prior_block(prior: &[(Stage, StageResult)]) -> String {
    prior
        .iter()
        .map(|(stage, result)| {
            let body = serde_json::to_string_pretty(result.fields()).unwrap_or_default();
            format!("## {}\n```json\n{}\n```", stage.artifact_key(), body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the single-shot test generation request.
pub fn build_test_generation(source: &str, profile: &IoProfile) -> Vec<ChatMessage> {
    let includes = if profile.includes.is_empty() {
        "(none)".to_string()
    } else {
        profile.includes.join(", ")
    };
    let user = format!(
        "# Task\nGenerate test cases for this C program.\n\n# Pre-analysis\n- Reads input (scanf): {}\n- Writes output (printf): {}\n- Loops: {}\n- Arrays: {}\n- Arithmetic: {}\n- String operations: {}\n- Has main: {}\n- Includes: {}\n\n# Source Code\n```c\n{}\n```\n\nRespond with the JSON object only.",
        profile.has_scanf,
        profile.has_printf,
        profile.has_loops,
        profile.has_arrays,
        profile.has_math,
        profile.has_strings,
        profile.main_function,
        includes,
        source
    );
    vec![
        ChatMessage::system(templates::TEST_GENERATION),
        ChatMessage::user(user),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Role;
    use crate::features::{extract_features, io_profile};
    use serde_json::{json, Map, Value};

    const SOURCE: &str = "#include <stdio.h>\nint main(void) {\n    int a, b;\n    scanf(\"%d %d\", &a, &b);\n    printf(\"%d\\n\", a + b);\n    return 0;\n}\n";

    fn result(value: Value) -> StageResult {
        let fields: Map<String, Value> = serde_json::from_value(value).unwrap();
        StageResult::new(fields)
    }

    fn metrics() -> QuantitativeMetrics {
        QuantitativeMetrics {
            weighted_score: 80.0,
            failed_tests: vec!["Test 3 (edge): overflow".to_string()],
            program_type: "calculator".to_string(),
            ..QuantitativeMetrics::default()
        }
    }

    #[test]
    fn test_two_messages_system_first() {
        let metrics = metrics();
        let features = extract_features(SOURCE);
        let ctx = PromptContext {
            source: SOURCE,
            metrics: &metrics,
            features: &features,
            prior: &[],
        };
        let messages = build(Stage::CodeUnderstanding, &ctx);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, templates::CODE_UNDERSTANDING);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("```c\n#include <stdio.h>"));
        assert!(messages[1].content.contains("- Type: calculator"));
        assert!(messages[1].content.contains("- Functions: 1"));
        assert!(!messages[1].content.contains("# Earlier Analysis"));
    }

    #[test]
    fn test_prior_results_embedded_in_order() {
        let metrics = metrics();
        let features = extract_features(SOURCE);
        let prior = vec![
            (
                Stage::CodeUnderstanding,
                result(json!({"algorithm_analysis": {"time_complexity": "O(1)"}})),
            ),
            (Stage::FailureAnalysis, StageResult::degraded("garbled reply")),
        ];
        let ctx = PromptContext {
            source: SOURCE,
            metrics: &metrics,
            features: &features,
            prior: &prior,
        };
        let user = &build(Stage::EdgeCaseDiscovery, &ctx)[1].content;

        let first = user.find("## stage_1_code_analysis").unwrap();
        let second = user.find("## stage_2_failure_analysis").unwrap();
        let source = user.find("# Source Code").unwrap();
        assert!(first < second && second < source);
        assert!(user.contains("\"time_complexity\": \"O(1)\""));
        assert!(user.contains("\"raw_response\": \"garbled reply\""));
    }

    #[test]
    fn test_failure_stage_lists_failed_tests() {
        let metrics = metrics();
        let features = extract_features(SOURCE);
        let ctx = PromptContext {
            source: SOURCE,
            metrics: &metrics,
            features: &features,
            prior: &[],
        };
        let user = &build(Stage::FailureAnalysis, &ctx)[1].content;
        assert!(user.contains("# Failed Tests\n- Test 3 (edge): overflow"));
        assert_eq!(
            build(Stage::FailureAnalysis, &ctx)[0].content,
            templates::FAILURE_ANALYSIS
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let metrics = metrics();
        let features = extract_features(SOURCE);
        let prior = vec![(Stage::CodeUnderstanding, StageResult::no_failures())];
        let ctx = PromptContext {
            source: SOURCE,
            metrics: &metrics,
            features: &features,
            prior: &prior,
        };
        for stage in Stage::ALL {
            assert_eq!(build(stage, &ctx), build(stage, &ctx));
        }
    }

    #[test]
    fn test_generation_prompt_carries_profile() {
        let messages = build_test_generation(SOURCE, &io_profile(SOURCE));
        assert_eq!(messages[0].content, templates::TEST_GENERATION);
        assert!(messages[1].content.contains("- Reads input (scanf): true"));
        assert!(messages[1].content.contains("- Includes: stdio.h"));
        assert!(messages[1].content.ends_with("Respond with the JSON object only."));
    }
}
