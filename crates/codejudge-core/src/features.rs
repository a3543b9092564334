//! Heuristic code-shape features of C source
//!
//! Everything here is plain pattern matching over the text. Absence of a
//! pattern yields `false`/`0`; nothing in this module can fail.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::compiled;

/// Names that look like functions to a shape pattern but are statements
const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "return", "sizeof", "do"];

const ALLOCATION_CALLS: &[&str] = &["malloc", "calloc", "realloc"];

const STRING_CALLS: &[&str] = &["strlen", "strcpy", "strcmp", "fgets"];

static FUNCTION_RE: OnceLock<Option<Regex>> = OnceLock::new();
static LOOP_RE: OnceLock<Option<Regex>> = OnceLock::new();
static NESTABLE_LOOP_RE: OnceLock<Option<Regex>> = OnceLock::new();
static CONDITIONAL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ERROR_CHECK_RE: OnceLock<Option<Regex>> = OnceLock::new();
static INCLUDE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static LOOP_WORD_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn function_re() -> Option<&'static Regex> {
    compiled(
        &FUNCTION_RE,
        r"\b([A-Za-z_]\w*)[\s\*]+([A-Za-z_]\w*)\s*\([^)]*\)\s*\{",
    )
}

fn loop_re() -> Option<&'static Regex> {
    compiled(&LOOP_RE, r"\bfor\s*\(|\bwhile\s*\(|\bdo\s*\{")
}

fn nestable_loop_re() -> Option<&'static Regex> {
    compiled(&NESTABLE_LOOP_RE, r"\b(?:for|while)\s*\(")
}

fn conditional_re() -> Option<&'static Regex> {
    compiled(
        &CONDITIONAL_RE,
        r"\bif\s*\(|\belse\s+if\s*\(|\bswitch\s*\(",
    )
}

fn error_check_re() -> Option<&'static Regex> {
    compiled(
        &ERROR_CHECK_RE,
        r"\bif\s*\([^)]*==\s*NULL|\bif\s*\([^)]*!=\s*1\)",
    )
}

fn include_re() -> Option<&'static Regex> {
    compiled(&INCLUDE_RE, r"#include\s*<([^>]+)>")
}

fn loop_word_re() -> Option<&'static Regex> {
    compiled(&LOOP_WORD_RE, r"\b(?:for|while|do)\b")
}

/// Flat record of code-shape heuristics, derived once per source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralFeatures {
    pub function_count: usize,
    pub has_custom_functions: bool,
    pub nested_loops: usize,
    pub conditional_complexity: usize,
    pub loop_count: usize,
    pub dynamic_allocation: bool,
    pub array_usage: bool,
    pub pointer_usage: bool,
    pub error_checking: bool,
    pub return_value_checking: bool,
    pub line_count: usize,
    pub comment_lines: usize,
    pub average_function_length: usize,
}

/// Pluggable source of [`StructuralFeatures`].
pub trait FeatureProvider: Send + Sync {
    fn extract(&self, source: &str) -> StructuralFeatures;
}

/// Default provider backed by regular expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternFeatureExtractor;

impl FeatureProvider for PatternFeatureExtractor {
    fn extract(&self, source: &str) -> StructuralFeatures {
        extract_features(source)
    }
}

/// Derive [`StructuralFeatures`] from raw C source.
pub fn extract_features(code: &str) -> StructuralFeatures {
    let functions = function_names(code);
    let function_count = functions.len();
    let line_count = code.split('\n').count();

    StructuralFeatures {
        function_count,
        has_custom_functions: functions.iter().any(|name| name != "main"),
        nested_loops: count_nested_loops(code),
        conditional_complexity: count_matches(conditional_re(), code),
        loop_count: count_matches(loop_re(), code),
        dynamic_allocation: ALLOCATION_CALLS.iter().any(|call| code.contains(call)),
        array_usage: code.contains('[') && code.contains(']'),
        pointer_usage: code.contains('*') && (code.contains("char *") || code.contains("int *")),
        error_checking: error_check_re().is_some_and(|re| re.is_match(code)),
        return_value_checking: code.contains("scanf") && code.contains("if"),
        line_count,
        comment_lines: code
            .split('\n')
            .filter(|line| line.contains("//") || line.contains("/*"))
            .count(),
        average_function_length: line_count / function_count.max(1),
    }
}

fn count_matches(re: Option<&Regex>, code: &str) -> usize {
    re.map_or(0, |re| re.find_iter(code).count())
}

/// Names of everything shaped like `type name(...) {` that is not a statement.
fn function_names(code: &str) -> Vec<String> {
    let Some(re) = function_re() else {
        return Vec::new();
    };

    re.captures_iter(code)
        .filter_map(|cap| {
            let ret = cap.get(1)?.as_str();
            let name = cap.get(2)?.as_str();
            if CONTROL_KEYWORDS.contains(&name) || ret == "else" || ret == "return" {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

/// A loop counts as nested when another loop keyword starts before the
/// first closing brace after it.
fn count_nested_loops(code: &str) -> usize {
    let Some(re) = nestable_loop_re() else {
        return 0;
    };

    let starts: Vec<(usize, usize)> = re.find_iter(code).map(|m| (m.start(), m.end())).collect();

    starts
        .iter()
        .filter(|(_, end)| {
            let span_end = code[*end..]
                .find('}')
                .map_or(code.len(), |offset| end + offset);
            starts
                .iter()
                .any(|(other_start, _)| *other_start >= *end && *other_start < span_end)
        })
        .count()
}

/// Lightweight I/O profile used to steer test-case generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoProfile {
    pub has_scanf: bool,
    pub has_printf: bool,
    pub has_loops: bool,
    pub has_arrays: bool,
    pub has_math: bool,
    pub has_strings: bool,
    pub main_function: bool,
    pub includes: Vec<String>,
}

pub fn io_profile(code: &str) -> IoProfile {
    IoProfile {
        has_scanf: code.contains("scanf"),
        has_printf: code.contains("printf"),
        has_loops: loop_word_re().is_some_and(|re| re.is_match(code)),
        has_arrays: code.contains('[') && code.contains(']'),
        has_math: code.chars().any(|c| "+-*/%".contains(c)),
        has_strings: code.contains("char") && STRING_CALLS.iter().any(|call| code.contains(call)),
        main_function: code.contains("int main"),
        includes: include_re().map_or_else(Vec::new, |re| {
            re.captures_iter(code)
                .filter_map(|cap| cap.get(1).map(|m| m.as_str().trim().to_string()))
                .collect()
        }),
    }
}
