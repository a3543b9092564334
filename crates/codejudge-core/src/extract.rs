//! Recovery of structured data from free-text model replies.
//!
//! Strategies, first success wins:
//! 1. the whole reply parsed as a JSON object
//! 2. the widest `{ ... }` span (first `{` to last `}`)
//! 3. the first ```` ```json ```` fenced object
//! 4. the first untagged ```` ``` ```` fenced object
//!
//! For each pattern only its first match is tried. When nothing parses the
//! reply is kept verbatim in a degraded result. Extraction never fails.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::stage::StageResult;
use crate::text::{compiled, preview};

static GREEDY_OBJECT_RE: OnceLock<Option<Regex>> = OnceLock::new();
static JSON_FENCE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static BARE_FENCE_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Which strategy recovered the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    WholeText,
    GreedyBraces,
    JsonFence,
    BareFence,
}

/// Outcome of extraction; callers must handle both arms.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    WellFormed {
        fields: Map<String, Value>,
        strategy: Strategy,
    },
    Degraded {
        raw_response: String,
    },
}

impl Extraction {
    pub fn is_well_formed(&self) -> bool {
        matches!(self, Extraction::WellFormed { .. })
    }

    pub fn into_stage_result(self) -> StageResult {
        match self {
            Extraction::WellFormed { fields, .. } => StageResult::new(fields),
            Extraction::Degraded { raw_response } => StageResult::degraded(raw_response),
        }
    }
}

/// Extract a stage result from `text`.
pub fn extract(text: &str) -> StageResult {
    extract_structured(text).into_stage_result()
}

pub fn extract_structured(text: &str) -> Extraction {
    if let Some(fields) = parse_object(text.trim()) {
        return well_formed(fields, Strategy::WholeText);
    }

    let candidates: [(Option<&'static Regex>, Strategy); 3] = [
        (
            compiled(&GREEDY_OBJECT_RE, r"(?s)\{.*\}"),
            Strategy::GreedyBraces,
        ),
        (
            compiled(&JSON_FENCE_RE, r"(?s)```json\s*(\{.*?\})\s*```"),
            Strategy::JsonFence,
        ),
        (
            compiled(&BARE_FENCE_RE, r"(?s)```\s*(\{.*?\})\s*```"),
            Strategy::BareFence,
        ),
    ];

    for (re, strategy) in candidates {
        let Some(re) = re else { continue };
        if let Some(fields) = first_match(re, text).and_then(parse_object) {
            return well_formed(fields, strategy);
        }
    }

    warn!(
        chars = text.len(),
        preview = preview(text, 200),
        "could not recover structured data from reply"
    );
    Extraction::Degraded {
        raw_response: text.to_string(),
    }
}

fn well_formed(fields: Map<String, Value>, strategy: Strategy) -> Extraction {
    debug!(?strategy, keys = fields.len(), "recovered structured reply");
    Extraction::WellFormed { fields, strategy }
}

/// Capture group 1 when the pattern has one, else the whole match.
fn first_match<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    let caps = re.captures(text)?;
    caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strategy_of(text: &str) -> Option<Strategy> {
        match extract_structured(text) {
            Extraction::WellFormed { strategy, .. } => Some(strategy),
            Extraction::Degraded { .. } => None,
        }
    }

    #[test]
    fn test_whole_text_object() {
        let result = extract("  {\"algorithm_analysis\": {\"time_complexity\": \"O(n^2)\"}}  ");
        assert!(!result.is_degraded());
        assert_eq!(
            result.get("algorithm_analysis").unwrap()["time_complexity"],
            "O(n^2)"
        );
        assert_eq!(strategy_of("{\"a\": 1}"), Some(Strategy::WholeText));
    }

    #[test]
    fn test_object_wrapped_in_prose() {
        let text = "Here is my analysis:\n{\"verdict\": \"ok\", \"n\": 2}\nHope this helps!";
        assert_eq!(strategy_of(text), Some(Strategy::GreedyBraces));
        assert_eq!(extract(text).get("n"), Some(&json!(2)));
    }

    #[test]
    fn test_bare_object_beats_fenced_array() {
        let text = "Result {\"source\": \"bare\"} -- see also ```json\n[\"not\", \"an\", \"object\"]\n```";
        let result = extract(text);
        assert_eq!(result.get("source"), Some(&json!("bare")));
    }

    #[test]
    fn test_whole_text_object_beats_embedded_fence() {
        let text = "{\"source\": \"bare\", \"note\": \"```json {\\\"source\\\": \\\"fenced\\\"} ```\"}";
        assert_eq!(strategy_of(text), Some(Strategy::WholeText));
        assert_eq!(extract(text).get("source"), Some(&json!("bare")));
    }

    #[test]
    fn test_bare_and_fenced_objects_with_prose() {
        // The greedy span runs from the bare object to the fenced one and fails to parse
        let text = "Result {\"source\": \"bare\"} and finally\n```json\n{\"source\": \"fenced\"}\n```";
        assert_eq!(strategy_of(text), Some(Strategy::JsonFence));
        assert_eq!(extract(text).get("source"), Some(&json!("fenced")));
    }

    #[test]
    fn test_json_fence_when_greedy_span_is_invalid() {
        let text = "Draft: {\"v\": 1, oops} then the final answer:\n```json\n{\"v\": 2}\n```\nand the backup ```\n{\"v\": 3}\n```";
        assert_eq!(strategy_of(text), Some(Strategy::JsonFence));
        assert_eq!(extract(text).get("v"), Some(&json!(2)));
    }

    #[test]
    fn test_bare_fence_as_last_resort() {
        let text = "{ broken\n```\n{\"v\": 3}\n```\n} trailing";
        assert_eq!(strategy_of(text), Some(Strategy::BareFence));
        assert_eq!(extract(text).get("v"), Some(&json!(3)));
    }

    #[test]
    fn test_unparseable_reply_degrades() {
        let text = "I cannot analyze this code, sorry.";
        let result = extract(text);
        assert!(result.is_degraded());
        assert_eq!(result.get("error"), Some(&json!("parse_failed")));
        assert_eq!(result.raw_response(), Some(text));
    }

    #[test]
    fn test_non_object_json_degrades() {
        assert!(extract("[1, 2, 3]").is_degraded());
        assert!(extract("42").is_degraded());
    }

    #[test]
    fn test_degraded_is_idempotent() {
        let first = extract("```\nnot json {at all\n```");
        assert!(first.is_degraded());
        let again = extract(first.raw_response().unwrap());
        assert_eq!(first, again);
    }

    #[test]
    fn test_key_order_preserved() {
        let result = extract("{\"zeta\": 1, \"alpha\": 2, \"mid\": 3}");
        let keys: Vec<&String> = result.fields().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }
}
