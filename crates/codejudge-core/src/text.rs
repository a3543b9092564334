//! Small text helpers shared by the pattern-based modules

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

/// Compile `pattern` once into `cell`. A pattern that fails to compile is
/// logged and treated as matching nothing.
pub(crate) fn compiled(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(error = %e, pattern, "failed to compile pattern");
            None
        }
    })
    .as_ref()
}

/// `fix_complexity` -> `Fix Complexity`
pub fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First `max_chars` characters of `text`, on a char boundary
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
