//! Text patterns shared by the normalizer and the sanitizer.
//!
//! Kept separate from the extraction logic so the heuristics are easy to
//! audit and extend in one place.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Opening markdown fence with an optional language tag (```json, ```JSON, ```).
    pub static ref FENCE_OPEN_PATTERN: Regex = Regex::new(
        r"```[A-Za-z0-9_+-]*[ \t]*"
    ).unwrap();

    /// A comma directly before a closing bracket or brace.
    pub static ref TRAILING_COMMA_PATTERN: Regex = Regex::new(
        r",(\s*[\]}])"
    ).unwrap();

    /// Runs of separators treated as equivalent inside enum tokens.
    pub static ref TOKEN_SEPARATOR_PATTERN: Regex = Regex::new(
        r"[\s_\-]+"
    ).unwrap();
}

/// Remove every markdown code fence marker, keeping the fenced text.
///
/// Language tags directly after an opening fence are removed with it.
pub fn strip_code_fences(text: &str) -> String {
    FENCE_OPEN_PATTERN.replace_all(text, "").into_owned()
}

/// Drop trailing commas before `]` or `}`.
///
/// Only used as a second attempt after a strict parse fails; it does not
/// look inside string literals.
pub fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA_PATTERN.replace_all(text, "$1").into_owned()
}

/// Normalize an enum-like token for table lookup.
///
/// Lower-cases, trims, and collapses whitespace, `_` and `-` runs into a
/// single `-`, so `"In Progress"`, `"in_progress"` and `"in-progress"` match.
pub fn normalize_token(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    TOKEN_SEPARATOR_PATTERN
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_with_language_tag() {
        let text = "intro\n```json\n[1, 2]\n```\noutro";
        assert_eq!(strip_code_fences(text), "intro\n\n[1, 2]\n\noutro");
    }

    #[test]
    fn test_strip_fences_without_language_tag() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "\n{}\n");
    }

    #[test]
    fn test_strip_fences_leaves_plain_text() {
        assert_eq!(strip_code_fences("[1, 2, 3]"), "[1, 2, 3]");
    }

    #[test]
    fn test_strip_trailing_commas() {
        assert_eq!(strip_trailing_commas("[1, 2, ]"), "[1, 2 ]");
        assert_eq!(strip_trailing_commas("{\"a\": 1,\n}"), "{\"a\": 1\n}");
    }

    #[test]
    fn test_normalize_token_separators() {
        assert_eq!(normalize_token("In Progress"), "in-progress");
        assert_eq!(normalize_token("in_progress"), "in-progress");
        assert_eq!(normalize_token("  LOW -- Medium "), "low-medium");
        assert_eq!(normalize_token("Med"), "med");
    }

    #[test]
    fn test_normalize_token_empty() {
        assert_eq!(normalize_token("   "), "");
        assert_eq!(normalize_token("_-_"), "");
    }
}
