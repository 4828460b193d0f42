//! First-opening to last-closing delimiter extraction.

use serde_json::Value;
use thiserror::Error;

use super::patterns::{strip_code_fences, strip_trailing_commas};
use super::{value_kind, ContainerKind};
use crate::content::FALLBACK_MARKER;

/// Errors from payload extraction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("No {expected} container found in response")]
    NoContainerFound { expected: ContainerKind },

    #[error("Malformed structure: {0}")]
    MalformedStructure(String),
}

impl NormalizeError {
    /// Stable reason code for logs and provenance.
    pub fn code(&self) -> &'static str {
        match self {
            NormalizeError::NoContainerFound { .. } => "no_container_found",
            NormalizeError::MalformedStructure(_) => "malformed_structure",
        }
    }
}

/// An untyped tree pulled out of raw model text.
///
/// Carries no shape guarantee beyond its top-level container kind; it must go
/// through the sanitizer and validator before anything trusts it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    kind: ContainerKind,
    value: Value,
}

impl NormalizedPayload {
    /// Wrap an already-parsed value.
    ///
    /// Fails with `MalformedStructure` when the value is not of `kind`.
    pub fn new(kind: ContainerKind, value: Value) -> Result<Self, NormalizeError> {
        if !kind.matches(&value) {
            return Err(NormalizeError::MalformedStructure(format!(
                "expected top-level {} but found {}",
                kind,
                value_kind(&value)
            )));
        }
        Ok(Self { kind, value })
    }

    /// Container kind of the payload.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Borrow the tree.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Take the tree.
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Extract the structured payload embedded in raw model text.
///
/// The heuristic, in order:
/// 1. Markdown code-fence markers are removed (the fenced text is kept).
/// 2. The text between the FIRST opening delimiter of `kind` and the LAST
///    closing delimiter is sliced out, so preambles ("Here is your
///    roadmap:") and trailing commentary are ignored.
/// 3. The slice is parsed as JSON. If that fails, trailing commas are
///    dropped and the parse is tried once more.
/// 4. The parsed value must have the requested top-level kind.
/// 5. Any `is_fallback` marker is removed. Model text never gets to claim
///    it is static fallback content.
///
/// The heuristic does not balance brackets; prose that itself contains a
/// closing delimiter after the payload makes the slice unparseable and the
/// call fails with `MalformedStructure`.
pub fn extract(raw_text: &str, kind: ContainerKind) -> Result<NormalizedPayload, NormalizeError> {
    let text = strip_code_fences(raw_text);
    let (open, close) = kind.delimiters();

    let start = text
        .find(open)
        .ok_or(NormalizeError::NoContainerFound { expected: kind })?;
    let end = text
        .rfind(close)
        .filter(|end| *end > start)
        .ok_or(NormalizeError::NoContainerFound { expected: kind })?;

    // Both delimiters are ASCII, so these are valid char boundaries.
    let slice = &text[start..=end];

    let mut value = match serde_json::from_str::<Value>(slice) {
        Ok(value) => value,
        Err(strict_err) => {
            tracing::debug!(error = %strict_err, "Strict parse failed, retrying without trailing commas");
            serde_json::from_str::<Value>(&strip_trailing_commas(slice))
                .map_err(|_| NormalizeError::MalformedStructure(strict_err.to_string()))?
        }
    };
    strip_fallback_marker(&mut value);

    NormalizedPayload::new(kind, value)
}

fn strip_fallback_marker(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.remove(FALLBACK_MARKER).is_some() {
                tracing::debug!("Removed fallback marker from model output");
            }
            map.values_mut().for_each(strip_fallback_marker);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_fallback_marker),
        _ => {}
    }
}
