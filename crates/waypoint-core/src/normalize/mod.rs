//! Response normalization.
//!
//! LLM providers answer with prose. This module pulls the structured payload
//! (a JSON array or object) out of that prose so it can be sanitized and
//! validated. The extraction heuristic is intentionally lenient; see
//! [`extract`] for the exact rules.

mod extract;
pub mod patterns;

pub use extract::{extract, NormalizeError, NormalizedPayload};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Top-level container a schema expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// A JSON array, delimited by `[` and `]`
    Array,
    /// A JSON object, delimited by `{` and `}`
    Object,
}

impl ContainerKind {
    /// Opening and closing delimiters.
    pub fn delimiters(&self) -> (char, char) {
        match self {
            ContainerKind::Array => ('[', ']'),
            ContainerKind::Object => ('{', '}'),
        }
    }

    /// Whether a parsed value has this top-level kind.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ContainerKind::Array => value.is_array(),
            ContainerKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Array => write!(f, "array"),
            ContainerKind::Object => write!(f, "object"),
        }
    }
}

/// Human-readable name of a JSON value's kind, for diagnostics.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
