//! Embedded JSON Schema documents and their compiled validators.
//!
//! Schemas live in `schemas/` at the workspace root and are compiled into the
//! binary. Each is parsed and compiled once, on first use.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::{SchemaKind, ValidationError};

const ROADMAP_MODULES_SCHEMA_JSON: &str =
    include_str!("../../../../schemas/roadmap_modules.schema.json");
const QUIZ_QUESTIONS_SCHEMA_JSON: &str =
    include_str!("../../../../schemas/quiz_questions.schema.json");
const LESSON_SCHEMA_JSON: &str = include_str!("../../../../schemas/lesson.schema.json");

/// Parsed schema documents (initialized once, reused).
static DOCUMENTS: OnceLock<Result<BTreeMap<SchemaKind, Value>, String>> = OnceLock::new();

/// Compiled validators (initialized once, reused).
static COMPILED: OnceLock<Result<BTreeMap<SchemaKind, jsonschema::Validator>, String>> =
    OnceLock::new();

fn raw_document(kind: SchemaKind) -> &'static str {
    match kind {
        SchemaKind::RoadmapModules => ROADMAP_MODULES_SCHEMA_JSON,
        SchemaKind::QuizQuestions => QUIZ_QUESTIONS_SCHEMA_JSON,
        SchemaKind::Lesson => LESSON_SCHEMA_JSON,
    }
}

fn documents() -> Result<&'static BTreeMap<SchemaKind, Value>, ValidationError> {
    let result = DOCUMENTS.get_or_init(|| {
        let mut docs = BTreeMap::new();
        for kind in SchemaKind::ALL {
            let value: Value = serde_json::from_str(raw_document(kind))
                .map_err(|e| format!("Invalid {} schema JSON: {}", kind, e))?;
            docs.insert(kind, value);
        }
        Ok(docs)
    });

    result
        .as_ref()
        .map_err(|e| ValidationError::SchemaUnavailable(e.clone()))
}

fn validators() -> Result<&'static BTreeMap<SchemaKind, jsonschema::Validator>, ValidationError> {
    let docs = documents()?;
    let result = COMPILED.get_or_init(|| {
        let mut compiled = BTreeMap::new();
        for (kind, doc) in docs {
            let validator = jsonschema::options()
                .build(doc)
                .map_err(|e| format!("Failed to compile {} schema: {}", kind, e))?;
            compiled.insert(*kind, validator);
        }
        Ok(compiled)
    });

    result
        .as_ref()
        .map_err(|e| ValidationError::SchemaUnavailable(e.clone()))
}

/// Get the parsed schema document for a kind.
///
/// The sanitizer walks this document to find enum, default and range
/// declarations.
pub fn schema_document(kind: SchemaKind) -> Result<&'static Value, ValidationError> {
    documents()?
        .get(&kind)
        .ok_or_else(|| ValidationError::SchemaUnavailable(kind.to_string()))
}

/// Validate a JSON value against a schema.
///
/// # Returns
///
/// * `Ok(())` - Value conforms
/// * `Err(ValidationError::SchemaViolation)` - Every violation found, each
///   with the JSON pointer of the offending instance
pub fn validate_value(value: &Value, kind: SchemaKind) -> Result<(), ValidationError> {
    let validator = validators()?
        .get(&kind)
        .ok_or_else(|| ValidationError::SchemaUnavailable(kind.to_string()))?;

    let details: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at '{}'", e, e.instance_path))
        .collect();

    if details.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaViolation {
            schema: kind,
            details,
        })
    }
}

/// Check if a value is valid against a schema.
///
/// Use [`validate_value`] for detailed error messages.
pub fn is_valid(value: &Value, kind: SchemaKind) -> bool {
    validators()
        .ok()
        .and_then(|v| v.get(&kind))
        .map(|v| v.is_valid(value))
        .unwrap_or(false)
}
