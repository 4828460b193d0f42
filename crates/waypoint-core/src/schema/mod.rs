//! Schema-driven sanitization and validation.
//!
//! Each [`SchemaKind`] is backed by an embedded JSON Schema document. The
//! document is the single source of truth for:
//! - structural requirements (required fields, array lengths, nesting)
//! - canonical enum values and their defaults
//! - numeric ranges
//!
//! Sanitization is tolerant and never fails. Validation is strict: any
//! violation left after sanitization rejects the whole payload.

mod registry;
mod sanitizer;
mod synonyms;

pub use registry::{is_valid, schema_document, validate_value};
pub use sanitizer::Sanitizer;
pub use synonyms::{SynonymError, SynonymTables};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::content::ValidatedContent;
use crate::normalize::{ContainerKind, NormalizedPayload};

/// Named schemas generated content must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Ordered list of roadmap modules for a career goal
    RoadmapModules,
    /// List of multiple-choice quiz questions
    QuizQuestions,
    /// A single lesson with sections
    Lesson,
}

impl SchemaKind {
    /// Every schema, in declaration order.
    pub const ALL: [SchemaKind; 3] = [
        SchemaKind::RoadmapModules,
        SchemaKind::QuizQuestions,
        SchemaKind::Lesson,
    ];

    /// Stable identifier, also the key in synonym tables.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::RoadmapModules => "roadmap_modules",
            SchemaKind::QuizQuestions => "quiz_questions",
            SchemaKind::Lesson => "lesson",
        }
    }

    /// Top-level container the normalizer must find.
    pub fn container_kind(&self) -> ContainerKind {
        match self {
            SchemaKind::RoadmapModules | SchemaKind::QuizQuestions => ContainerKind::Array,
            SchemaKind::Lesson => ContainerKind::Object,
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SchemaKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "roadmap_modules" | "roadmap" | "modules" => Ok(SchemaKind::RoadmapModules),
            "quiz_questions" | "quiz" | "questions" => Ok(SchemaKind::QuizQuestions),
            "lesson" => Ok(SchemaKind::Lesson),
            other => Err(ValidationError::SchemaUnavailable(format!(
                "unknown schema '{}'",
                other
            ))),
        }
    }
}

/// Errors from validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Schema violation in {schema}: {}", .details.join("; "))]
    SchemaViolation {
        schema: SchemaKind,
        details: Vec<String>,
    },

    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),
}

impl ValidationError {
    /// Stable reason code for logs and provenance.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::SchemaViolation { .. } => "schema_violation",
            ValidationError::SchemaUnavailable(_) => "schema_unavailable",
        }
    }
}

/// Sanitize a normalized payload with the built-in synonym tables, then
/// validate it.
///
/// See [`Sanitizer::sanitize_and_validate`] to use custom tables.
pub fn sanitize_and_validate(
    payload: NormalizedPayload,
    schema: SchemaKind,
) -> Result<ValidatedContent, ValidationError> {
    Sanitizer::default().sanitize_and_validate(payload, schema)
}
