//! # waypoint-core
//!
//! Deterministic, network-free half of the Waypoint generation pipeline.
//!
//! LLM output arrives as prose with an embedded JSON payload. This crate turns
//! that text into content the rest of the system can trust, or supplies static
//! content when it cannot:
//!
//! 1. [`normalize::extract`] pulls the first-`[`-to-last-`]` (or `{`/`}`)
//!    payload out of the text
//! 2. [`Sanitizer`] repairs enum drift, out-of-range numbers and stray fields
//! 3. Strict JSON Schema validation accepts or rejects the result
//! 4. [`FallbackProvider`] produces schema-conformant content when any of the
//!    above fails
//!
//! ## Example
//!
//! ```rust,ignore
//! use waypoint_core::{extract, sanitize_and_validate, SchemaKind};
//!
//! let schema = SchemaKind::RoadmapModules;
//! let payload = extract(raw_text, schema.container_kind())?;
//! let content = sanitize_and_validate(payload, schema)?;
//! for module in content.roadmap_modules().unwrap_or_default() {
//!     println!("{}. {} ({:?})", module.order, module.title, module.difficulty);
//! }
//! ```

pub mod content;
pub mod fallback;
pub mod normalize;
pub mod provenance;
pub mod schema;

// Re-export main types at crate root
pub use content::{
    ContentBody, Difficulty, Lesson, LessonFormat, LessonSection, ModuleStatus, QuizDifficulty,
    QuizQuestion, RoadmapModule, ValidatedContent, FALLBACK_MARKER,
};
pub use fallback::{FallbackContext, FallbackProvider};
pub use normalize::{extract, ContainerKind, NormalizeError, NormalizedPayload};
pub use provenance::{FallbackReason, GenerationMeta, FALLBACK_MODEL, FALLBACK_PROVIDER};
pub use schema::{
    sanitize_and_validate, Sanitizer, SchemaKind, SynonymError, SynonymTables, ValidationError,
};

use thiserror::Error;

/// Any failure on the path from raw text to validated content.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ProcessError {
    /// Stable reason code for logs and provenance.
    pub fn code(&self) -> &'static str {
        match self {
            ProcessError::Normalize(e) => e.code(),
            ProcessError::Validation(e) => e.code(),
        }
    }

    /// Fallback reason this failure maps to.
    pub fn fallback_reason(&self) -> FallbackReason {
        match self {
            ProcessError::Normalize(e) => FallbackReason::from(e),
            ProcessError::Validation(e) => FallbackReason::from(e),
        }
    }
}

/// Run raw model text through normalization, sanitization and validation.
///
/// # Arguments
///
/// * `raw_text` - Text exactly as the provider returned it
/// * `schema` - Schema the content must satisfy
/// * `sanitizer` - Sanitizer carrying the synonym tables to apply
///
/// # Returns
///
/// * `Ok(ValidatedContent)` - Content ready for use
/// * `Err(ProcessError)` - Which stage rejected the text
pub fn process(
    raw_text: &str,
    schema: SchemaKind,
    sanitizer: &Sanitizer,
) -> Result<ValidatedContent, ProcessError> {
    let payload = extract(raw_text, schema.container_kind())?;
    Ok(sanitizer.sanitize_and_validate(payload, schema)?)
}
