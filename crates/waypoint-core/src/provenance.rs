//! Provenance of generated content.
//!
//! Every result the pipeline returns carries a [`GenerationMeta`] recording
//! where the content came from, so consumers can tell AI output from static
//! fallback without inspecting the content itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::NormalizeError;
use crate::schema::ValidationError;

/// Provider name recorded for static fallback content.
pub const FALLBACK_PROVIDER: &str = "static";

/// Model name recorded for static fallback content.
pub const FALLBACK_MODEL: &str = "fallback";

/// Why the pipeline served fallback content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Every candidate in the cascade failed
    AllModelsFailed,
    /// A provider answered but no container delimiters were found
    NoContainerFound,
    /// A container was found but did not parse
    MalformedStructure,
    /// The payload parsed but failed validation after sanitization
    SchemaViolation,
    /// Static content was asked for directly; no model was tried
    Requested,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::AllModelsFailed => "all_models_failed",
            FallbackReason::NoContainerFound => "no_container_found",
            FallbackReason::MalformedStructure => "malformed_structure",
            FallbackReason::SchemaViolation => "schema_violation",
            FallbackReason::Requested => "requested",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&NormalizeError> for FallbackReason {
    fn from(err: &NormalizeError) -> Self {
        match err {
            NormalizeError::NoContainerFound { .. } => FallbackReason::NoContainerFound,
            NormalizeError::MalformedStructure(_) => FallbackReason::MalformedStructure,
        }
    }
}

impl From<&ValidationError> for FallbackReason {
    fn from(_: &ValidationError) -> Self {
        FallbackReason::SchemaViolation
    }
}

/// Provenance record attached to every pipeline result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMeta {
    /// Provider that produced the content, or `static`
    pub provider: String,

    /// Model that produced the content, or `fallback`
    pub model: String,

    /// True exactly when the content is static fallback
    pub fallback_used: bool,

    /// Why fallback was used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,

    /// Diagnostic detail for logs. May hold raw provider error text, so it
    /// is never serialized.
    #[serde(default, skip_serializing)]
    pub detail: Option<String>,

    /// Provider attempts made by the cascade
    pub attempts: u32,

    /// When the result was produced
    pub generated_at: DateTime<Utc>,
}

impl GenerationMeta {
    /// Provenance for content produced by a model.
    pub fn ai(provider: impl Into<String>, model: impl Into<String>, attempts: u32) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            fallback_used: false,
            reason: None,
            detail: None,
            attempts,
            generated_at: Utc::now(),
        }
    }

    /// Provenance for static fallback content.
    pub fn fallback(reason: FallbackReason, detail: impl Into<String>, attempts: u32) -> Self {
        Self {
            provider: FALLBACK_PROVIDER.to_string(),
            model: FALLBACK_MODEL.to_string(),
            fallback_used: true,
            reason: Some(reason),
            detail: Some(detail.into()),
            attempts,
            generated_at: Utc::now(),
        }
    }
}
