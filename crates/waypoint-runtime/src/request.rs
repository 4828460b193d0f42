//! Generation requests.
//!
//! A [`GenerationRequest`] is built once per call and never mutated: the
//! pipeline reads it, the cascade walks its candidates in order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use waypoint_core::SchemaKind;

use crate::providers::CompletionConfig;

/// Sampling and transport parameters for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    /// Sampling temperature
    pub temperature: f32,

    /// Maximum output tokens
    pub max_tokens: u32,

    /// Read timeout per provider call
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4000,
            timeout: Duration::from_secs(60),
        }
    }
}

impl GenerationParameters {
    /// Completion config for one model.
    pub fn completion_config(&self, model: &str) -> CompletionConfig {
        CompletionConfig {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }
}

/// Durations as humantime strings ("1m 30s").
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Learner context interpolated into prompts.
///
/// Never changes which schema the output must satisfy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryContext {
    /// University course the learner is enrolled in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university_course: Option<String>,

    /// Budget tier for paid resources (e.g. "free", "low", "any")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_tier: Option<String>,

    /// Self-reported experience level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

impl AuxiliaryContext {
    pub fn is_empty(&self) -> bool {
        self.university_course.is_none()
            && self.budget_tier.is_none()
            && self.experience_level.is_none()
    }
}

/// One entry in the cascade: a model served by a named provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCandidate {
    /// Provider id, resolved through the provider registry
    pub provider: String,

    /// Model id passed to the provider
    pub model: String,
}

impl ModelCandidate {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for ModelCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Everything needed to generate one piece of content.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    system_prompt: String,
    prompt: String,
    schema: SchemaKind,
    parameters: GenerationParameters,
    candidates: Vec<ModelCandidate>,
}

impl GenerationRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        prompt: impl Into<String>,
        schema: SchemaKind,
        parameters: GenerationParameters,
        candidates: Vec<ModelCandidate>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            schema,
            parameters,
            candidates,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn schema(&self) -> SchemaKind {
        self.schema
    }

    pub fn parameters(&self) -> &GenerationParameters {
        &self.parameters
    }

    /// Candidates in priority order.
    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }
}
