//! Typed content records and the validated-content wrapper.
//!
//! A [`ValidatedContent`] is the only form in which generated content leaves
//! the pipeline. It holds both the canonical JSON tree and typed records
//! converted from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{validate_value, SchemaKind, ValidationError};

/// Field marking every item of static fallback content.
pub const FALLBACK_MARKER: &str = "is_fallback";

/// Difficulty band of a roadmap module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Low,
    #[serde(rename = "Low-Med")]
    LowMed,
    Med,
    #[serde(rename = "Med-High")]
    MedHigh,
    High,
}

/// Learner progress through a roadmap module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Difficulty of a quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizDifficulty {
    Easy,
    Medium,
    Hard,
}

/// Delivery format of a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonFormat {
    Reading,
    Video,
    Exercise,
    Project,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One step of a career roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapModule {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    /// 1-based position in the roadmap
    pub order: u32,
    pub estimated_hours: u32,
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ModuleStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_fallback: bool,
}

/// A four-option multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_answer: u8,
    pub explanation: String,
    pub difficulty: QuizDifficulty,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_fallback: bool,
}

impl QuizQuestion {
    /// Text of the correct option.
    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .get(self.correct_answer as usize)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSection {
    pub heading: String,
    pub body: String,
}

/// A single lesson within a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    pub summary: String,
    pub content_type: LessonFormat,
    pub duration_minutes: u32,
    pub sections: Vec<LessonSection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_takeaways: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_fallback: bool,
}

/// Typed view of validated content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBody {
    RoadmapModules(Vec<RoadmapModule>),
    QuizQuestions(Vec<QuizQuestion>),
    Lesson(Lesson),
}

impl ContentBody {
    fn from_value(schema: SchemaKind, value: &Value) -> Result<Self, serde_json::Error> {
        Ok(match schema {
            SchemaKind::RoadmapModules => {
                ContentBody::RoadmapModules(serde_json::from_value(value.clone())?)
            }
            SchemaKind::QuizQuestions => {
                ContentBody::QuizQuestions(serde_json::from_value(value.clone())?)
            }
            SchemaKind::Lesson => ContentBody::Lesson(serde_json::from_value(value.clone())?),
        })
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            ContentBody::RoadmapModules(modules) => serde_json::to_value(modules),
            ContentBody::QuizQuestions(questions) => serde_json::to_value(questions),
            ContentBody::Lesson(lesson) => serde_json::to_value(lesson),
        }
    }

    /// Schema this body belongs to.
    pub fn schema(&self) -> SchemaKind {
        match self {
            ContentBody::RoadmapModules(_) => SchemaKind::RoadmapModules,
            ContentBody::QuizQuestions(_) => SchemaKind::QuizQuestions,
            ContentBody::Lesson(_) => SchemaKind::Lesson,
        }
    }

    /// Whether the body carries the fallback marker.
    ///
    /// Collections are fallback only when every item is marked.
    pub fn is_fallback(&self) -> bool {
        match self {
            ContentBody::RoadmapModules(modules) => {
                !modules.is_empty() && modules.iter().all(|m| m.is_fallback)
            }
            ContentBody::QuizQuestions(questions) => {
                !questions.is_empty() && questions.iter().all(|q| q.is_fallback)
            }
            ContentBody::Lesson(lesson) => lesson.is_fallback,
        }
    }
}

/// Content guaranteed to conform to its schema.
///
/// Constructed only by validation or by the fallback provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedContent {
    schema: SchemaKind,
    value: Value,
    body: ContentBody,
}

impl ValidatedContent {
    /// Strictly validate a (sanitized) value.
    ///
    /// # Returns
    ///
    /// * `Ok(ValidatedContent)` - Value conforms to `schema`
    /// * `Err(ValidationError::SchemaViolation)` - Any violation, including a
    ///   value the schema accepts but the typed records cannot hold
    pub(crate) fn validate(schema: SchemaKind, value: Value) -> Result<Self, ValidationError> {
        validate_value(&value, schema)?;
        let body = ContentBody::from_value(schema, &value).map_err(|e| {
            ValidationError::SchemaViolation {
                schema,
                details: vec![format!("typed conversion failed: {}", e)],
            }
        })?;
        Ok(Self {
            schema,
            value,
            body,
        })
    }

    /// Wrap statically authored content.
    ///
    /// The caller guarantees the body conforms; fallback tests check every
    /// template against its schema.
    pub(crate) fn from_static(body: ContentBody) -> Self {
        let value = body.to_value().unwrap_or_else(|e| {
            tracing::error!(error = %e, "Static content failed to serialize");
            Value::Null
        });
        Self {
            schema: body.schema(),
            value,
            body,
        }
    }

    /// Schema the content satisfies.
    pub fn schema(&self) -> SchemaKind {
        self.schema
    }

    /// Canonical JSON tree.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Typed records.
    pub fn body(&self) -> &ContentBody {
        &self.body
    }

    /// Consume into the canonical JSON tree.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Whether this is static fallback content.
    pub fn is_fallback(&self) -> bool {
        self.body.is_fallback()
    }

    /// Roadmap modules, if this is roadmap content.
    pub fn roadmap_modules(&self) -> Option<&[RoadmapModule]> {
        match &self.body {
            ContentBody::RoadmapModules(modules) => Some(modules),
            _ => None,
        }
    }

    /// Quiz questions, if this is quiz content.
    pub fn quiz_questions(&self) -> Option<&[QuizQuestion]> {
        match &self.body {
            ContentBody::QuizQuestions(questions) => Some(questions),
            _ => None,
        }
    }

    /// The lesson, if this is lesson content.
    pub fn lesson(&self) -> Option<&Lesson> {
        match &self.body {
            ContentBody::Lesson(lesson) => Some(lesson),
            _ => None,
        }
    }
}

impl Serialize for ValidatedContent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}
