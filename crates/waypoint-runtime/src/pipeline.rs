//! The generation pipeline: the single inbound boundary.
//!
//! Per request the pipeline makes exactly one pass:
//!
//! ```text
//! Cascading -> Normalizing -> Sanitizing -> Validating -> Success
//!     \______________\______________\____________\______> FallingBack -> Success (degraded)
//! ```
//!
//! Any failure after the cascade moves straight to fallback; nothing loops
//! back into the cascade. The pipeline never returns an error: every call
//! yields schema-conformant content and a [`GenerationMeta`] saying where it
//! came from.

use serde::Serialize;
use std::fmt;

use waypoint_core::{
    extract, FallbackContext, FallbackProvider, FallbackReason, GenerationMeta, ProcessError,
    Sanitizer, SchemaKind, ValidatedContent,
};

use crate::cascade::{summarize, CascadeError, CascadeOrchestrator};
use crate::config::RuntimeConfig;
use crate::prompts;
use crate::providers::ProviderRegistry;
use crate::request::{AuxiliaryContext, GenerationParameters, GenerationRequest, ModelCandidate};
use crate::RuntimeError;

/// Stage of a request, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Cascading,
    Normalizing,
    Sanitizing,
    Validating,
    Success,
    FallingBack,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Cascading => "cascading",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::Sanitizing => "sanitizing",
            PipelineStage::Validating => "validating",
            PipelineStage::Success => "success",
            PipelineStage::FallingBack => "falling_back",
        };
        f.write_str(name)
    }
}

/// Content plus provenance. The only thing the pipeline returns.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub content: ValidatedContent,
    pub meta: GenerationMeta,
}

impl GenerationOutcome {
    pub fn is_fallback(&self) -> bool {
        self.meta.fallback_used
    }
}

/// Turns learner goals into validated content.
#[derive(Debug, Clone)]
pub struct GenerationPipeline {
    cascade: CascadeOrchestrator,
    sanitizer: Sanitizer,
    fallback: FallbackProvider,
    candidates: Vec<ModelCandidate>,
    defaults: GenerationParameters,
}

impl GenerationPipeline {
    pub fn builder() -> GenerationPipelineBuilder {
        GenerationPipelineBuilder::new()
    }

    /// Build a production pipeline from configuration.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        GenerationPipelineBuilder::new().config(config)?.build()
    }

    /// Default generation parameters.
    pub fn default_parameters(&self) -> GenerationParameters {
        self.defaults
    }

    /// Configured cascade, in priority order.
    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }

    /// Generate roadmap modules for a career goal.
    pub async fn generate_roadmap(
        &self,
        goal: &str,
        aux: &AuxiliaryContext,
        params: GenerationParameters,
    ) -> GenerationOutcome {
        let request = self.request(
            prompts::roadmap_prompt(goal, aux),
            SchemaKind::RoadmapModules,
            params,
        );
        self.run(&request, &FallbackContext::new(goal)).await
    }

    /// Generate quiz questions on a topic.
    pub async fn generate_quiz(
        &self,
        topic: &str,
        aux: &AuxiliaryContext,
        params: GenerationParameters,
    ) -> GenerationOutcome {
        let request = self.request(
            prompts::quiz_prompt(topic, aux),
            SchemaKind::QuizQuestions,
            params,
        );
        self.run(&request, &FallbackContext::new(topic)).await
    }

    /// Generate a lesson for one roadmap module.
    pub async fn generate_lesson(
        &self,
        module_title: &str,
        goal: &str,
        aux: &AuxiliaryContext,
        params: GenerationParameters,
    ) -> GenerationOutcome {
        let request = self.request(
            prompts::lesson_prompt(module_title, goal, aux),
            SchemaKind::Lesson,
            params,
        );
        self.run(&request, &FallbackContext::new(module_title)).await
    }

    fn request(
        &self,
        prompt: String,
        schema: SchemaKind,
        params: GenerationParameters,
    ) -> GenerationRequest {
        GenerationRequest::new(
            prompts::SYSTEM_PROMPT,
            prompt,
            schema,
            params,
            self.candidates.clone(),
        )
    }

    /// Run one request through every stage.
    ///
    /// Never fails. On any failure the outcome holds fallback content for
    /// `request.schema()` and `meta.fallback_used` is true.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        fallback_context: &FallbackContext,
    ) -> GenerationOutcome {
        let schema = request.schema();
        tracing::debug!(stage = %PipelineStage::Cascading, schema = %schema, "Starting generation");

        let success = match self.cascade.generate(request).await {
            Ok(success) => success,
            Err(e) => {
                let detail = match &e {
                    CascadeError::AllModelsFailed(log) => summarize(log),
                    CascadeError::NoCandidates => e.to_string(),
                };
                return self.fall_back(
                    schema,
                    fallback_context,
                    FallbackReason::AllModelsFailed,
                    detail,
                    e.attempts(),
                );
            }
        };
        let attempts = success.attempts();

        match self.process(&success.raw_text, schema) {
            Ok(content) => {
                tracing::info!(
                    stage = %PipelineStage::Success,
                    schema = %schema,
                    provider = %success.provider,
                    model = %success.model,
                    attempts,
                    "Generated content"
                );
                GenerationOutcome {
                    content,
                    meta: GenerationMeta::ai(success.provider, success.model, attempts),
                }
            }
            Err(e) => self.fall_back(
                schema,
                fallback_context,
                e.fallback_reason(),
                format!("{}/{}: {}", success.provider, success.model, e),
                attempts,
            ),
        }
    }

    fn process(&self, raw_text: &str, schema: SchemaKind) -> Result<ValidatedContent, ProcessError> {
        tracing::debug!(stage = %PipelineStage::Normalizing, schema = %schema, "Extracting payload");
        let payload = extract(raw_text, schema.container_kind())?;

        tracing::debug!(stage = %PipelineStage::Sanitizing, schema = %schema, "Sanitizing payload");
        let content = self.sanitizer.sanitize_and_validate(payload, schema);
        tracing::debug!(
            stage = %PipelineStage::Validating,
            schema = %schema,
            valid = content.is_ok(),
            "Validated payload"
        );
        Ok(content?)
    }

    fn fall_back(
        &self,
        schema: SchemaKind,
        context: &FallbackContext,
        reason: FallbackReason,
        detail: String,
        attempts: u32,
    ) -> GenerationOutcome {
        tracing::warn!(
            stage = %PipelineStage::FallingBack,
            schema = %schema,
            reason = %reason,
            detail = %detail,
            attempts,
            "Serving fallback content"
        );
        GenerationOutcome {
            content: self.fallback.fallback(schema, context),
            meta: GenerationMeta::fallback(reason, detail, attempts),
        }
    }
}

/// Builder for [`GenerationPipeline`].
pub struct GenerationPipelineBuilder {
    registry: ProviderRegistry,
    sanitizer: Option<Sanitizer>,
    candidates: Vec<ModelCandidate>,
    defaults: GenerationParameters,
}

impl GenerationPipelineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            sanitizer: None,
            candidates: Vec::new(),
            defaults: GenerationParameters::default(),
        }
    }

    /// Take providers, candidates, parameters and synonym tables from
    /// configuration.
    pub fn config(mut self, config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        self.registry = config.build_registry();
        self.candidates = config.candidates();
        self.defaults = config.parameters;
        self.sanitizer = Some(config.sanitizer()?);
        Ok(self)
    }

    /// Use this provider registry.
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Append a candidate to the cascade.
    pub fn candidate(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.candidates.push(ModelCandidate::new(provider, model));
        self
    }

    /// Use this sanitizer.
    pub fn sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Set default generation parameters.
    pub fn parameters(mut self, parameters: GenerationParameters) -> Self {
        self.defaults = parameters;
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Result<GenerationPipeline, RuntimeError> {
        if self.candidates.is_empty() {
            return Err(RuntimeError::NoCandidates);
        }
        if self.registry.is_empty() {
            return Err(RuntimeError::NoProviders);
        }
        if let Some(missing) = self
            .candidates
            .iter()
            .find(|c| !self.registry.has_provider(&c.provider))
        {
            tracing::warn!(
                provider = %missing.provider,
                model = %missing.model,
                "Candidate names an unregistered provider; it will always fail"
            );
        }

        Ok(GenerationPipeline {
            cascade: CascadeOrchestrator::new(self.registry),
            sanitizer: self.sanitizer.unwrap_or_default(),
            fallback: FallbackProvider::new(),
            candidates: self.candidates,
            defaults: self.defaults,
        })
    }
}

impl Default for GenerationPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::tests::ScriptedProvider;
    use crate::providers::ProviderError;
    use std::sync::Arc;
    use waypoint_core::schema::validate_value;

    const ROADMAP_REPLY: &str = r#"Sure! Here you go:
```json
[
  {"title": "Python", "description": "Language basics", "difficulty": "beginner", "order": 1, "estimated_hours": 30, "topics": ["syntax"]},
  {"title": "SQL", "description": "Querying data", "difficulty": "medium", "order": 2, "estimated_hours": 25, "topics": ["joins"]},
  {"title": "Pipelines", "description": "Moving data", "difficulty": "Advanced", "order": 99, "estimated_hours": 40, "topics": ["airflow"], "status": "done"}
]
```
Hope that helps!"#;

    fn pipeline(provider: Arc<ScriptedProvider>, models: &[&str]) -> GenerationPipeline {
        let mut builder = GenerationPipeline::builder().registry(ProviderRegistry::new().with(provider));
        for model in models {
            builder = builder.candidate("primary", *model);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_first_model_success_is_ai_content() {
        let provider = Arc::new(
            ScriptedProvider::new("primary")
                .reply("a", Ok(ROADMAP_REPLY))
                .reply("b", Ok(ROADMAP_REPLY)),
        );
        let outcome = pipeline(provider.clone(), &["a", "b"])
            .generate_roadmap("Data engineer", &AuxiliaryContext::default(), GenerationParameters::default())
            .await;

        assert!(!outcome.is_fallback());
        assert_eq!(outcome.meta.provider, "primary");
        assert_eq!(outcome.meta.model, "a");
        assert_eq!(outcome.meta.attempts, 1);
        assert_eq!(provider.calls(), 1);

        let modules = outcome.content.roadmap_modules().unwrap();
        assert_eq!(modules.len(), 3);
        assert_eq!(modules[2].order, 20);
        assert_eq!(outcome.content.value()[0]["difficulty"], "Low");
        assert_eq!(outcome.content.value()[2]["status"], "completed");
    }

    #[tokio::test]
    async fn test_all_models_failed_serves_fallback() {
        let provider = Arc::new(
            ScriptedProvider::new("primary")
                .reply("a", Err(ProviderError::NetworkTransient("reset".into())))
                .reply("b", Err(ProviderError::NetworkTransient("reset".into()))),
        );
        let outcome = pipeline(provider.clone(), &["a", "b"])
            .generate_quiz("Statistics", &AuxiliaryContext::default(), GenerationParameters::default())
            .await;

        assert!(outcome.meta.fallback_used);
        assert_eq!(outcome.meta.reason, Some(FallbackReason::AllModelsFailed));
        assert_eq!(outcome.meta.attempts, 2);
        assert_eq!(provider.calls(), 2);
        assert!(outcome.content.is_fallback());
        assert!(validate_value(outcome.content.value(), SchemaKind::QuizQuestions).is_ok());
    }

    #[tokio::test]
    async fn test_prose_without_container_falls_back() {
        let provider = Arc::new(
            ScriptedProvider::new("primary").reply("a", Ok("I'm sorry, I can't produce that.")),
        );
        let outcome = pipeline(provider.clone(), &["a", "b"])
            .generate_roadmap("Chef", &AuxiliaryContext::default(), GenerationParameters::default())
            .await;

        assert!(outcome.meta.fallback_used);
        assert_eq!(outcome.meta.reason, Some(FallbackReason::NoContainerFound));
        // Later stages never loop back into the cascade.
        assert_eq!(provider.calls(), 1);
        assert!(outcome.content.value()[0]["description"]
            .as_str()
            .unwrap()
            .contains("Chef"));
    }

    #[tokio::test]
    async fn test_schema_violation_falls_back() {
        let provider = Arc::new(
            ScriptedProvider::new("primary").reply("a", Ok(r#"[{"title": "Only one"}]"#)),
        );
        let outcome = pipeline(provider, &["a"])
            .generate_roadmap("Pilot", &AuxiliaryContext::default(), GenerationParameters::default())
            .await;

        assert_eq!(outcome.meta.reason, Some(FallbackReason::SchemaViolation));
        assert!(outcome.meta.detail.as_deref().unwrap().starts_with("primary/a"));
        assert_eq!(outcome.meta.provider, "static");
    }

    #[tokio::test]
    async fn test_lesson_object_generated() {
        let reply = r#"{"title": "Joins", "summary": "Combining tables", "content_type": "Lecture", "duration_minutes": "45", "sections": [{"heading": "Inner", "body": "Matching rows only."}]}"#;
        let provider = Arc::new(ScriptedProvider::new("primary").reply("a", Ok(reply)));
        let outcome = pipeline(provider, &["a"])
            .generate_lesson("SQL", "Data analyst", &AuxiliaryContext::default(), GenerationParameters::default())
            .await;

        assert!(!outcome.is_fallback());
        let lesson = outcome.content.lesson().unwrap();
        assert_eq!(lesson.duration_minutes, 45);
        assert_eq!(outcome.content.value()["content_type"], "video");
    }

    #[test]
    fn test_builder_requires_candidates() {
        let result = GenerationPipeline::builder().build();
        assert!(matches!(result, Err(RuntimeError::NoCandidates)));
    }

    #[test]
    fn test_builder_requires_providers() {
        let result = GenerationPipeline::builder().candidate("primary", "a").build();
        assert!(matches!(result, Err(RuntimeError::NoProviders)));
    }

    #[tokio::test]
    async fn test_model_cannot_claim_fallback_marker() {
        let reply = r#"[
          {"title": "A", "description": "a", "difficulty": "Low", "order": 1, "estimated_hours": 5, "topics": ["x"], "is_fallback": true},
          {"title": "B", "description": "b", "difficulty": "Med", "order": 2, "estimated_hours": 5, "topics": ["y"], "is_fallback": true},
          {"title": "C", "description": "c", "difficulty": "High", "order": 3, "estimated_hours": 5, "topics": ["z"], "is_fallback": true}
        ]"#;
        let provider = Arc::new(ScriptedProvider::new("primary").reply("a", Ok(reply)));
        let outcome = pipeline(provider, &["a"])
            .generate_roadmap("Baker", &AuxiliaryContext::default(), GenerationParameters::default())
            .await;

        assert!(!outcome.is_fallback());
        assert!(!outcome.content.is_fallback());
        assert!(outcome.content.value()[0].get("is_fallback").is_none());
    }

    #[tokio::test]
    async fn test_serialized_outcome_omits_diagnostic_detail() {
        let provider = Arc::new(
            ScriptedProvider::new("primary").reply("a", Ok(r#"[{"question": "Only one"}]"#)),
        );
        let outcome = pipeline(provider, &["a"])
            .generate_quiz("Chess", &AuxiliaryContext::default(), GenerationParameters::default())
            .await;

        assert_eq!(outcome.meta.reason, Some(FallbackReason::SchemaViolation));
        assert!(outcome.meta.detail.as_deref().unwrap().starts_with("primary/a"));

        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json["meta"].get("detail").is_none());
        assert_eq!(json["meta"]["reason"], "schema_violation");
    }

    #[test]
    fn test_outcome_serializes_content_and_meta() {
        let outcome = GenerationOutcome {
            content: FallbackProvider::new().fallback(SchemaKind::Lesson, &FallbackContext::new("Art")),
            meta: GenerationMeta::fallback(FallbackReason::AllModelsFailed, "none", 0),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["meta"]["fallback_used"], true);
        assert_eq!(json["content"]["is_fallback"], true);
    }
}
