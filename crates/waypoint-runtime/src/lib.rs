//! # waypoint-runtime
//!
//! Network half of the Waypoint generation pipeline.
//!
//! This crate talks to OpenAI-compatible chat-completion providers, walks a
//! cascade of models until one answers, and hands the answer to
//! `waypoint-core` for normalization and validation. Whatever happens, the
//! caller gets schema-conformant content back.
//!
//! ## Example
//!
//! ```rust,ignore
//! use waypoint_runtime::{AuxiliaryContext, GenerationPipeline, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_env()?;
//! let pipeline = GenerationPipeline::from_config(&config)?;
//!
//! let outcome = pipeline
//!     .generate_roadmap("Become a data engineer", &AuxiliaryContext::default(), config.parameters)
//!     .await;
//!
//! if outcome.meta.fallback_used {
//!     eprintln!("served static content: {:?}", outcome.meta.reason);
//! }
//! ```

pub mod cascade;
pub mod config;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod request;

pub use cascade::{CascadeError, CascadeOrchestrator, CascadeSuccess, ProviderResult};
pub use config::{ConfigError, ProviderSettings, RuntimeConfig};
pub use pipeline::{GenerationOutcome, GenerationPipeline, GenerationPipelineBuilder, PipelineStage};
pub use providers::{
    ApiCredential, ChatCompletionsProvider, ChatMessage, CompletionConfig, CompletionResponse,
    LlmProvider, ProviderError, ProviderRegistry, RetryPolicy,
};
pub use request::{AuxiliaryContext, GenerationParameters, GenerationRequest, ModelCandidate};

use thiserror::Error;

/// Errors from assembling the runtime.
///
/// Generation itself never fails; these only surface while building a
/// [`GenerationPipeline`].
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No model candidates configured")]
    NoCandidates,

    #[error("No providers registered")]
    NoProviders,
}
