//! LLM provider abstractions for waypoint-runtime.
//!
//! This module defines the trait every provider implements, the request and
//! response types shared between providers and the cascade, and the one
//! concrete implementation: an OpenAI-compatible chat-completions client.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod chat_completions;
mod registry;
mod retry;
pub mod secrets;

pub use chat_completions::ChatCompletionsProvider;
pub use registry::ProviderRegistry;
pub use retry::RetryPolicy;
pub use secrets::{ApiCredential, CredentialSource};

/// Errors from LLM providers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("No credential configured for provider '{0}'")]
    AuthMissing(String),

    #[error("Transient network failure: {0}")]
    NetworkTransient(String),

    #[error("Provider returned no usable content")]
    EmptyResponse,

    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<ProviderError>,
    },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::NetworkTransient(_))
    }

    /// Stable reason code for attempt logs.
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::AuthMissing(_) => "auth_missing",
            ProviderError::NetworkTransient(_) => "network_transient",
            ProviderError::EmptyResponse => "empty_response",
            ProviderError::Exhausted { .. } => "exhausted",
            ProviderError::ApiError { .. } => "api_error",
            ProviderError::NotConfigured(_) => "provider_unavailable",
        }
    }

    /// Attempts this error accounts for.
    pub fn attempts(&self) -> u32 {
        match self {
            ProviderError::Exhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Read timeout for the whole request
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 4000,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Raw generated text
    pub content: String,

    /// Token usage, when the provider reports it
    pub usage: TokenUsage,

    /// Model that answered
    pub model: String,

    /// Attempts spent, including retries
    pub attempts: u32,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Provider abstraction allows swapping LLM backends.
///
/// Implementations own their retry policy: a call either returns text or an
/// error that already accounts for every retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Provider identifier used in candidates and provenance.
    fn name(&self) -> &str;
}
