//! Cascade orchestrator.
//!
//! Tries the request's model candidates strictly in order, one at a time,
//! until one returns text. Cheap or free models come first; the secondary
//! provider family sits at the tail of the list, so escalating to it is just
//! reaching those candidates. Every attempt is recorded.

use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::providers::{ChatMessage, ProviderRegistry, TokenUsage};
use crate::request::{GenerationRequest, ModelCandidate};

/// Outcome of one candidate. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResult {
    Success {
        raw_text: String,
        provider: String,
        model: String,
        attempts: u32,
        usage: TokenUsage,
        elapsed: Duration,
    },
    Failure {
        provider: String,
        model: String,
        reason: String,
        message: String,
        attempts: u32,
        elapsed: Duration,
    },
}

impl ProviderResult {
    pub fn provider(&self) -> &str {
        match self {
            ProviderResult::Success { provider, .. } | ProviderResult::Failure { provider, .. } => {
                provider
            }
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderResult::Success { model, .. } | ProviderResult::Failure { model, .. } => model,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ProviderResult::Success { attempts, .. } | ProviderResult::Failure { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProviderResult::Success { .. })
    }
}

impl fmt::Display for ProviderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderResult::Success {
                provider, model, ..
            } => write!(f, "{}/{}: ok", provider, model),
            ProviderResult::Failure {
                provider,
                model,
                reason,
                ..
            } => write!(f, "{}/{}: {}", provider, model, reason),
        }
    }
}

/// Errors from the cascade.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascadeError {
    #[error("All {} candidates failed: {}", .0.len(), summarize(.0))]
    AllModelsFailed(Vec<ProviderResult>),

    #[error("No model candidates configured")]
    NoCandidates,
}

impl CascadeError {
    /// The attempt log, one entry per candidate tried.
    pub fn attempt_log(&self) -> &[ProviderResult] {
        match self {
            CascadeError::AllModelsFailed(log) => log,
            CascadeError::NoCandidates => &[],
        }
    }

    /// Total provider attempts spent.
    pub fn attempts(&self) -> u32 {
        self.attempt_log().iter().map(ProviderResult::attempts).sum()
    }
}

/// One-line summary of an attempt log.
pub fn summarize(log: &[ProviderResult]) -> String {
    log.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The accepted result of a cascade run.
#[derive(Debug, Clone)]
pub struct CascadeSuccess {
    /// Raw text from the winning candidate
    pub raw_text: String,

    /// Provider that answered
    pub provider: String,

    /// Model that answered
    pub model: String,

    /// Every attempt, ending with the success
    pub attempt_log: Vec<ProviderResult>,

    /// Tokens spent by the winning call
    pub usage: TokenUsage,
}

impl CascadeSuccess {
    /// Total provider attempts spent, including failed candidates.
    pub fn attempts(&self) -> u32 {
        self.attempt_log.iter().map(ProviderResult::attempts).sum()
    }
}

/// Walks model candidates in priority order.
///
/// Strictly sequential: at most one provider call is in flight per request,
/// and the first success ends the run.
#[derive(Debug, Clone)]
pub struct CascadeOrchestrator {
    registry: ProviderRegistry,
}

impl CascadeOrchestrator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run the cascade for a request.
    ///
    /// # Returns
    ///
    /// * `Ok(CascadeSuccess)` - Raw text from the first candidate that answered
    /// * `Err(CascadeError::AllModelsFailed)` - Every candidate failed; the log
    ///   holds one entry per candidate
    pub async fn generate(&self, request: &GenerationRequest) -> Result<CascadeSuccess, CascadeError> {
        if request.candidates().is_empty() {
            return Err(CascadeError::NoCandidates);
        }

        let messages = [
            ChatMessage::system(request.system_prompt()),
            ChatMessage::user(request.prompt()),
        ];
        let mut log = Vec::with_capacity(request.candidates().len());

        for (index, candidate) in request.candidates().iter().enumerate() {
            tracing::debug!(
                provider = %candidate.provider,
                model = %candidate.model,
                index,
                "Trying candidate"
            );

            let result = self.try_candidate(candidate, &messages, request).await;
            match result {
                ProviderResult::Success {
                    ref raw_text,
                    ref provider,
                    ref model,
                    ref usage,
                    ..
                } => {
                    tracing::info!(
                        provider = %provider,
                        model = %model,
                        index,
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        total_tokens = usage.total(),
                        "Candidate succeeded"
                    );
                    let (raw_text, provider, model, usage) =
                        (raw_text.clone(), provider.clone(), model.clone(), usage.clone());
                    log.push(result);
                    return Ok(CascadeSuccess {
                        raw_text,
                        provider,
                        model,
                        attempt_log: log,
                        usage,
                    });
                }
                ProviderResult::Failure {
                    ref reason,
                    ref message,
                    ..
                } => {
                    tracing::warn!(
                        provider = %candidate.provider,
                        model = %candidate.model,
                        reason = %reason,
                        error = %message,
                        "Candidate failed, moving to next"
                    );
                    log.push(result);
                }
            }
        }

        Err(CascadeError::AllModelsFailed(log))
    }

    async fn try_candidate(
        &self,
        candidate: &ModelCandidate,
        messages: &[ChatMessage],
        request: &GenerationRequest,
    ) -> ProviderResult {
        let started = Instant::now();

        let outcome = match self.registry.get(&candidate.provider) {
            Ok(provider) => {
                let config = request.parameters().completion_config(&candidate.model);
                provider.complete(messages, &config).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => ProviderResult::Success {
                raw_text: response.content,
                provider: candidate.provider.clone(),
                model: candidate.model.clone(),
                attempts: response.attempts,
                usage: response.usage,
                elapsed: started.elapsed(),
            },
            Err(e) => ProviderResult::Failure {
                provider: candidate.provider.clone(),
                model: candidate.model.clone(),
                reason: e.code().to_string(),
                attempts: e.attempts(),
                message: e.to_string(),
                elapsed: started.elapsed(),
            },
        }
    }
}
