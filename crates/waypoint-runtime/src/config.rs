//! Runtime configuration from the process environment.
//!
//! Read once at startup and passed explicitly to whatever needs it. A missing
//! API key is not a configuration error: the provider reports `AuthMissing`
//! the first time it is used. Malformed values are.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use waypoint_core::{Sanitizer, SynonymError, SynonymTables};

use crate::providers::{ApiCredential, ChatCompletionsProvider, ProviderRegistry, RetryPolicy};
use crate::request::{GenerationParameters, ModelCandidate};

pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

pub const DEFAULT_PRIMARY_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_SECONDARY_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Free-tier models tried first, in order.
pub const DEFAULT_MODEL_CASCADE: &[&str] = &[
    "meta-llama/llama-3.3-70b-instruct:free",
    "deepseek/deepseek-chat-v3-0324:free",
    "google/gemini-2.0-flash-exp:free",
    "mistralai/mistral-7b-instruct:free",
];

pub const DEFAULT_SECONDARY_MODELS: &[&str] = &["llama-3.3-70b-versatile"];

/// Errors from reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load synonym tables: {0}")]
    Synonyms(#[from] SynonymError),
}

/// One provider family: endpoint, key, models and retry policy.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Provider id recorded in provenance
    pub id: String,
    pub base_url: String,
    pub credential: Option<ApiCredential>,
    /// Models in priority order
    pub models: Vec<String>,
    pub retry: RetryPolicy,
}

impl ProviderSettings {
    /// Build the HTTP provider for this family.
    pub fn build_provider(&self, connect_timeout: Duration) -> ChatCompletionsProvider {
        match &self.credential {
            Some(credential) => tracing::debug!(
                provider = %self.id,
                credential = credential.name(),
                source = %credential.source(),
                "Credential configured"
            ),
            None => tracing::warn!(
                provider = %self.id,
                "No API key configured; this provider's models will be skipped"
            ),
        }
        ChatCompletionsProvider::new(&self.id, &self.base_url, self.credential.clone())
            .with_retry(self.retry)
            .with_connect_timeout(connect_timeout)
    }

    fn candidates(&self) -> impl Iterator<Item = ModelCandidate> + '_ {
        self.models
            .iter()
            .map(move |model| ModelCandidate::new(&self.id, model))
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Free/cheap models, tried first
    pub primary: ProviderSettings,

    /// Escalation target once the primary family is exhausted
    pub secondary: ProviderSettings,

    /// Default generation parameters
    pub parameters: GenerationParameters,

    /// Connect timeout, distinct from the read timeout in `parameters`
    pub connect_timeout: Duration,

    /// Synonym overrides layered on the built-in tables
    pub synonyms_file: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a key lookup.
    ///
    /// Absent keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backoff_base = duration(&lookup, "WAYPOINT_BACKOFF_BASE", Duration::from_secs(1))?;

        let primary = ProviderSettings {
            id: "openrouter".to_string(),
            base_url: lookup("WAYPOINT_PRIMARY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PRIMARY_BASE_URL.to_string()),
            credential: ApiCredential::from_lookup(
                &lookup,
                OPENROUTER_API_KEY_ENV,
                "OpenRouter API key",
            ),
            models: list(&lookup, "WAYPOINT_MODEL_CASCADE", DEFAULT_MODEL_CASCADE),
            retry: RetryPolicy::new(
                number(&lookup, "WAYPOINT_PRIMARY_ATTEMPTS", 1u32)?,
                backoff_base,
            ),
        };

        let secondary = ProviderSettings {
            id: "groq".to_string(),
            base_url: lookup("WAYPOINT_SECONDARY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SECONDARY_BASE_URL.to_string()),
            credential: ApiCredential::from_lookup(&lookup, GROQ_API_KEY_ENV, "Groq API key"),
            models: list(&lookup, "WAYPOINT_SECONDARY_MODELS", DEFAULT_SECONDARY_MODELS),
            retry: RetryPolicy::new(
                number(&lookup, "WAYPOINT_SECONDARY_ATTEMPTS", 2u32)?,
                backoff_base,
            ),
        };

        for settings in [&primary, &secondary] {
            if !settings.base_url.starts_with("http://") && !settings.base_url.starts_with("https://")
            {
                return Err(ConfigError::InvalidValue {
                    key: format!("{} base URL", settings.id),
                    value: settings.base_url.clone(),
                    reason: "must start with http:// or https://".to_string(),
                });
            }
        }

        let parameters = GenerationParameters {
            temperature: number(&lookup, "WAYPOINT_TEMPERATURE", 0.7f32)?,
            max_tokens: number(&lookup, "WAYPOINT_MAX_TOKENS", 4000u32)?,
            timeout: duration(&lookup, "WAYPOINT_REQUEST_TIMEOUT", Duration::from_secs(60))?,
        };

        Ok(Self {
            primary,
            secondary,
            parameters,
            connect_timeout: duration(&lookup, "WAYPOINT_CONNECT_TIMEOUT", Duration::from_secs(10))?,
            synonyms_file: lookup("WAYPOINT_SYNONYMS_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// Every candidate: primary models in order, then secondary models.
    pub fn candidates(&self) -> Vec<ModelCandidate> {
        self.primary
            .candidates()
            .chain(self.secondary.candidates())
            .collect()
    }

    /// Providers for both families.
    pub fn build_registry(&self) -> ProviderRegistry {
        ProviderRegistry::new()
            .with(Arc::new(self.primary.build_provider(self.connect_timeout)))
            .with(Arc::new(self.secondary.build_provider(self.connect_timeout)))
    }

    /// Sanitizer with the built-in synonym tables plus any overrides file.
    pub fn sanitizer(&self) -> Result<Sanitizer, ConfigError> {
        let tables = match &self.synonyms_file {
            Some(path) => SynonymTables::builtin().merge(SynonymTables::from_yaml_file(path)?)?,
            None => SynonymTables::builtin(),
        };
        Ok(Sanitizer::new(tables))
    }
}

fn list<F>(lookup: &F, key: &str, default: &[&str]) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}

fn number<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn duration<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
