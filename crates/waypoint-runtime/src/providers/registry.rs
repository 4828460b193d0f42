//! Registry of configured providers, keyed by provider id.
//!
//! Cascade candidates name providers by id; the registry resolves them.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = ProviderRegistry::new();
//! registry.register(Arc::new(openrouter));
//! registry.register(Arc::new(groq));
//!
//! let provider = registry.get("groq")?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{LlmProvider, ProviderError};

/// Registry of available providers.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name.
    ///
    /// If a provider with the same name already exists, it will be replaced.
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Resolve a provider id.
    pub fn get(&self, provider_id: &str) -> Result<&Arc<dyn LlmProvider>, ProviderError> {
        self.providers.get(provider_id).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider: '{}'. Available: {:?}",
                provider_id,
                self.available()
            ))
        })
    }

    /// List registered provider ids.
    pub fn available(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a provider id is registered.
    pub fn has_provider(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatMessage, CompletionConfig, CompletionResponse, TokenUsage};
    use async_trait::async_trait;

    struct NamedProvider(&'static str);

    #[async_trait]
    impl LlmProvider for NamedProvider {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                content: "[]".to_string(),
                usage: TokenUsage::default(),
                model: config.model.clone(),
                attempts: 1,
            })
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(NamedProvider("openrouter")))
            .with(Arc::new(NamedProvider("groq")));

        assert!(registry.has_provider("groq"));
        assert_eq!(registry.get("openrouter").unwrap().name(), "openrouter");
        assert_eq!(registry.available(), vec!["groq", "openrouter"]);
    }

    #[test]
    fn test_unknown_provider_is_not_configured() {
        let registry = ProviderRegistry::new().with(Arc::new(NamedProvider("groq")));
        let err = registry.get("anthropic").err().unwrap();
        assert_eq!(err.code(), "provider_unavailable");
        assert!(err.to_string().contains("anthropic"));
    }

    #[test]
    fn test_debug_lists_ids() {
        let registry = ProviderRegistry::new().with(Arc::new(NamedProvider("groq")));
        assert!(format!("{:?}", registry).contains("groq"));
    }
}
