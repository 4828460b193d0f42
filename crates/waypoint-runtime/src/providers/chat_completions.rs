//! OpenAI-compatible chat-completions provider.
//!
//! OpenRouter, Groq and most hosted inference APIs accept the same request:
//! `POST {base_url}/chat/completions` with a bearer token and a body of
//! `{model, messages, temperature, max_tokens}`. One instance serves one
//! provider family; the cascade picks the model per call.
//!
//! ## Security
//!
//! The API key is stored as an [`ApiCredential`] and only exposed when the
//! authorization header is set.

use async_trait::async_trait;
use backon::Retryable;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::{
    secrets::ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider,
    ProviderError, RetryPolicy, TokenUsage,
};

/// Default connect timeout, distinct from the per-request read timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat-completions client for one provider family.
pub struct ChatCompletionsProvider {
    id: String,
    credential: Option<ApiCredential>,
    base_url: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl std::fmt::Debug for ChatCompletionsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsProvider")
            .field("id", &self.id)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ChatCompletionsProvider {
    /// Create a provider.
    ///
    /// # Arguments
    /// * `id` - Provider identifier recorded in provenance (e.g., "openrouter")
    /// * `base_url` - API root; `/chat/completions` is appended
    /// * `credential` - API key; `None` makes every call fail with `AuthMissing`
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        credential: Option<ApiCredential>,
    ) -> Self {
        Self {
            id: id.into(),
            credential,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            client: build_client(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// One HTTP round trip, no retries.
    async fn send_once(
        &self,
        credential: &ApiCredential,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<(String, Option<String>, TokenUsage), ProviderError> {
        let request = ChatCompletionRequest {
            model: &config.model,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(credential.expose())
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status, message));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, config.timeout))?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(provider = %self.id, error = %e, "Unexpected response shape");
            ProviderError::EmptyResponse
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(ResponseMessage::into_text)
            .ok_or(ProviderError::EmptyResponse)?;

        Ok((content, parsed.model, parsed.usage.unwrap_or_default()))
    }
}

fn build_client(connect_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::NetworkTransient(format!("timed out after {:?}", timeout))
    } else if err.is_connect() {
        ProviderError::NetworkTransient(format!("connection failed: {}", err))
    } else {
        ProviderError::NetworkTransient(err.to_string())
    }
}

fn status_error(status: StatusCode, message: String) -> ProviderError {
    let retryable = status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error();

    if retryable {
        ProviderError::NetworkTransient(format!("HTTP {}", status.as_u16()))
    } else {
        ProviderError::ApiError {
            status: status.as_u16(),
            message,
        }
    }
}

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

/// Chat-completions response body. Only the fields we read.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    /// Some reasoning models leave `content` empty and answer here
    #[serde(default)]
    reasoning: Option<String>,
}

impl ResponseMessage {
    fn into_text(self) -> Option<String> {
        let non_blank = |s: &String| !s.trim().is_empty();
        self.content
            .filter(non_blank)
            .or_else(|| self.reasoning.filter(non_blank))
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let credential = self
            .credential
            .as_ref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::AuthMissing(self.id.clone()))?;

        let attempts = AtomicU32::new(0);
        let provider = self;
        let attempts_ref = &attempts;

        let result = (|| async move {
            attempts_ref.fetch_add(1, Ordering::Relaxed);
            provider.send_once(credential, messages, config).await
        })
        .retry(self.retry.backoff())
        .when(|e: &ProviderError| e.is_retryable())
        .notify(|e: &ProviderError, delay: Duration| {
            tracing::warn!(
                provider = %self.id,
                model = %config.model,
                error = %e,
                delay = ?delay,
                "Provider call failed, retrying"
            );
        })
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        match result {
            Ok((content, model, usage)) => Ok(CompletionResponse {
                content,
                usage,
                model: model.unwrap_or_else(|| config.model.clone()),
                attempts,
            }),
            Err(e) if e.is_retryable() => Err(ProviderError::Exhausted {
                attempts,
                last: Box::new(e),
            }),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CredentialSource;
    use mockito::Matcher;

    fn credential() -> Option<ApiCredential> {
        Some(ApiCredential::new(
            "sk-test-key",
            CredentialSource::Programmatic,
            "Test key",
        ))
    }

    fn config() -> CompletionConfig {
        CompletionConfig {
            model: "test/model:free".to_string(),
            max_tokens: 100,
            temperature: 0.7,
            timeout: Duration::from_secs(5),
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "test/model:free",
                "max_tokens": 100
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"[1, 2, 3]"}}],"usage":{"prompt_tokens":12,"completion_tokens":5}}"#)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new("openrouter", server.url(), credential());
        let response = provider
            .complete(&[ChatMessage::user("hi")], &config())
            .await
            .unwrap();

        assert_eq!(response.content, "[1, 2, 3]");
        assert_eq!(response.model, "test/model:free");
        assert_eq!(response.usage.total(), 17);
        assert_eq!(response.attempts, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_content_falls_back_to_reasoning() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"","reasoning":"{\"a\":1}"}}]}"#)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new("openrouter", server.url(), credential());
        let response = provider
            .complete(&[ChatMessage::user("hi")], &config())
            .await
            .unwrap();
        assert_eq!(response.content, "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_no_content_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":null}}]}"#)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new("openrouter", server.url(), credential());
        let err = provider
            .complete(&[ChatMessage::user("hi")], &config())
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"result":"ok"}"#)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new("openrouter", server.url(), credential());
        let err = provider
            .complete(&[ChatMessage::user("hi")], &config())
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new("groq", server.url(), None);
        let err = provider
            .complete(&[ChatMessage::user("hi")], &config())
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::AuthMissing("groq".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_retried_then_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new("groq", server.url(), credential())
            .with_retry(fast_retry(2));
        let err = provider
            .complete(&[ChatMessage::user("hi")], &config())
            .await
            .unwrap_err();

        match err {
            ProviderError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(last.is_retryable());
            }
            other => panic!("Expected Exhausted, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(400)
            .with_body("bad model")
            .expect(1)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new("groq", server.url(), credential())
            .with_retry(fast_retry(3));
        let err = provider
            .complete(&[ChatMessage::user("hi")], &config())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ProviderError::ApiError {
                status: 400,
                message: "bad model".to_string()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new("openrouter", server.url(), credential());
        let err = provider
            .complete(&[ChatMessage::user("hi")], &config())
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.code(), "exhausted");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let provider = ChatCompletionsProvider::new("openrouter", "https://example.com/", credential());
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-test-key"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(provider.base_url(), "https://example.com");
    }
}
