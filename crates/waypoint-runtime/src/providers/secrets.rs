//! Credential handling for LLM providers.
//!
//! Provider API keys are read once at startup and wrapped immediately, so:
//!
//! - **No accidental logging**: Credentials cannot appear in Debug/Display output
//! - **Memory safety**: Credentials are zeroed on drop
//! - **Explicit exposure**: The raw value is only reachable through `.expose()`
//!
//! ## Usage
//!
//! ```ignore
//! use crate::providers::secrets::ApiCredential;
//!
//! // Absent or blank keys yield None; the provider reports AuthMissing on first use
//! let cred = ApiCredential::from_lookup(&lookup, "OPENROUTER_API_KEY", "OpenRouter API key");
//!
//! // Use in HTTP header (explicit exposure)
//! request.bearer_auth(cred.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Where a credential was loaded from.
///
/// Useful for debugging configuration issues without exposing the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from an environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
///
/// `Debug` and `Display` show `[REDACTED]`; the value is zeroed on drop via
/// the `secrecy` crate.
#[derive(Clone)]
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Create a new credential from a string value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load a credential through a key lookup (normally the process
    /// environment).
    ///
    /// Returns `None` when the key is absent or blank. A missing credential is
    /// not an error at load time.
    ///
    /// # Arguments
    /// * `lookup` - Key to value function
    /// * `env_var` - Name of the variable to read
    /// * `name` - Human-readable name for logs (e.g., "Groq API key")
    pub fn from_lookup<F>(lookup: F, env_var: &str, name: &'static str) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(env_var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| Self::new(v, CredentialSource::Environment, name))
    }

    /// Expose the credential value for use in API calls.
    ///
    /// Only call this where the credential is needed (setting an HTTP header).
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().trim().is_empty()
    }

    /// Get the source of this credential.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Get the human-readable name of this credential.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "sk-or-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "Test API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "sk-or-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Environment, "Test API key");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("[REDACTED]"));
        assert!(display.contains("Test API key"));
        assert!(display.contains("environment"));
    }

    #[test]
    fn test_credential_expose() {
        let secret = "gsk-secret";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "Test API key");
        assert_eq!(cred.expose(), secret);
    }

    #[test]
    fn test_from_lookup() {
        let lookup = |key: &str| match key {
            "PRESENT" => Some(" key-value ".to_string()),
            "BLANK" => Some("   ".to_string()),
            _ => None,
        };

        let cred = ApiCredential::from_lookup(lookup, "PRESENT", "Test key").unwrap();
        assert_eq!(cred.expose(), "key-value");
        assert_eq!(cred.source(), CredentialSource::Environment);

        assert!(ApiCredential::from_lookup(lookup, "BLANK", "Test key").is_none());
        assert!(ApiCredential::from_lookup(lookup, "ABSENT", "Test key").is_none());
    }
}
