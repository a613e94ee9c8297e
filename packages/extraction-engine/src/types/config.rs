//! Provider configuration types.
//!
//! A [`ProviderConfig`] is created once at startup (from code or from
//! [`RegistrySettings`]) and is read-only for the life of the process.
//! API keys live in `secrecy::SecretString` so they never leak through
//! `Debug` output or logs.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::preprocess::{HeuristicEstimator, TokenEstimator};

/// How the API key is attached to provider requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// Key sent in a named header, e.g. `x-api-key`
    Header { name: String },
    /// No authentication (local providers)
    None,
}

/// Immutable configuration for one named provider backend.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Unique provider key
    pub name: String,

    /// Endpoint template; `{model}` is substituted at request time
    pub endpoint: String,

    /// Authentication header scheme
    pub auth: AuthScheme,

    /// API key, when the scheme needs one
    pub api_key: Option<SecretString>,

    /// Model used when the request carries no override
    pub default_model: String,

    /// Models accepted as overrides; empty means any
    pub known_models: Vec<String>,

    /// Whether the provider honors a JSON response format
    pub supports_json_mode: bool,

    /// Per-attempt timeout at the transport boundary
    pub timeout: Duration,

    /// Total provider call attempts per extraction
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts
    pub base_backoff: Duration,

    /// Maximum estimated prompt tokens per request
    pub token_budget: usize,

    /// Static headers sent with every request (e.g. API version pins)
    pub extra_headers: Vec<(String, String)>,

    /// Token estimator matched to the provider's tokenizer
    pub estimator: Arc<dyn TokenEstimator>,
}

impl ProviderConfig {
    /// Create a config with library defaults: bearer auth, 30s timeout,
    /// 3 attempts, 500ms base backoff, 8192-token budget.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        let default_model = default_model.into();
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            auth: AuthScheme::Bearer,
            api_key: None,
            known_models: vec![default_model.clone()],
            default_model,
            supports_json_mode: false,
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            token_budget: 8192,
            extra_headers: Vec::new(),
            estimator: Arc::new(HeuristicEstimator::default()),
        }
    }

    /// Set the authentication scheme.
    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    /// Set the API key directly.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Load the API key from an environment variable, if set.
    pub fn with_api_key_env(mut self, var: &str) -> Self {
        if let Ok(key) = std::env::var(var) {
            self.api_key = Some(SecretString::from(key));
        }
        self
    }

    /// Replace the known-models list.
    pub fn with_models(mut self, models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.known_models = models.into_iter().map(|m| m.into()).collect();
        self
    }

    /// Swap the default model (used by the registry for overrides).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Enable or disable JSON response format support.
    pub fn with_json_mode(mut self, supported: bool) -> Self {
        self.supports_json_mode = supported;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the total attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base backoff delay.
    pub fn with_base_backoff(mut self, delay: Duration) -> Self {
        self.base_backoff = delay;
        self
    }

    /// Set the token budget for bounded content.
    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget;
        self
    }

    /// Add a static header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Replace the token estimator.
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Render the endpoint for a concrete model.
    pub fn endpoint_for(&self, model: &str) -> String {
        self.endpoint.replace("{model}", model)
    }

    /// Whether an API key is available for authenticated schemes.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Startup configuration surface: one entry per provider.
///
/// Deserializable from TOML/JSON so callers can keep the provider table in
/// their config files and build a registry from it once at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    pub providers: IndexMap<String, ProviderSettings>,
}

/// Serde shape for a single provider entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub endpoint: String,

    #[serde(default = "default_auth")]
    pub auth: AuthScheme,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    pub default_model: String,

    #[serde(default)]
    pub known_models: Vec<String>,

    #[serde(default)]
    pub supports_json_mode: bool,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f32,
}

fn default_auth() -> AuthScheme {
    AuthScheme::Bearer
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_token_budget() -> usize {
    8192
}

fn default_chars_per_token() -> f32 {
    4.0
}

impl ProviderConfig {
    /// Build a config from a settings entry.
    pub fn from_settings(name: &str, settings: &ProviderSettings) -> Self {
        let mut config = Self::new(name, settings.endpoint.clone(), settings.default_model.clone())
            .with_auth(settings.auth.clone())
            .with_json_mode(settings.supports_json_mode)
            .with_max_attempts(settings.max_attempts)
            .with_base_backoff(Duration::from_millis(settings.base_backoff_ms))
            .with_timeout(Duration::from_millis(settings.timeout_ms))
            .with_token_budget(settings.token_budget)
            .with_estimator(Arc::new(HeuristicEstimator::new(settings.chars_per_token)));

        if !settings.known_models.is_empty() {
            config = config.with_models(settings.known_models.clone());
        }
        if let Some(var) = &settings.api_key_env {
            config = config.with_api_key_env(var);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::new("acme", "https://api.acme.dev/v1/chat", "acme-small");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_backoff, Duration::from_millis(500));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.known_models, ["acme-small"]);
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_endpoint_template_substitution() {
        let config = ProviderConfig::new(
            "gemini-like",
            "https://api.example.com/models/{model}:generate",
            "m1",
        );
        assert_eq!(
            config.endpoint_for("m2"),
            "https://api.example.com/models/m2:generate"
        );
    }

    #[test]
    fn test_api_key_not_leaked_by_debug() {
        let config =
            ProviderConfig::new("acme", "https://api.acme.dev", "m").with_api_key("sk-secret-123");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret-123"));
    }

    #[test]
    fn test_from_settings_applies_defaults() {
        let json = r#"{
            "endpoint": "https://api.acme.dev/v1/chat",
            "default_model": "acme-small",
            "auth": {"scheme": "header", "name": "x-api-key"}
        }"#;
        let settings: ProviderSettings = serde_json::from_str(json).unwrap();
        let config = ProviderConfig::from_settings("acme", &settings);

        assert_eq!(
            config.auth,
            AuthScheme::Header {
                name: "x-api-key".into()
            }
        );
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.timeout, Duration::from_millis(30_000));
        assert_eq!(config.token_budget, 8192);
    }

    #[test]
    fn test_registry_settings_round_trip() {
        let json = r#"{
            "providers": {
                "acme": {
                    "endpoint": "https://api.acme.dev/v1/chat",
                    "default_model": "acme-small",
                    "max_attempts": 5,
                    "token_budget": 2048
                }
            }
        }"#;
        let settings: RegistrySettings = serde_json::from_str(json).unwrap();
        let entry = &settings.providers["acme"];
        assert_eq!(entry.max_attempts, 5);
        assert_eq!(entry.token_budget, 2048);
        assert_eq!(entry.auth, AuthScheme::Bearer);
    }
}
