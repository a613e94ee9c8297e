//! Immutable registry of named provider backends.
//!
//! Built once at process start (from code, from [`RegistrySettings`], or
//! from the builtin presets) and shared read-only behind an `Arc`; no
//! locking is needed for concurrent resolution.

use indexmap::IndexMap;

use crate::error::{ExtractionError, Result};
use crate::types::config::{AuthScheme, ProviderConfig, RegistrySettings};

/// Lookup table from provider name to configuration.
///
/// # Example
///
/// ```rust,ignore
/// let registry = ProviderRegistry::builtin();
/// let config = registry.resolve("openai", Some("gpt-4o-mini"))?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: IndexMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the backends the engine ships support for.
    ///
    /// API keys are read from the conventional environment variables; a
    /// missing key only becomes an error when the provider is actually used.
    pub fn builtin() -> Self {
        Self::new()
            .with_provider(
                ProviderConfig::new(
                    "openai",
                    "https://api.openai.com/v1/chat/completions",
                    "gpt-4o",
                )
                .with_api_key_env("OPENAI_API_KEY")
                .with_models(["gpt-4o", "gpt-4o-mini", "gpt-4-turbo"])
                .with_json_mode(true)
                .with_token_budget(16_000),
            )
            .with_provider(
                ProviderConfig::new(
                    "anthropic",
                    "https://api.anthropic.com/v1/messages",
                    "claude-3-5-sonnet-latest",
                )
                .with_auth(AuthScheme::Header {
                    name: "x-api-key".into(),
                })
                .with_api_key_env("ANTHROPIC_API_KEY")
                .with_header("anthropic-version", "2023-06-01")
                .with_models(["claude-3-5-sonnet-latest", "claude-3-5-haiku-latest"])
                .with_token_budget(32_000)
                .with_estimator(std::sync::Arc::new(
                    crate::preprocess::HeuristicEstimator::new(3.5),
                )),
            )
            .with_provider(
                ProviderConfig::new(
                    "groq",
                    "https://api.groq.com/openai/v1/chat/completions",
                    "llama-3.1-70b-versatile",
                )
                .with_api_key_env("GROQ_API_KEY")
                .with_models(["llama-3.1-70b-versatile", "llama-3.1-8b-instant"])
                .with_json_mode(true)
                .with_token_budget(12_000),
            )
            .with_provider(
                ProviderConfig::new(
                    "ollama",
                    "http://localhost:11434/v1/chat/completions",
                    "llama3.1:8b",
                )
                .with_auth(AuthScheme::None)
                .with_models(["llama3.1:8b", "mistral:7b"])
                .with_token_budget(8_000),
            )
    }

    /// Build a registry from the startup settings surface.
    pub fn from_settings(settings: &RegistrySettings) -> Self {
        let mut registry = Self::new();
        for (name, entry) in &settings.providers {
            registry = registry.with_provider(ProviderConfig::from_settings(name, entry));
        }
        registry
    }

    /// Add a provider (builder-style). Re-registering a name replaces it.
    pub fn with_provider(mut self, config: ProviderConfig) -> Self {
        self.providers.insert(config.name.clone(), config);
        self
    }

    /// Resolve a provider by name, optionally overriding the model.
    ///
    /// Returns a copy of the config with the model swapped in. Unknown
    /// provider names and unknown model overrides fail with
    /// [`ExtractionError::Configuration`] naming the offender.
    pub fn resolve(&self, name: &str, model_override: Option<&str>) -> Result<ProviderConfig> {
        let config = self.providers.get(name).ok_or_else(|| {
            ExtractionError::configuration(format!("unknown provider `{name}`"))
        })?;

        match model_override {
            None => Ok(config.clone()),
            Some(model) => {
                if !config.known_models.is_empty()
                    && !config.known_models.iter().any(|m| m == model)
                {
                    return Err(ExtractionError::configuration(format!(
                        "unknown model `{model}` for provider `{name}`"
                    )));
                }
                Ok(config.clone().with_model(model))
            }
        }
    }

    /// Provider names in registration order.
    pub fn providers(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Known models for a provider, in declaration order.
    pub fn models(&self, name: &str) -> Result<Vec<String>> {
        self.providers
            .get(name)
            .map(|config| config.known_models.clone())
            .ok_or_else(|| ExtractionError::configuration(format!("unknown provider `{name}`")))
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_unknown_provider_names_it() {
        let registry = ProviderRegistry::builtin();
        let err = registry.resolve("acme", None).unwrap_err();

        assert!(matches!(err, ExtractionError::Configuration { .. }));
        assert!(err.to_string().contains("acme"));
    }

    #[test]
    fn test_resolve_returns_copy_with_model_override() {
        let registry = ProviderRegistry::builtin();

        let config = registry.resolve("openai", Some("gpt-4o-mini")).unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");

        // The registry entry itself is untouched
        let original = registry.resolve("openai", None).unwrap();
        assert_eq!(original.default_model, "gpt-4o");
    }

    #[test]
    fn test_resolve_rejects_unknown_model() {
        let registry = ProviderRegistry::builtin();
        let err = registry.resolve("openai", Some("gpt-imaginary")).unwrap_err();

        assert!(matches!(err, ExtractionError::Configuration { .. }));
        assert!(err.to_string().contains("gpt-imaginary"));
    }

    #[test]
    fn test_empty_known_models_accepts_any_override() {
        let registry = ProviderRegistry::new().with_provider(
            ProviderConfig::new("acme", "https://api.acme.dev", "m1").with_models(Vec::<String>::new()),
        );

        let config = registry.resolve("acme", Some("anything")).unwrap();
        assert_eq!(config.default_model, "anything");
    }

    #[test]
    fn test_discovery_order_is_registration_order() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.providers(), ["openai", "anthropic", "groq", "ollama"]);

        let models = registry.models("anthropic").unwrap();
        assert_eq!(models[0], "claude-3-5-sonnet-latest");
    }

    #[test]
    fn test_models_for_unknown_provider_fails() {
        let registry = ProviderRegistry::new();
        assert!(registry.models("nope").is_err());
    }

    #[test]
    fn test_from_settings() {
        let json = r#"{
            "providers": {
                "first": {
                    "endpoint": "https://first.dev/v1/chat",
                    "default_model": "f-1"
                },
                "second": {
                    "endpoint": "https://second.dev/v1/chat",
                    "default_model": "s-1",
                    "auth": {"scheme": "none"}
                }
            }
        }"#;
        let settings: crate::types::config::RegistrySettings =
            serde_json::from_str(json).unwrap();
        let registry = ProviderRegistry::from_settings(&settings);

        assert_eq!(registry.providers(), ["first", "second"]);
        assert_eq!(
            registry.resolve("second", None).unwrap().auth,
            AuthScheme::None
        );
    }
}
