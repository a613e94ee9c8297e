//! Extraction request types.

use serde::{Deserialize, Serialize};

use crate::types::schema::SchemaSpec;

/// Shape of the raw content handed to the preprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// HTML or similar markup; tags are stripped and tables linearized
    Markup,
    /// Plain text; only whitespace is normalized
    Plain,
    /// Unknown format; treated like plain text
    Other,
}

impl Default for ContentKind {
    fn default() -> Self {
        Self::Markup
    }
}

/// One unit of work for a strategy: what to read and what to produce.
///
/// Request-scoped: created by the caller, consumed by a single `extract`
/// call, never persisted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Source identifier, typically the URL the content came from
    pub source: String,

    /// Raw content to extract from
    pub content: String,

    /// How to interpret the raw content
    #[serde(default)]
    pub kind: ContentKind,

    /// Natural-language instruction for the provider
    #[serde(default)]
    pub instruction: String,

    /// Declared output shape
    #[serde(default)]
    pub schema: SchemaSpec,

    /// Provider override; the strategy's default provider when absent
    #[serde(default)]
    pub provider: Option<String>,

    /// Model override; the provider's default model when absent
    #[serde(default)]
    pub model: Option<String>,
}

impl ExtractionRequest {
    /// Create a request for the given source and content.
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            kind: ContentKind::default(),
            instruction: String::new(),
            schema: SchemaSpec::new(),
            provider: None,
            model: None,
        }
    }

    /// Set the content kind.
    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the instruction text.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Set the output schema.
    pub fn with_schema(mut self, schema: SchemaSpec) -> Self {
        self.schema = schema;
        self
    }

    /// Route to a specific provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Route to a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
