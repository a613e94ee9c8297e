//! Extraction result and provenance types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::metrics::PerformanceSample;

/// Where a result came from: which provider and model produced it, when,
/// and a digest of the exact content that was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub provider: String,

    pub model: String,

    pub extracted_at: DateTime<Utc>,

    /// SHA-256 of the bounded content the provider actually saw
    pub content_digest: String,
}

impl Provenance {
    /// Stamp provenance for a provider/model pair over the given content.
    pub fn stamp(provider: impl Into<String>, model: impl Into<String>, content: &str) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            extracted_at: Utc::now(),
            content_digest: Self::digest(content),
        }
    }

    /// Hex SHA-256 digest of `content`.
    pub fn digest(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A completed extraction: the validated payload plus everything needed to
/// trust and trace it.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Field values conforming to the request's schema, declared fields
    /// first, undeclared provider output passed through after
    pub payload: serde_json::Map<String, Value>,

    /// Which provider/model produced this, and from what content
    pub provenance: Provenance,

    /// Fraction of required fields filled without falling back to defaults
    pub confidence: f32,

    /// Timing, attempts and token accounting for the call
    pub sample: PerformanceSample,
}

impl ExtractionResult {
    /// Look up a payload field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_and_hex() {
        let a = Provenance::digest("hello");
        let b = Provenance::digest("hello");
        let c = Provenance::digest("world");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_stamp_carries_identity() {
        let provenance = Provenance::stamp("openai", "gpt-4o", "content");
        assert_eq!(provenance.provider, "openai");
        assert_eq!(provenance.model, "gpt-4o");
        assert_eq!(provenance.content_digest, Provenance::digest("content"));
    }
}
