//! Schema-Driven LLM Extraction Engine
//!
//! Turns unstructured web content into schema-conforming records by
//! delegating semantic interpretation to pluggable LLM backends, while
//! keeping the mechanics dependable: bounded token budgets, classified
//! retry/backoff, strict-but-repairing schema validation, and provenance
//! on every result.
//!
//! # Design Philosophy
//!
//! - Providers are data, not code: a closed registry of configurations,
//!   resolved by name, rejected loudly when unknown
//! - Errors are classified, not caught: retryability travels with the
//!   error kind so the retry controller never inspects causes
//! - The network is injected: all I/O goes through the [`Transport`]
//!   trait, so tests script it and callers own the client stack
//! - Results carry their history: provenance plus a performance sample on
//!   every success and every failure
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use extraction_engine::{
//!     BaseStrategy, ExtractionRequest, ExtractionStrategy, FieldSpec,
//!     HttpTransport, ProviderRegistry, SchemaSpec,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let registry = Arc::new(ProviderRegistry::builtin());
//! let strategy = BaseStrategy::new(registry, Arc::new(HttpTransport::new()));
//!
//! let request = ExtractionRequest::new("https://example.com/widget", html)
//!     .with_instruction("Extract the product offer")
//!     .with_schema(
//!         SchemaSpec::new()
//!             .field("product_name", FieldSpec::string().required())
//!             .field("price", FieldSpec::number().required()),
//!     );
//!
//! let result = strategy.extract(request, &CancellationToken::new()).await?;
//! println!("{} ({:.0}%)", result.payload["product_name"], result.confidence * 100.0);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (Transport, ExtractionStrategy)
//! - [`types`] - Requests, results, schemas, provider configuration
//! - [`registry`] - Immutable provider lookup
//! - [`preprocess`] - Content cleaning, bounding and segmenting
//! - [`retry`] - Backoff controller with deadline and cancellation
//! - [`pipeline`] - The base strategy and specialized presets
//! - [`metrics`] - Per-call samples and aggregate counters
//! - [`testing`] - Scripted mocks for tests

pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod registry;
pub mod retry;
pub mod testing;
pub mod traits;
pub mod transports;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractResult, ExtractionError, ExtractionFailure, Result, Stage};
pub use metrics::{MetricsSnapshot, PerformanceMonitor, PerformanceSample, TokenUsage};
pub use preprocess::{bound, clean, segment, HeuristicEstimator, Segments, TokenEstimator};
pub use registry::ProviderRegistry;
pub use retry::{RetryController, RetryPolicy, RetryStats};
pub use traits::{
    strategy::ExtractionStrategy,
    transport::{Transport, TransportError, TransportResponse},
};
pub use types::{
    config::{AuthScheme, ProviderConfig, ProviderSettings, RegistrySettings},
    request::{ContentKind, ExtractionRequest},
    result::{ExtractionResult, Provenance},
    schema::{FieldSpec, FieldType, SchemaSpec},
};

// Re-export pipeline components
pub use pipeline::{BaseStrategy, ExtractionPreset, PresetStrategy};

// Re-export transports
pub use transports::HttpTransport;
