//! The base extraction strategy and its specialized variants.
//!
//! `BaseStrategy` owns the full pipeline for one request: resolve the
//! provider, preprocess and bound the content, call the provider through
//! the retry controller, parse, validate, and stamp provenance. Variants
//! (`PresetStrategy`) supply a richer instruction and default schema, then
//! delegate; the pipeline itself is never re-implemented.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExtractResult, ExtractionError, ExtractionFailure, Stage};
use crate::metrics::{PerformanceMonitor, PerformanceSample};
use crate::pipeline::{payload, prompts, validate};
use crate::preprocess;
use crate::registry::ProviderRegistry;
use crate::retry::{RetryController, RetryPolicy};
use crate::traits::strategy::ExtractionStrategy;
use crate::traits::transport::Transport;
use crate::types::request::ExtractionRequest;
use crate::types::result::{ExtractionResult, Provenance};
use crate::types::schema::SchemaSpec;

/// The shared extraction pipeline.
///
/// Owns no cross-call state beyond the registry, the injected transport and
/// the aggregate monitor, so any number of `extract` calls may run
/// concurrently.
///
/// # Example
///
/// ```rust,ignore
/// use extraction_engine::{BaseStrategy, ProviderRegistry, HttpTransport};
///
/// let registry = Arc::new(ProviderRegistry::builtin());
/// let strategy = BaseStrategy::new(registry, Arc::new(HttpTransport::new()));
/// let result = strategy.extract(request, &CancellationToken::new()).await?;
/// ```
pub struct BaseStrategy<T: Transport> {
    registry: Arc<ProviderRegistry>,
    transport: Arc<T>,
    monitor: Arc<PerformanceMonitor>,
    default_provider: String,
}

impl<T: Transport> BaseStrategy<T> {
    /// Create a strategy over the given registry and transport.
    ///
    /// The first registered provider becomes the default route for
    /// requests that carry no provider override.
    pub fn new(registry: Arc<ProviderRegistry>, transport: Arc<T>) -> Self {
        let default_provider = registry
            .providers()
            .first()
            .map(|name| name.to_string())
            .unwrap_or_default();
        Self {
            registry,
            transport,
            monitor: Arc::new(PerformanceMonitor::new()),
            default_provider,
        }
    }

    /// Route requests without a provider override to this provider.
    pub fn with_default_provider(mut self, name: impl Into<String>) -> Self {
        self.default_provider = name.into();
        self
    }

    /// Share an external performance monitor.
    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Handle to the aggregate performance monitor.
    pub fn monitor(&self) -> Arc<PerformanceMonitor> {
        Arc::clone(&self.monitor)
    }

    /// The registry this strategy resolves providers from.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn fail(
        &self,
        error: ExtractionError,
        stage: Stage,
        mut sample: PerformanceSample,
        started: Instant,
    ) -> ExtractionFailure {
        sample.elapsed = started.elapsed();
        self.monitor.record(&sample, false);
        warn!(
            request_id = %sample.request_id,
            stage = ?stage,
            error = %error,
            "extraction failed"
        );
        ExtractionFailure {
            error,
            stage,
            sample,
        }
    }

    async fn run(
        &self,
        request: ExtractionRequest,
        cancel: &CancellationToken,
    ) -> ExtractResult<ExtractionResult> {
        let started = Instant::now();
        let mut sample = PerformanceSample::new();
        sample.content_chars_before = request.content.chars().count();

        debug!(
            request_id = %sample.request_id,
            source = %request.source,
            "extraction starting"
        );

        // Resolve first: bounding needs the provider's token budget
        let provider_name = request.provider.as_deref().unwrap_or(&self.default_provider);
        let config = match self
            .registry
            .resolve(provider_name, request.model.as_deref())
        {
            Ok(config) => config,
            Err(error) => return Err(self.fail(error, Stage::Requesting, sample, started)),
        };
        sample.provider = config.name.clone();
        let model = config.default_model.clone();

        // Preprocessing
        let cleaned = preprocess::clean(&request.content, request.kind);
        let bounded = preprocess::bound(&cleaned, config.token_budget, config.estimator.as_ref());
        sample.content_chars_after = bounded.chars().count();
        sample.estimated_prompt_tokens = config.estimator.estimate(&bounded);

        // Requesting
        let headers = match payload::build_headers(&config) {
            Ok(headers) => headers,
            Err(error) => return Err(self.fail(error, Stage::Requesting, sample, started)),
        };
        let url = config.endpoint_for(&model);
        let body = payload::build_payload(
            &config,
            &model,
            &request.instruction,
            &request.schema,
            &request.source,
            &bounded,
        );

        let controller = RetryController::new(RetryPolicy::from_provider(&config));
        let (outcome, stats) = controller
            .execute(cancel, |attempt| {
                let transport = Arc::clone(&self.transport);
                let url = url.clone();
                let headers = headers.clone();
                let body = body.clone();
                let timeout = config.timeout;
                let provider = config.name.clone();
                async move {
                    debug!(provider = %provider, attempt, "provider call");
                    let response =
                        match tokio::time::timeout(timeout, transport.send(&url, &headers, &body))
                            .await
                        {
                            Ok(Ok(response)) => response,
                            Ok(Err(error)) => return Err(error.into()),
                            Err(_) => {
                                return Err(ExtractionError::connection(format!(
                                    "provider call timed out after {timeout:?}"
                                )))
                            }
                        };
                    if !response.is_success() {
                        return Err(ExtractionError::Response {
                            status: response.status,
                            message: snippet(&response.body),
                        });
                    }
                    Ok(response.body)
                }
            })
            .await;

        sample.attempts = stats.attempts;
        sample.backoff = stats.backoff;

        let raw_body = match outcome {
            Ok(body) => body,
            Err(error) => return Err(self.fail(error, Stage::Requesting, sample, started)),
        };

        // Parsing
        let parsed = match payload::parse_response(&raw_body) {
            Ok(parsed) => parsed,
            Err(error) => return Err(self.fail(error, Stage::Parsing, sample, started)),
        };
        sample.reported_usage = parsed.usage;

        // Validating
        let validated = match validate::validate(&request.schema, &parsed.fields) {
            Ok(validated) => validated,
            Err(error) => return Err(self.fail(error, Stage::Validating, sample, started)),
        };

        sample.elapsed = started.elapsed();
        self.monitor.record(&sample, true);
        info!(
            request_id = %sample.request_id,
            provider = %config.name,
            attempts = sample.attempts,
            confidence = validated.confidence,
            "extraction completed"
        );

        Ok(ExtractionResult {
            payload: validated.fields,
            provenance: Provenance::stamp(config.name.clone(), model, &bounded),
            confidence: validated.confidence,
            sample,
        })
    }
}

#[async_trait]
impl<T: Transport> ExtractionStrategy for BaseStrategy<T> {
    async fn extract(
        &self,
        request: ExtractionRequest,
        cancel: &CancellationToken,
    ) -> ExtractResult<ExtractionResult> {
        self.run(request, cancel).await
    }
}

/// Trim a provider error body down to something loggable.
fn snippet(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{cut}…")
    }
}

// =============================================================================
// Specialized variants
// =============================================================================

/// Instruction template and default schema for a specialized variant.
#[derive(Debug, Clone)]
pub struct ExtractionPreset {
    /// Short name, used in logs
    pub name: String,

    /// Instruction applied when the request brings none; otherwise the
    /// request's instruction is appended as additional focus
    pub instruction: String,

    /// Schema applied when the request's schema is empty
    pub schema: SchemaSpec,
}

impl ExtractionPreset {
    /// Create a custom preset.
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        schema: SchemaSpec,
    ) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            schema,
        }
    }

    /// Named-entity extraction vocabulary.
    pub fn entities() -> Self {
        Self::new("entities", prompts::ENTITY_INSTRUCTION, prompts::entity_schema())
    }

    /// Product/pricing extraction vocabulary.
    pub fn pricing() -> Self {
        Self::new("pricing", prompts::PRICING_INSTRUCTION, prompts::pricing_schema())
    }
}

/// A specialized strategy: a preset composed over the base pipeline.
pub struct PresetStrategy<T: Transport> {
    base: BaseStrategy<T>,
    preset: ExtractionPreset,
}

impl<T: Transport> PresetStrategy<T> {
    /// Compose a preset over a base strategy.
    pub fn new(base: BaseStrategy<T>, preset: ExtractionPreset) -> Self {
        Self { base, preset }
    }

    /// Entity-extraction variant.
    pub fn entities(base: BaseStrategy<T>) -> Self {
        Self::new(base, ExtractionPreset::entities())
    }

    /// Pricing-extraction variant.
    pub fn pricing(base: BaseStrategy<T>) -> Self {
        Self::new(base, ExtractionPreset::pricing())
    }

    /// The preset this variant applies.
    pub fn preset(&self) -> &ExtractionPreset {
        &self.preset
    }
}

#[async_trait]
impl<T: Transport> ExtractionStrategy for PresetStrategy<T> {
    async fn extract(
        &self,
        mut request: ExtractionRequest,
        cancel: &CancellationToken,
    ) -> ExtractResult<ExtractionResult> {
        if request.schema.is_empty() {
            request.schema = self.preset.schema.clone();
        }
        request.instruction = if request.instruction.is_empty() {
            self.preset.instruction.clone()
        } else {
            format!(
                "{}\n\nAdditional focus: {}",
                self.preset.instruction, request.instruction
            )
        };

        debug!(preset = %self.preset.name, source = %request.source, "preset applied");
        self.base.extract(request, cancel).await
    }
}
