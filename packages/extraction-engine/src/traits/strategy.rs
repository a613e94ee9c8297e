//! The extraction capability.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ExtractResult;
use crate::types::{request::ExtractionRequest, result::ExtractionResult};

/// Turns one request into one structured result.
///
/// Implementations wrap the shared base pipeline; specialized variants
/// differ only in the instruction template and default schema they supply.
/// Calls are independent and safe to run concurrently; each owns its
/// request-scoped state.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Run the full pipeline for `request`.
    ///
    /// Cancelling `cancel` abandons any in-flight provider call and
    /// schedules no further retry attempts.
    async fn extract(
        &self,
        request: ExtractionRequest,
        cancel: &CancellationToken,
    ) -> ExtractResult<ExtractionResult>;
}
