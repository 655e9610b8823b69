//! Batch analysis orchestrator.
//!
//! One request walks a linear state machine:
//!
//! ```text
//! decode ─▶ TryPrimary ─ok─▶ Parse ─ok─▶ Assemble
//!               │              │            ▲
//!               └──err──▶ Fallback ◀──err───┘
//!                            └──────────────┘
//! ```
//!
//! Remote and parse failures are absorbed by the heuristic fallback and only
//! logged. The caller sees an error for an undecodable image or for its own
//! cancellation, nothing else.
//!
//! Decoding and the heuristic are CPU-bound and run on the blocking pool.

use std::sync::Arc;

use chrono::Utc;
use freshness::{
    assemble, decode_image, estimate, normalize, to_data_url, AnalysisSource, BatchResult,
    CodecError, ItemAnalysis, NormalizeError, Pixels,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::provider::{InferenceError, ProviderInfo, VisionProvider};

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("invalid image: {0}")]
    InvalidImage(#[from] CodecError),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("image task failed: {0}")]
    Internal(String),
}

#[derive(Debug)]
enum FallbackCause {
    Inference(InferenceError),
    Malformed(NormalizeError),
    LocalOnly,
}

impl FallbackCause {
    fn log(&self) {
        match self {
            FallbackCause::Inference(e @ InferenceError::Unavailable(_)) => {
                info!(error=%e, "analyzer: primary inference not configured, using heuristic")
            }
            FallbackCause::Inference(e) => {
                warn!(error=%e, "analyzer: primary inference failed, using heuristic")
            }
            FallbackCause::Malformed(e) => {
                warn!(error=%e, "analyzer: unusable model response, using heuristic")
            }
            FallbackCause::LocalOnly => info!("analyzer: local-only analysis requested"),
        }
    }
}

enum Step {
    TryPrimary,
    Parse(String),
    Fallback(FallbackCause),
    Assemble(Vec<ItemAnalysis>, AnalysisSource),
}

pub struct Analyzer {
    provider: Arc<dyn VisionProvider>,
}

impl Analyzer {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_info(&self) -> ProviderInfo {
        self.provider.info()
    }

    pub async fn analyze(&self, image: &str) -> Result<BatchResult, AnalyzeError> {
        self.analyze_with_cancel(image, &CancellationToken::new()).await
    }

    /// Cancelling `cancel` while the remote call is in flight drops that call
    /// and returns [`AnalyzeError::Cancelled`] without running the fallback.
    pub async fn analyze_with_cancel(
        &self,
        image: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, AnalyzeError> {
        // Decode first: the fallback needs pixels, and a bad image should not cost a model call.
        let pixels = decode_off_runtime(image).await?;
        self.run(Step::TryPrimary, image, &pixels, cancel).await
    }

    /// Heuristic path only; the remote model is never contacted.
    pub async fn analyze_local(&self, image: &str) -> Result<BatchResult, AnalyzeError> {
        let pixels = decode_off_runtime(image).await?;
        self.run(Step::Fallback(FallbackCause::LocalOnly), image, &pixels, &CancellationToken::new())
            .await
    }

    async fn run(
        &self,
        start: Step,
        image: &str,
        pixels: &Arc<Pixels>,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, AnalyzeError> {
        let mut step = start;
        loop {
            step = match step {
                Step::TryPrimary => {
                    let data_url = to_data_url(image);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(AnalyzeError::Cancelled),
                        res = self.provider.infer(&data_url) => match res {
                            Ok(raw) => Step::Parse(raw),
                            Err(e) => Step::Fallback(FallbackCause::Inference(e)),
                        },
                    }
                }

                Step::Parse(raw) => match normalize(&raw) {
                    Ok(items) => Step::Assemble(items, AnalysisSource::Primary),
                    Err(e) => Step::Fallback(FallbackCause::Malformed(e)),
                },

                Step::Fallback(cause) => {
                    if cancel.is_cancelled() {
                        return Err(AnalyzeError::Cancelled);
                    }
                    cause.log();
                    let pixels = Arc::clone(pixels);
                    let item = tokio::task::spawn_blocking(move || estimate(&pixels))
                        .await
                        .map_err(|e| AnalyzeError::Internal(e.to_string()))?;
                    Step::Assemble(vec![item], AnalysisSource::Heuristic)
                }

                Step::Assemble(items, source) => {
                    let batch = assemble(items, source, Utc::now());
                    info!(
                        analysis_id=%batch.analysis_id,
                        source=?batch.source,
                        items=batch.item_count,
                        average=batch.average_freshness,
                        "analyzer: batch ready"
                    );
                    return Ok(batch);
                }
            };
        }
    }
}

async fn decode_off_runtime(image: &str) -> Result<Arc<Pixels>, AnalyzeError> {
    let payload = image.to_string();
    let pixels = tokio::task::spawn_blocking(move || decode_image(&payload))
        .await
        .map_err(|e| AnalyzeError::Internal(e.to_string()))??;
    Ok(Arc::new(pixels))
}
