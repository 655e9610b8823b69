use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub base_url: String,
    pub model: String,
    pub configured: bool,
    pub timeout_secs: u64,
}

/// Failures of the remote model call. All of them are recoverable: the
/// analyzer answers every one by falling back to the local heuristic.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference unavailable: {0}")]
    Unavailable(String),

    #[error("inference timed out after {0}s")]
    Timeout(u64),

    #[error("inference failed: {0}")]
    Provider(String),
}

/// A vision model that returns the raw structured text of its answer.
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    async fn infer(&self, image_data_url: &str) -> Result<String, InferenceError>;
    fn info(&self) -> ProviderInfo;
}
