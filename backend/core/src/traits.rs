use std::path::Path;

use async_trait::async_trait;

use crate::error::OcrResult;
use crate::types::RecognizedText;

/// Anything that can turn an image on disk into recognized text runs.
///
/// The worker-backed client is the production implementation; the orchestrator
/// only depends on this trait.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Load recognition models for the given language codes.
    async fn initialize(&mut self, languages: &[String]) -> OcrResult<()>;

    /// Recognize all text runs in one image.
    async fn recognize(&self, path: &Path) -> OcrResult<Vec<RecognizedText>>;

    /// Release the underlying engine.
    async fn shutdown(&self) -> OcrResult<()>;
}
