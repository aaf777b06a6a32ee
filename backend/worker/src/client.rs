use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use ocrgrep_core::{OcrError, OcrResult, RecognizedText, TextRecognizer};

use crate::channel::WorkerChannel;
use crate::config::WorkerConfig;
use crate::protocol::{CMD_INIT, CMD_READ_TEXT};

const DEFAULT_INIT_ERROR: &str = "Failed to initialize EasyOCR";
const DEFAULT_READ_ERROR: &str = "Failed to read text from image";

/// Typed recognition API over a [`WorkerChannel`].
///
/// `initialize` must be called once before `recognize`. No retries happen
/// here; a failed image is for the caller to skip or retry.
pub struct RecognitionClient {
    channel: WorkerChannel,
    languages: Vec<String>,
    initialized: bool,
}

impl RecognitionClient {
    pub fn new(config: WorkerConfig) -> Self {
        Self::with_channel(WorkerChannel::new(config))
    }

    pub fn with_channel(channel: WorkerChannel) -> Self {
        Self {
            channel,
            languages: Vec::new(),
            initialized: false,
        }
    }

    pub fn channel(&self) -> &WorkerChannel {
        &self.channel
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }
}

#[async_trait]
impl TextRecognizer for RecognitionClient {
    async fn initialize(&mut self, languages: &[String]) -> OcrResult<()> {
        let response = self.channel.send(CMD_INIT, languages).await?;
        if !response.is_success() {
            return Err(OcrError::Initialization(response.message_or(DEFAULT_INIT_ERROR)));
        }
        self.languages = languages.to_vec();
        self.initialized = true;
        info!(languages = ?self.languages, "Recognition engine initialized");
        Ok(())
    }

    async fn recognize(&self, path: &Path) -> OcrResult<Vec<RecognizedText>> {
        if !self.initialized {
            warn!(path = %path.display(), "recognize called before initialize; results are undefined");
        }

        let arg = path.to_string_lossy().into_owned();
        let response = self.channel.send(CMD_READ_TEXT, std::slice::from_ref(&arg)).await?;

        match (response.is_success(), response.data) {
            (true, Some(data)) => {
                let items: Vec<RecognizedText> = serde_json::from_value(data).map_err(|e| {
                    OcrError::Protocol(format!("unexpected read_text payload: {e}"))
                })?;
                debug!(path = %path.display(), items = items.len(), "Recognized image");
                Ok(items)
            }
            _ => Err(OcrError::Recognition(
                response.message.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| DEFAULT_READ_ERROR.to_string()),
            )),
        }
    }

    async fn shutdown(&self) -> OcrResult<()> {
        self.channel.close().await
    }
}
