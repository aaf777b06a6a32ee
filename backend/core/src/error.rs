use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the recognition pipeline.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to start worker process '{program}': {source}")]
    Startup {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker process exited with a request pending (exit code: {code:?})")]
    WorkerExited { code: Option<i32> },

    #[error("worker protocol error: {0}")]
    Protocol(String),

    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("worker did not respond within {0:?}")]
    Timeout(Duration),

    #[error("worker channel closed: {0}")]
    ChannelClosed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type OcrResult<T> = Result<T, OcrError>;

impl OcrError {
    /// True when the failure came from the worker process going away rather
    /// than from anything it reported.
    pub fn is_worker_lost(&self) -> bool {
        matches!(
            self,
            OcrError::WorkerExited { .. } | OcrError::Timeout(_) | OcrError::ChannelClosed(_)
        )
    }
}
