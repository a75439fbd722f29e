use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReceiptorError {
    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Extraction error: {0}")]
    Extract(#[from] crate::extractor::ExtractError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read image '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    /// The OCR engine itself is missing or misconfigured, as opposed to a
    /// failure on one particular image. The job processor maps this to the
    /// `error_tesseract` terminal status.
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ReceiptorError>;
