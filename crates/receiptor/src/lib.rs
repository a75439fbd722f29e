pub mod config;
pub mod db;
pub mod error;
pub mod extractor;
pub mod processor;
pub mod worker;

pub use config::{Config, LlmMode};
pub use db::{Database, DatabaseError, JobStatus, ReceiptRow};
pub use error::{ProcessError, ReceiptorError, Result, WorkerError};
pub use extractor::{ChatBackend, ExtractError, ExtractedFields, FieldExtractor};
pub use processor::{OcrProcessor, TextRecognizer};
pub use worker::{JobProcessor, ReceiptTask, TaskResult, WorkerPool};
