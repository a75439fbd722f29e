pub mod ocr;

use std::path::Path;

use crate::error::ProcessError;

pub use ocr::OcrProcessor;

/// Turns an image file into recognized text.
///
/// The path is expected to exist when called (the job processor checks
/// first), but implementations must still fail cleanly if it does not.
/// An empty string is a valid result: some receipts contain no
/// recognizable text.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, path: &Path) -> Result<String, ProcessError>;
}
