//! The per-receipt job processor.
//!
//! One invocation performs exactly one end-to-end attempt: resolve the
//! record, run OCR, run field extraction, and commit a terminal status.
//! No failure inside an invocation ever propagates to the pool; every
//! error path maps to one of the terminal statuses, and a failure while
//! committing that status is logged and swallowed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};
use tracing::info_span;

use crate::db::{receipt_repo, Database, JobStatus, ReceiptRow};
use crate::error::ProcessError;
use crate::extractor::{ExtractedFields, FieldExtractor};
use crate::processor::TextRecognizer;

pub struct JobProcessor {
    db: Database,
    recognizer: Arc<dyn TextRecognizer>,
    extractor: FieldExtractor,
    uploads_dir: PathBuf,
}

impl JobProcessor {
    pub fn new(
        db: Database,
        recognizer: Arc<dyn TextRecognizer>,
        extractor: FieldExtractor,
        uploads_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            recognizer,
            extractor,
            uploads_dir,
        }
    }

    /// Processes one receipt to a terminal status.
    ///
    /// Returns the committed status, or `None` when the identifier did not
    /// resolve to a record (no mutation happens in that case).
    pub fn process(&self, receipt_id: i64) -> Option<JobStatus> {
        let _span = info_span!("job", receipt_id).entered();

        let receipt = match receipt_repo::find_by_id(&self.db, receipt_id) {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                warn!("Receipt {} not found", receipt_id);
                return None;
            }
            Err(e) => {
                error!("Failed to load receipt {}: {}", receipt_id, e);
                return None;
            }
        };

        // A panic anywhere in the stages must not reach the pool thread;
        // it is terminal like any other unexpected failure.
        let status = catch_unwind(AssertUnwindSafe(|| self.run_stages(&receipt)))
            .unwrap_or_else(|_| {
                error!("Panic while processing receipt {}", receipt_id);
                JobStatus::ErrorProcessing
            });

        // Cleanup phase: the status commit happens unconditionally once a
        // record was resolved. If even this fails, the job may be left
        // inconsistent; there is nowhere further to report it.
        if let Err(e) = receipt_repo::set_status(&self.db, receipt_id, status) {
            error!(
                "Failed to commit status '{}' for receipt {}: {}",
                status, receipt_id, e
            );
        }

        Some(status)
    }

    /// Runs the OCR and extraction stages, returning the terminal status
    /// to commit. Never returns `Pending`.
    fn run_stages(&self, receipt: &ReceiptRow) -> JobStatus {
        let file_path = self.uploads_dir.join(&receipt.filename);
        if !file_path.exists() {
            warn!(
                "File {} not found for receipt {}",
                file_path.display(),
                receipt.id
            );
            return JobStatus::ErrorFileNotFound;
        }

        info!("Starting OCR for receipt {}", receipt.id);
        let text = match self.recognizer.recognize(&file_path) {
            Ok(text) => text,
            Err(ProcessError::OcrUnavailable(msg)) => {
                error!("OCR engine unavailable for receipt {}: {}", receipt.id, msg);
                return JobStatus::ErrorTesseract;
            }
            Err(e) => {
                error!("OCR failed for receipt {}: {}", receipt.id, e);
                return JobStatus::ErrorProcessing;
            }
        };
        info!(
            "OCR completed for receipt {}. Text length: {}",
            receipt.id,
            text.len()
        );

        // Persist the raw text before extraction so it survives any
        // downstream failure.
        if let Err(e) = receipt_repo::set_ocr_text(&self.db, receipt.id, &text) {
            error!("Failed to store OCR text for receipt {}: {}", receipt.id, e);
            return JobStatus::ErrorProcessing;
        }

        info!(
            "Starting LLM extraction for receipt {} using {} backend",
            receipt.id,
            self.extractor.backend_name()
        );
        // Extraction failure is a degraded result, not a job failure: the
        // null triple is stored and the job still completes as processed.
        let fields = match self.extractor.extract(&text) {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Extraction failed for receipt {}: {}", receipt.id, e);
                ExtractedFields::default()
            }
        };
        info!(
            "Extraction result for receipt {}: merchant={:?}, date={:?}, total={:?}",
            receipt.id, fields.merchant, fields.date, fields.total
        );

        if let Err(e) = receipt_repo::set_fields(&self.db, receipt.id, &fields) {
            error!(
                "Failed to store extracted fields for receipt {}: {}",
                receipt.id, e
            );
            return JobStatus::ErrorProcessing;
        }

        JobStatus::Processed
    }
}
