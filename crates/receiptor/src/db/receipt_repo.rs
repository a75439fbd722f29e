//! Receipt repository — CRUD operations for the `receipts` table.
//!
//! The status column is the job state machine: a row is created as
//! `pending` by the submission flow and moved to exactly one terminal
//! status by the job processor. Field writes are split so that `ocr_text`
//! survives a later extraction or commit failure, and the extracted
//! triple is always written in a single statement (all three or none).

use rusqlite::{params, Row};

use crate::extractor::ExtractedFields;

use super::{Database, DatabaseError};

/// Processing state of one receipt. `Pending` is the only non-terminal
/// value; the job processor moves a row to exactly one of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processed,
    ErrorFileNotFound,
    ErrorTesseract,
    ErrorProcessing,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processed => "processed",
            JobStatus::ErrorFileNotFound => "error_file_not_found",
            JobStatus::ErrorTesseract => "error_tesseract",
            JobStatus::ErrorProcessing => "error_processing",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DatabaseError> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processed" => Ok(JobStatus::Processed),
            "error_file_not_found" => Ok(JobStatus::ErrorFileNotFound),
            "error_tesseract" => Ok(JobStatus::ErrorTesseract),
            "error_processing" => Ok(JobStatus::ErrorProcessing),
            other => Err(DatabaseError::UnknownStatus(other.to_string())),
        }
    }

    /// True for any status the processor may leave a job in.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A receipt row from the database.
#[derive(Debug, Clone)]
pub struct ReceiptRow {
    pub id: i64,
    pub filename: String,
    pub status: JobStatus,
    pub ocr_text: Option<String>,
    pub merchant: Option<String>,
    pub date: Option<String>,
    pub total: Option<String>,
    pub group_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl ReceiptRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status: String = row.get("status")?;
        let status = JobStatus::parse(&status).map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown status '{}'", status).into(),
            )
        })?;

        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            status,
            ocr_text: row.get("ocr_text")?,
            merchant: row.get("merchant")?,
            date: row.get("date")?,
            total: row.get("total")?,
            group_id: row.get("group_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Inserts a new receipt in `pending` state and returns its id.
/// This is the submission seam: the caller must commit the row (this call)
/// before scheduling a processor invocation for the returned id.
pub fn insert(db: &Database, filename: &str, group_id: Option<i64>) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let now = now_rfc3339();
        conn.execute(
            "INSERT INTO receipts (filename, status, group_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![filename, JobStatus::Pending.as_str(), group_id, now, now],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Finds a receipt by its id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<ReceiptRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM receipts WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], ReceiptRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Stores the raw OCR text. Written as its own statement, before any
/// extraction attempt, so the text survives downstream failure.
pub fn set_ocr_text(db: &Database, id: i64, text: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE receipts SET ocr_text = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, text, now_rfc3339()],
        )?;
        Ok(())
    })
}

/// Stores the extracted field triple. All three columns are written in one
/// statement; a null triple clears nothing that was never set.
pub fn set_fields(db: &Database, id: i64, fields: &ExtractedFields) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE receipts SET merchant = ?2, date = ?3, total = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                id,
                fields.merchant,
                fields.date,
                fields.total,
                now_rfc3339()
            ],
        )?;
        Ok(())
    })
}

/// Commits a status transition.
pub fn set_status(db: &Database, id: i64, status: JobStatus) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE receipts SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), now_rfc3339()],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processed,
            JobStatus::ErrorFileNotFound,
            JobStatus::ErrorTesseract,
            JobStatus::ErrorProcessing,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(JobStatus::parse("error_unknown").is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(JobStatus::Processed.is_terminal());
        assert!(JobStatus::ErrorFileNotFound.is_terminal());
        assert!(JobStatus::ErrorTesseract.is_terminal());
        assert!(JobStatus::ErrorProcessing.is_terminal());
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let id = insert(&db, "receipt.png", Some(7)).unwrap();

        let row = find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(row.filename, "receipt.png");
        assert_eq!(row.status, JobStatus::Pending);
        assert_eq!(row.group_id, Some(7));
        assert!(row.ocr_text.is_none());
        assert!(row.merchant.is_none());
        assert!(row.date.is_none());
        assert!(row.total.is_none());
        assert!(!row.created_at.is_empty());
    }

    #[test]
    fn test_find_missing_returns_none() {
        let db = test_db();
        assert!(find_by_id(&db, 999).unwrap().is_none());
    }

    #[test]
    fn test_ocr_text_survives_status_change() {
        let db = test_db();
        let id = insert(&db, "receipt.png", None).unwrap();

        set_ocr_text(&db, id, "Walmart\nTOTAL 23.45").unwrap();
        set_status(&db, id, JobStatus::ErrorProcessing).unwrap();

        let row = find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(row.ocr_text.as_deref(), Some("Walmart\nTOTAL 23.45"));
        assert_eq!(row.status, JobStatus::ErrorProcessing);
    }

    #[test]
    fn test_set_fields_writes_all_three() {
        let db = test_db();
        let id = insert(&db, "receipt.png", None).unwrap();

        let fields = ExtractedFields {
            merchant: Some("Walmart".to_string()),
            date: Some("01.02.2024".to_string()),
            total: Some("23.45".to_string()),
        };
        set_fields(&db, id, &fields).unwrap();

        let row = find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(row.merchant.as_deref(), Some("Walmart"));
        assert_eq!(row.date.as_deref(), Some("01.02.2024"));
        assert_eq!(row.total.as_deref(), Some("23.45"));
    }

    #[test]
    fn test_set_fields_null_triple() {
        let db = test_db();
        let id = insert(&db, "receipt.png", None).unwrap();

        set_fields(&db, id, &ExtractedFields::default()).unwrap();

        let row = find_by_id(&db, id).unwrap().unwrap();
        assert!(row.merchant.is_none());
        assert!(row.date.is_none());
        assert!(row.total.is_none());
    }
}
