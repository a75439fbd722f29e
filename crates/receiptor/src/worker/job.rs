use crate::db::JobStatus;

/// One unit of work: process the receipt with this identifier.
///
/// The identifier must reference a committed `pending` row; the submission
/// flow commits the record before enqueueing the task.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptTask {
    pub receipt_id: i64,
}

impl ReceiptTask {
    pub fn new(receipt_id: i64) -> Self {
        Self { receipt_id }
    }
}

/// Outcome of one processor invocation, reported back through the pool.
///
/// `status` is `None` when the identifier resolved to no record, in which
/// case nothing was mutated.
#[derive(Debug, Clone, Copy)]
pub struct TaskResult {
    pub receipt_id: i64,
    pub status: Option<JobStatus>,
}
