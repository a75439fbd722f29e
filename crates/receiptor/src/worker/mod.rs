pub mod job;
pub mod pool;
pub mod processor;

pub use job::{ReceiptTask, TaskResult};
pub use pool::WorkerPool;
pub use processor::JobProcessor;

// Re-export crossbeam_channel for use in embedding binaries
pub use crossbeam_channel;
