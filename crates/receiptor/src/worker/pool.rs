use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};

use crate::config::Config;
use crate::db::Database;
use crate::extractor::FieldExtractor;
use crate::processor::OcrProcessor;
use crate::worker::job::{ReceiptTask, TaskResult};
use crate::worker::processor::JobProcessor;

/// Fixed-size pool of worker threads processing receipts.
///
/// Each task occupies one worker slot for its full duration (OCR and the
/// LLM call are blocking and can take seconds to minutes), so concurrency
/// is sized by `worker_count`. Tasks for different receipts run
/// independently; there is no ordering guarantee across receipts.
pub struct WorkerPool {
    task_sender: Sender<ReceiptTask>,
    result_receiver: Receiver<TaskResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawns `worker_count` threads sharing the given processor.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn new(processor: Arc<JobProcessor>, worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (task_sender, task_receiver) = bounded::<ReceiptTask>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<TaskResult>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let task_rx = task_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_processor = Arc::clone(&processor);

            let handle = thread::spawn(move || {
                run_worker(worker_id, task_rx, result_tx, shutdown_flag, worker_processor);
            });

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self {
            task_sender,
            result_receiver,
            workers,
            shutdown,
        }
    }

    /// Opens (or creates) the database at `database_path` and wires the
    /// full pipeline from configuration: OCR engine, extraction backend,
    /// job processor, and worker threads.
    ///
    /// Returns the database handle alongside the pool so the submission
    /// flow can create `pending` records before enqueueing tasks.
    pub fn start(
        config: &Config,
        database_path: &Path,
    ) -> crate::error::Result<(Database, Self)> {
        let db = Database::open(database_path)?;

        let recognizer = Arc::new(OcrProcessor::new(&config.ocr_languages));
        let extractor = FieldExtractor::from_config(config);
        let processor = Arc::new(JobProcessor::new(
            db.clone(),
            recognizer,
            extractor,
            config.uploads_dir.clone(),
        ));

        Ok((db, Self::new(processor, config.worker_count)))
    }

    /// Enqueues a task. The caller must have committed the receipt record
    /// before calling this, so the worker observes a stable `pending` row.
    pub fn submit(&self, task: ReceiptTask) -> Result<(), crate::error::WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(crate::error::WorkerError::ChannelClosed);
        }

        self.task_sender
            .send(task)
            .map_err(|_| crate::error::WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<TaskResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<TaskResult> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.task_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    task_receiver: Receiver<ReceiptTask>,
    result_sender: Sender<TaskResult>,
    shutdown: Arc<AtomicBool>,
    processor: Arc<JobProcessor>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match task_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(task) => {
                debug!("Worker {} processing receipt {}", worker_id, task.receipt_id);

                let status = processor.process(task.receipt_id);

                let result = TaskResult {
                    receipt_id: task.receipt_id,
                    status,
                };

                if let Err(e) = result_sender.send(result) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} task channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
