// Ingestion Worker - channel-fed scheduler for ingestion tasks

pub mod constants;
mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::ingestion::{IngestionPipeline, IngestionTask};
use crate::domain::JobId;
use crate::error::{AppError, Result};
use std::sync::Arc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

/// Sending half handed to the upload boundary
#[derive(Clone)]
pub struct IngestionQueue {
    tx: mpsc::Sender<IngestionTask>,
}

/// A reserved place in the queue; sending through it cannot block or fail
pub struct QueueSlot<'a> {
    permit: mpsc::Permit<'a, IngestionTask>,
}

impl QueueSlot<'_> {
    pub fn submit(self, task: IngestionTask) {
        self.permit.send(task);
    }
}

impl IngestionQueue {
    /// Reserve room for one task without waiting
    ///
    /// # Errors
    /// - `AppError::QueueFull` if every slot is taken
    /// - `AppError::Internal` if the worker is gone
    pub fn reserve(&self) -> Result<QueueSlot<'_>> {
        match self.tx.try_reserve() {
            Ok(permit) => Ok(QueueSlot { permit }),
            Err(TrySendError::Full(())) => Err(AppError::QueueFull(format!(
                "Ingestion queue is full ({} pending), try again later",
                self.tx.max_capacity()
            ))),
            Err(TrySendError::Closed(())) => Err(AppError::Internal(
                "Ingestion worker is not running".to_string(),
            )),
        }
    }

    /// Hand a task to the worker without waiting
    pub fn try_submit(&self, task: IngestionTask) -> Result<()> {
        self.reserve()?.submit(task);
        Ok(())
    }
}

/// Create the queue feeding an [`IngestionWorker`]
pub fn ingestion_channel(capacity: usize) -> (IngestionQueue, mpsc::Receiver<IngestionTask>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (IngestionQueue { tx }, rx)
}

/// Spawns one task per job, up to `max_concurrent_jobs` at a time.
///
/// Different jobs ingest concurrently; a single job is only ever handled by the one
/// task that received it.
pub struct IngestionWorker {
    rx: mpsc::Receiver<IngestionTask>,
    pipeline: Arc<IngestionPipeline>,
    max_concurrent_jobs: usize,
    permits: Arc<Semaphore>,
}

impl IngestionWorker {
    pub fn new(
        rx: mpsc::Receiver<IngestionTask>,
        pipeline: Arc<IngestionPipeline>,
        max_concurrent_jobs: usize,
    ) -> Self {
        let max_concurrent_jobs = max_concurrent_jobs.max(1);
        Self {
            rx,
            pipeline,
            max_concurrent_jobs,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs)),
        }
    }

    /// Run worker loop with graceful shutdown support
    ///
    /// Stops taking new tasks on shutdown (or when every queue handle is dropped),
    /// then waits for in-flight jobs to finish.
    pub async fn run(mut self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(
            max_concurrent_jobs = self.max_concurrent_jobs,
            "Ingestion worker started"
        );
        loop {
            if shutdown.is_shutdown() {
                info!("Ingestion worker shutting down");
                break;
            }

            // Take a slot first so queued tasks wait in the channel, not in memory
            let permit = tokio::select! {
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
                _ = shutdown.wait() => {
                    info!("Ingestion worker interrupted while waiting for a free slot");
                    break;
                }
            };

            let task = tokio::select! {
                task = self.rx.recv() => match task {
                    Some(t) => t,
                    None => {
                        info!("Ingestion queue closed");
                        break;
                    }
                },
                _ = shutdown.wait() => {
                    info!("Ingestion worker interrupted during idle");
                    break;
                }
            };

            let pipeline = Arc::clone(&self.pipeline);
            tokio::spawn(async move {
                Self::execute_task(pipeline, task).await;
                drop(permit);
            });
        }

        for job_id in drain_queued(&mut self.rx) {
            warn!(job_id = %job_id, "Queued job was not started and stays PENDING");
        }

        // Drain: every permit back means every job task has finished
        let total = u32::try_from(self.max_concurrent_jobs).unwrap_or(u32::MAX);
        let _ = self.permits.acquire_many(total).await;

        info!("Ingestion worker stopped");
        Ok(())
    }

    /// Run one job in its own task so a panic cannot take the worker down
    async fn execute_task(pipeline: Arc<IngestionPipeline>, task: IngestionTask) {
        let job_id = task.job_id.clone();
        let pipeline_for_exec = Arc::clone(&pipeline);

        let handle = tokio::spawn(async move { pipeline_for_exec.run(task).await });

        match handle.await {
            Ok(Ok(report)) => {
                info!(
                    job_id = %job_id,
                    status = %report.status,
                    rows = report.rows_read,
                    faulted = report.faulted,
                    "Ingestion task finished"
                );
            }
            Ok(Err(e)) => {
                error!(job_id = %job_id, error = %e, "Ingestion task failed");
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "Ingestion task panicked"
                } else {
                    "Ingestion task was cancelled"
                };
                error!(job_id = %job_id, error = ?join_err, "{}", reason);
                if let Err(e) = pipeline.abort(&job_id, reason).await {
                    warn!(job_id = %job_id, error = %e, "Could not mark job as failed");
                }
            }
        }
    }
}

/// Close the queue and take whatever is still buffered in it
fn drain_queued(rx: &mut mpsc::Receiver<IngestionTask>) -> Vec<JobId> {
    rx.close();
    let mut job_ids = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(task) => job_ids.push(task.job_id),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    job_ids
}
