// Upload Service - boundary entry point: create the job, schedule ingestion, return the id

use crate::application::ingestion::{IngestSource, IngestionTask};
use crate::application::job_status::JobStatusService;
use crate::application::worker::IngestionQueue;
use crate::domain::{ColumnSchema, JobId};
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

pub struct UploadService {
    job_service: Arc<JobStatusService>,
    queue: IngestionQueue,
}

impl UploadService {
    pub fn new(job_service: Arc<JobStatusService>, queue: IngestionQueue) -> Self {
        Self { job_service, queue }
    }

    /// Register an uploaded file and schedule its ingestion
    ///
    /// Returns as soon as the job exists and the task is queued; the outcome is only
    /// observable through the job status queries.
    ///
    /// The queue slot is taken before the job is created, so a full queue fails fast
    /// with `AppError::QueueFull` and leaves no job behind.
    pub async fn upload(&self, source: IngestSource, schema: ColumnSchema) -> Result<JobId> {
        let slot = self.queue.reserve()?;
        let job_id = self.job_service.create_job(schema.clone()).await?;
        let description = source.describe();

        slot.submit(IngestionTask {
            job_id: job_id.clone(),
            source,
            schema,
        });

        info!(job_id = %job_id, source = %description, "File queued for ingestion");
        Ok(job_id)
    }
}
