// Job Status Service - job creation, summaries and paginated result views

use crate::domain::{
    ColumnSchema, Job, JobId, JobStatus, PageRequest, PaginatedResult, ProcessingError, Record,
};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobStore, TimeProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Status summary of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub status: JobStatus,
    pub error_count: u64,
    pub processed_count: u64,
    pub fault_count: u64,
    pub failure_reason: Option<String>,
}

pub struct JobStatusService {
    job_store: Arc<dyn JobStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobStatusService {
    pub fn new(
        job_store: Arc<dyn JobStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            job_store,
            id_provider,
            time_provider,
        }
    }

    /// Persist a new PENDING job and return its id
    pub async fn create_job(&self, schema: ColumnSchema) -> Result<JobId> {
        let job = Job::new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            schema,
        );
        self.job_store.create_job(&job).await?;
        info!(job_id = %job.id, columns = job.schema.len(), "Job created");
        Ok(job.id)
    }

    /// Summary of a job
    ///
    /// # Errors
    /// - `AppError::NotFound` if no job with that id exists
    pub async fn get_job_summary(&self, id: &JobId) -> Result<JobSummary> {
        let job = self
            .job_store
            .get_job(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        let counts = self.job_store.count_entries(id).await?;

        Ok(JobSummary {
            id: job.id,
            status: job.status,
            error_count: counts.errors,
            processed_count: counts.processed,
            fault_count: job.fault_count,
            failure_reason: job.failure_reason,
        })
    }

    /// Page of a job's processing errors
    ///
    /// An empty result triggers an existence check: an existing job yields an empty
    /// page, an unknown id yields `AppError::NotFound`.
    pub async fn get_errors_page(
        &self,
        id: &JobId,
        page: PageRequest,
    ) -> Result<PaginatedResult<ProcessingError>> {
        let result = self.job_store.get_errors_page(id, page).await?;
        if result.total == 0 {
            self.ensure_exists(id).await?;
        }
        Ok(PaginatedResult::from_store(result, page))
    }

    /// Page of a job's processed records, same existence rule as errors
    pub async fn get_processed_page(
        &self,
        id: &JobId,
        page: PageRequest,
    ) -> Result<PaginatedResult<Record>> {
        let result = self.job_store.get_processed_page(id, page).await?;
        if result.total == 0 {
            self.ensure_exists(id).await?;
        }
        Ok(PaginatedResult::from_store(result, page))
    }

    async fn ensure_exists(&self, id: &JobId) -> Result<()> {
        debug!(job_id = %id, "Empty page, checking job existence");
        match self.job_store.get_job(id).await? {
            Some(_) => Ok(()),
            None => Err(not_found(id)),
        }
    }
}

fn not_found(id: &JobId) -> AppError {
    AppError::NotFound(format!("File {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_store::mocks::InMemoryJobStore;
    use crate::port::time_provider::mocks::TickingTimeProvider;
    use serde_json::json;

    fn service(store: &InMemoryJobStore) -> JobStatusService {
        JobStatusService::new(
            Arc::new(store.clone()),
            Arc::new(SequentialIdProvider::default()),
            Arc::new(TickingTimeProvider::starting_at(1000)),
        )
    }

    fn schema() -> ColumnSchema {
        ColumnSchema::from_json(&json!({"A": {"name": "a", "type": "string"}})).unwrap()
    }

    #[tokio::test]
    async fn test_create_job_is_pending() {
        let store = InMemoryJobStore::new();
        let service = service(&store);

        let id = service.create_job(schema()).await.unwrap();
        assert_eq!(id, "job-1");

        let summary = service.get_job_summary(&id).await.unwrap();
        assert_eq!(summary.status, JobStatus::Pending);
        assert_eq!(summary.error_count, 0);
        assert_eq!(summary.fault_count, 0);
    }

    #[tokio::test]
    async fn test_summary_not_found() {
        let store = InMemoryJobStore::new();
        let service = service(&store);

        let err = service
            .get_job_summary(&"nonexistent-id".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_page_disambiguation() {
        let store = InMemoryJobStore::new();
        let service = service(&store);
        let id = service.create_job(schema()).await.unwrap();

        let page = service
            .get_errors_page(&id, PageRequest::new(0, 10))
            .await
            .unwrap();
        assert_eq!(
            page,
            PaginatedResult {
                data: vec![],
                total: 0,
                page: 0,
                size: 10
            }
        );

        let missing = service
            .get_errors_page(&"nonexistent-id".to_string(), PageRequest::new(0, 10))
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let missing = service
            .get_processed_page(&"nonexistent-id".to_string(), PageRequest::new(0, 10))
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pages_window_and_total() {
        let store = InMemoryJobStore::new();
        let service = service(&store);
        let id = service.create_job(schema()).await.unwrap();

        for row in 2..27 {
            store
                .append_processing_error(
                    &id,
                    &ProcessingError {
                        column: "A".to_string(),
                        row,
                        message: "bad".to_string(),
                    },
                )
                .await
                .unwrap();
        }

        let page = service
            .get_errors_page(&id, PageRequest::new(2, 10))
            .await
            .unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0].row, 22);

        // Past the end: empty window, total still reported, job exists
        let beyond = service
            .get_errors_page(&id, PageRequest::new(5, 10))
            .await
            .unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.total, 25);

        let again = service
            .get_errors_page(&id, PageRequest::new(2, 10))
            .await
            .unwrap();
        assert_eq!(again, page);
    }
}
