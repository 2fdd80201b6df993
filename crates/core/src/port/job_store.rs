// Job Store Port (Interface)

use crate::domain::{
    Job, JobId, JobStatus, PageRequest, ProcessingError, Record, StorePage,
};
use crate::error::Result;
use async_trait::async_trait;

/// Sizes of a job's append logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryCounts {
    pub errors: u64,
    pub processed: u64,
}

/// Persistence interface for jobs and their append-only result logs
///
/// Lists are ordered by arrival. Paginated reads return the window and the full
/// list length; they do not distinguish a missing job from an empty list.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job
    async fn create_job(&self, job: &Job) -> Result<()>;

    /// Find job by ID
    async fn get_job(&self, id: &JobId) -> Result<Option<Job>>;

    /// Move a job to `status`, stamping `started_at` / `finished_at` as appropriate.
    ///
    /// # Errors
    /// - `AppError::NotFound` if the job does not exist
    /// - `AppError::InvalidState` if the transition is not allowed
    async fn update_job_status(&self, id: &JobId, status: JobStatus, now_millis: i64)
        -> Result<()>;

    /// Move a job to `FAILED` with a reason
    async fn mark_job_failed(&self, id: &JobId, reason: &str, now_millis: i64) -> Result<()>;

    /// Append a validated record to the processed-data log
    async fn append_processed_row(&self, id: &JobId, record: &Record) -> Result<()>;

    /// Append a validation failure to the error log
    async fn append_processing_error(&self, id: &JobId, error: &ProcessingError) -> Result<()>;

    /// Count a row whose outcome could not be persisted
    async fn increment_fault_count(&self, id: &JobId) -> Result<()>;

    /// Current lengths of both logs
    async fn count_entries(&self, id: &JobId) -> Result<EntryCounts>;

    /// Page of the error log
    async fn get_errors_page(
        &self,
        id: &JobId,
        page: PageRequest,
    ) -> Result<StorePage<ProcessingError>>;

    /// Page of the processed-data log
    async fn get_processed_page(&self, id: &JobId, page: PageRequest)
        -> Result<StorePage<Record>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct StoredJob {
        job: Job,
        errors: Vec<ProcessingError>,
        processed: Vec<Record>,
    }

    /// Mock append behavior
    #[derive(Debug, Clone, Default)]
    pub enum AppendBehavior {
        /// Always persist
        #[default]
        Succeed,
        /// Fail the next N append calls, then succeed
        FailNext(usize),
        /// Fail every append call
        AlwaysFail,
    }

    /// In-memory JobStore for testing
    #[derive(Clone, Default)]
    pub struct InMemoryJobStore {
        jobs: Arc<Mutex<HashMap<JobId, StoredJob>>>,
        behavior: Arc<Mutex<AppendBehavior>>,
        append_calls: Arc<Mutex<usize>>,
        status_history: Arc<Mutex<HashMap<JobId, Vec<JobStatus>>>>,
    }

    impl InMemoryJobStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_behavior(behavior: AppendBehavior) -> Self {
            let store = Self::default();
            store.set_behavior(behavior);
            store
        }

        pub fn set_behavior(&self, behavior: AppendBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        /// Number of append attempts, including failed ones
        pub fn append_calls(&self) -> usize {
            *self.append_calls.lock().unwrap()
        }

        /// Every status a job has been in, in order
        pub fn status_history(&self, id: &str) -> Vec<JobStatus> {
            self.status_history
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .unwrap_or_default()
        }

        pub fn all_errors(&self, id: &str) -> Vec<ProcessingError> {
            self.jobs
                .lock()
                .unwrap()
                .get(id)
                .map(|s| s.errors.clone())
                .unwrap_or_default()
        }

        pub fn all_processed(&self, id: &str) -> Vec<Record> {
            self.jobs
                .lock()
                .unwrap()
                .get(id)
                .map(|s| s.processed.clone())
                .unwrap_or_default()
        }

        fn check_append(&self) -> Result<()> {
            *self.append_calls.lock().unwrap() += 1;

            let mut behavior = self.behavior.lock().unwrap();
            match &mut *behavior {
                AppendBehavior::Succeed => Ok(()),
                AppendBehavior::AlwaysFail => {
                    Err(AppError::Database("mock store unavailable".to_string()))
                }
                AppendBehavior::FailNext(remaining) => {
                    if *remaining == 0 {
                        *behavior = AppendBehavior::Succeed;
                        return Ok(());
                    }
                    *remaining -= 1;
                    Err(AppError::Database("mock store unavailable".to_string()))
                }
            }
        }

        fn with_job<T>(&self, id: &JobId, f: impl FnOnce(&mut StoredJob) -> T) -> Result<T> {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.get_mut(id) {
                Some(stored) => Ok(f(stored)),
                None => Err(AppError::NotFound(format!("Job {} not found", id))),
            }
        }

        fn transition(
            &self,
            id: &JobId,
            status: JobStatus,
            now_millis: i64,
            reason: Option<&str>,
        ) -> Result<()> {
            let result = self.with_job(id, |stored| {
                let job = &mut stored.job;
                let outcome = match status {
                    JobStatus::Processing => job.start(now_millis),
                    JobStatus::Done => job.complete(now_millis),
                    JobStatus::Failed => job.fail(now_millis, reason.unwrap_or_default()),
                    JobStatus::Pending => Err(crate::domain::DomainError::InvalidStatusTransition {
                        from: job.status.to_string(),
                        to: status.to_string(),
                    }),
                };
                outcome.map_err(|e| AppError::InvalidState(e.to_string()))
            })?;
            result?;
            self.status_history
                .lock()
                .unwrap()
                .entry(id.clone())
                .or_default()
                .push(status);
            Ok(())
        }
    }

    fn window<T: Clone>(items: &[T], page: PageRequest) -> StorePage<T> {
        let start = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(page.size).unwrap_or(usize::MAX);
        StorePage {
            items: items.iter().skip(start).take(size).cloned().collect(),
            total: items.len() as u64,
        }
    }

    #[async_trait]
    impl JobStore for InMemoryJobStore {
        async fn create_job(&self, job: &Job) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(AppError::Database(format!("Job {} already exists", job.id)));
            }
            jobs.insert(
                job.id.clone(),
                StoredJob {
                    job: job.clone(),
                    errors: Vec::new(),
                    processed: Vec::new(),
                },
            );
            drop(jobs);
            self.status_history
                .lock()
                .unwrap()
                .insert(job.id.clone(), vec![job.status]);
            Ok(())
        }

        async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .get(id)
                .map(|s| s.job.clone()))
        }

        async fn update_job_status(
            &self,
            id: &JobId,
            status: JobStatus,
            now_millis: i64,
        ) -> Result<()> {
            self.transition(id, status, now_millis, None)
        }

        async fn mark_job_failed(&self, id: &JobId, reason: &str, now_millis: i64) -> Result<()> {
            self.transition(id, JobStatus::Failed, now_millis, Some(reason))
        }

        async fn append_processed_row(&self, id: &JobId, record: &Record) -> Result<()> {
            self.check_append()?;
            self.with_job(id, |stored| stored.processed.push(record.clone()))
        }

        async fn append_processing_error(
            &self,
            id: &JobId,
            error: &ProcessingError,
        ) -> Result<()> {
            self.check_append()?;
            self.with_job(id, |stored| stored.errors.push(error.clone()))
        }

        async fn increment_fault_count(&self, id: &JobId) -> Result<()> {
            self.with_job(id, |stored| stored.job.fault_count += 1)
        }

        async fn count_entries(&self, id: &JobId) -> Result<EntryCounts> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .get(id)
                .map(|s| EntryCounts {
                    errors: s.errors.len() as u64,
                    processed: s.processed.len() as u64,
                })
                .unwrap_or_default())
        }

        async fn get_errors_page(
            &self,
            id: &JobId,
            page: PageRequest,
        ) -> Result<StorePage<ProcessingError>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .get(id)
                .map(|s| window(&s.errors, page))
                .unwrap_or(StorePage {
                    items: vec![],
                    total: 0,
                }))
        }

        async fn get_processed_page(
            &self,
            id: &JobId,
            page: PageRequest,
        ) -> Result<StorePage<Record>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .get(id)
                .map(|s| window(&s.processed, page))
                .unwrap_or(StorePage {
                    items: vec![],
                    total: 0,
                }))
        }
    }
}
