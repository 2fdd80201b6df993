//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::{invalid_params, to_rpc_error};
use crate::types::{
    PageParams, StatusRequest, StatusResponse, UploadRequest, UploadResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::path::PathBuf;
use std::sync::Arc;
use tabula_core::application::{IngestSource, JobStatusService, UploadService};
use tabula_core::domain::{PageRequest, PaginatedResult, ProcessingError, Record};
use tabula_core::error::AppError;
use tracing::debug;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    upload_service: Arc<UploadService>,
    job_service: Arc<JobStatusService>,
}

impl RpcHandler {
    pub fn new(upload_service: Arc<UploadService>, job_service: Arc<JobStatusService>) -> Self {
        Self {
            upload_service,
            job_service,
        }
    }

    /// files.upload.v1
    ///
    /// The format is parsed before any job exists, so a bad format never leaves a job
    /// behind. An unreadable file is only discovered by the ingestion task.
    pub async fn upload(&self, params: UploadRequest) -> Result<UploadResponse, ErrorObjectOwned> {
        let schema = params
            .schema()
            .map_err(|e| to_rpc_error(AppError::Schema(e)))?;

        if params.file_path.trim().is_empty() {
            return Err(invalid_params("file_path must not be empty"));
        }
        let path = PathBuf::from(shellexpand::tilde(&params.file_path).into_owned());

        let id = self
            .upload_service
            .upload(IngestSource::Path(path), schema)
            .await
            .map_err(to_rpc_error)?;

        Ok(UploadResponse { id })
    }

    /// files.status.v1
    pub async fn status(&self, params: StatusRequest) -> Result<StatusResponse, ErrorObjectOwned> {
        let summary = self
            .job_service
            .get_job_summary(&params.id)
            .await
            .map_err(to_rpc_error)?;

        Ok(summary.into())
    }

    /// files.errors.v1
    pub async fn errors(
        &self,
        params: PageParams,
    ) -> Result<PaginatedResult<ProcessingError>, ErrorObjectOwned> {
        let page = page_request(&params)?;
        debug!(job_id = %params.id, page = page.page, size = page.size, "Errors page requested");

        self.job_service
            .get_errors_page(&params.id, page)
            .await
            .map_err(to_rpc_error)
    }

    /// files.processed.v1
    pub async fn processed(
        &self,
        params: PageParams,
    ) -> Result<PaginatedResult<Record>, ErrorObjectOwned> {
        let page = page_request(&params)?;
        debug!(
            job_id = %params.id,
            page = page.page,
            size = page.size,
            "Processed page requested"
        );

        self.job_service
            .get_processed_page(&params.id, page)
            .await
            .map_err(to_rpc_error)
    }
}

fn page_request(params: &PageParams) -> Result<PageRequest, ErrorObjectOwned> {
    let page = u64::try_from(params.page)
        .map_err(|_| invalid_params(format!("page must be >= 0, got {}", params.page)))?;
    let size = u64::try_from(params.size)
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| invalid_params(format!("size must be > 0, got {}", params.size)))?;
    Ok(PageRequest::new(page, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use serde_json::json;
    use tabula_core::application::{ingestion_channel, IngestionTask};
    use tabula_core::domain::JobStatus;
    use tabula_core::port::id_provider::mocks::SequentialIdProvider;
    use tabula_core::port::job_store::mocks::InMemoryJobStore;
    use tabula_core::port::time_provider::SystemTimeProvider;
    use tokio::sync::mpsc;

    fn handler(store: &InMemoryJobStore) -> (RpcHandler, mpsc::Receiver<IngestionTask>) {
        let job_service = Arc::new(JobStatusService::new(
            Arc::new(store.clone()),
            Arc::new(SequentialIdProvider::default()),
            Arc::new(SystemTimeProvider),
        ));
        let (queue, rx) = ingestion_channel(4);
        let upload_service = Arc::new(UploadService::new(Arc::clone(&job_service), queue));
        (RpcHandler::new(upload_service, job_service), rx)
    }

    fn upload_request(expected_format: serde_json::Value) -> UploadRequest {
        UploadRequest {
            file_path: "/tmp/people.csv".to_string(),
            expected_format,
        }
    }

    #[tokio::test]
    async fn test_upload_accepts_object_and_string_formats() {
        let store = InMemoryJobStore::new();
        let (handler, mut rx) = handler(&store);

        let format = json!({"A": {"name": "name", "type": "string"}});
        let first = handler.upload(upload_request(format.clone())).await.unwrap();
        let second = handler
            .upload(upload_request(json!(format.to_string())))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);

        let task = rx.recv().await.unwrap();
        assert_eq!(task.job_id, first.id);

        let status = handler
            .status(StatusRequest { id: first.id })
            .await
            .unwrap();
        assert_eq!(status.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_upload_rejects_unknown_type_without_creating_job() {
        let store = InMemoryJobStore::new();
        let (handler, _rx) = handler(&store);

        let err = handler
            .upload(upload_request(json!({"A": {"name": "a", "type": "date"}})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);

        // No id was ever handed out
        let err = handler
            .status(StatusRequest {
                id: "job-1".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_page_bounds_validated() {
        let store = InMemoryJobStore::new();
        let (handler, _rx) = handler(&store);

        let negative_page = handler
            .errors(PageParams {
                id: "job-1".to_string(),
                page: -1,
                size: 10,
            })
            .await
            .unwrap_err();
        assert_eq!(negative_page.code(), code::VALIDATION_ERROR);

        let zero_size = handler
            .processed(PageParams {
                id: "job-1".to_string(),
                page: 0,
                size: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(zero_size.code(), code::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = InMemoryJobStore::new();
        let (handler, _rx) = handler(&store);

        let err = handler
            .errors(PageParams {
                id: "nonexistent-id".to_string(),
                page: 0,
                size: 10,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);
        assert_eq!(err.message(), "File nonexistent-id not found");
    }
}
