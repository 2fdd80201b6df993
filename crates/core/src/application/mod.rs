// Application Layer - Use Cases and Business Logic

pub mod config;
pub mod ingestion;
pub mod job_status;
pub mod retry;
pub mod upload;
pub mod worker;

// Re-exports
pub use config::IngestionConfig;
pub use ingestion::{IngestSource, IngestionPipeline, IngestionReport, IngestionTask, RowOutcome};
pub use job_status::{JobStatusService, JobSummary};
pub use retry::RetryPolicy;
pub use upload::UploadService;
pub use worker::{
    ingestion_channel, shutdown_channel, IngestionQueue, IngestionWorker, ShutdownSender,
    ShutdownToken,
};
