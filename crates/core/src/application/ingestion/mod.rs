// Ingestion Pipeline - streaming CSV -> validated rows / errors -> job store

mod source;

pub use source::{ByteStream, IngestSource};

use crate::application::retry::RetryPolicy;
use crate::application::worker::constants::{CSV_BUFFER_CAPACITY, FIRST_DATA_ROW};
use crate::domain::{
    CellValue, ColumnSchema, JobId, JobStatus, ProcessingError, RowValidator,
};
use crate::error::Result;
use crate::port::{JobStore, TimeProvider};
use csv_async::{AsyncReaderBuilder, StringRecord};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{error, info, warn};

/// One unit of ingestion work, correlated by job id
#[derive(Debug, Clone)]
pub struct IngestionTask {
    pub job_id: JobId,
    pub source: IngestSource,
    pub schema: ColumnSchema,
}

/// What happened to a single data row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Validated and appended to the processed-data log
    Processed,
    /// Failed validation; a ProcessingError was appended
    Rejected,
    /// Its outcome could not be persisted
    Faulted,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub job_id: JobId,
    pub rows_read: u64,
    pub processed: u64,
    pub rejected: u64,
    pub faulted: u64,
    pub status: JobStatus,
    pub failure_reason: Option<String>,
}

impl IngestionReport {
    fn new(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.clone(),
            rows_read: 0,
            processed: 0,
            rejected: 0,
            faulted: 0,
            status: JobStatus::Processing,
            failure_reason: None,
        }
    }

    fn tally(&mut self, outcome: RowOutcome) {
        self.rows_read += 1;
        match outcome {
            RowOutcome::Processed => self.processed += 1,
            RowOutcome::Rejected => self.rejected += 1,
            RowOutcome::Faulted => self.faulted += 1,
        }
    }
}

/// Consumes a CSV byte stream for one job at a time.
///
/// Rows of a job are handled strictly in stream order with at most one in-flight store
/// append, so the error and processed-data logs preserve file order.
pub struct IngestionPipeline {
    job_store: Arc<dyn JobStore>,
    time_provider: Arc<dyn TimeProvider>,
    retry_policy: RetryPolicy,
}

impl IngestionPipeline {
    pub fn new(
        job_store: Arc<dyn JobStore>,
        time_provider: Arc<dyn TimeProvider>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            job_store,
            time_provider,
            retry_policy,
        }
    }

    /// Run a queued task: mark the job PROCESSING, open its source, consume it
    pub async fn run(&self, task: IngestionTask) -> Result<IngestionReport> {
        let IngestionTask {
            job_id,
            source,
            schema,
        } = task;

        self.begin(&job_id).await?;

        let description = source.describe();
        match source.open().await {
            Ok(stream) => self.consume(&job_id, stream, &schema).await,
            Err(e) => {
                let reason = format!("Failed to open source {}: {}", description, e);
                self.fail(IngestionReport::new(&job_id), reason).await
            }
        }
    }

    /// Ingest an already-open byte stream
    ///
    /// Returns `Err` only when the job's status itself cannot be updated. Row-level
    /// problems are recorded on the job and summarised in the report.
    pub async fn ingest<R>(
        &self,
        job_id: &JobId,
        reader: R,
        schema: &ColumnSchema,
    ) -> Result<IngestionReport>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.begin(job_id).await?;
        self.consume(job_id, reader, schema).await
    }

    /// Mark a job FAILED outside of a stream (e.g. the ingestion task panicked)
    pub async fn abort(&self, job_id: &JobId, reason: &str) -> Result<()> {
        let now = self.time_provider.now_millis();
        self.retry_policy
            .run(job_id, "mark_job_failed", || {
                self.job_store.mark_job_failed(job_id, reason, now)
            })
            .await
    }

    async fn begin(&self, job_id: &JobId) -> Result<()> {
        let now = self.time_provider.now_millis();
        self.retry_policy
            .run(job_id, "update_job_status", || {
                self.job_store
                    .update_job_status(job_id, JobStatus::Processing, now)
            })
            .await?;
        info!(job_id = %job_id, "Starting to process file");
        Ok(())
    }

    async fn consume<R>(
        &self,
        job_id: &JobId,
        reader: R,
        schema: &ColumnSchema,
    ) -> Result<IngestionReport>
    where
        R: AsyncRead + Unpin + Send,
    {
        let validator = RowValidator::new(schema);
        let mut report = IngestionReport::new(job_id);

        // Row width is not the parser's concern; the validator owns that check
        let mut rdr = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .buffer_capacity(CSV_BUFFER_CAPACITY)
            .create_reader(reader);

        let mut record = StringRecord::new();
        let mut row_number = FIRST_DATA_ROW;

        loop {
            match rdr.read_record(&mut record).await {
                Ok(true) => {
                    let row: Vec<CellValue> = record.iter().map(CellValue::from_field).collect();
                    let outcome = self.process_row(job_id, &validator, row, row_number).await;
                    report.tally(outcome);
                    row_number += 1;
                }
                Ok(false) => break,
                Err(e) => {
                    let reason = format!(
                        "Malformed or truncated input after row {}: {}",
                        row_number - 1,
                        e
                    );
                    return self.fail(report, reason).await;
                }
            }
        }

        let now = self.time_provider.now_millis();
        self.retry_policy
            .run(job_id, "update_job_status", || {
                self.job_store.update_job_status(job_id, JobStatus::Done, now)
            })
            .await?;
        report.status = JobStatus::Done;

        info!(
            job_id = %job_id,
            rows = report.rows_read,
            processed = report.processed,
            rejected = report.rejected,
            faulted = report.faulted,
            "Finished processing file"
        );
        Ok(report)
    }

    async fn process_row(
        &self,
        job_id: &JobId,
        validator: &RowValidator<'_>,
        row: Vec<CellValue>,
        row_number: u64,
    ) -> RowOutcome {
        let (outcome, persisted) = match validator.validate(row) {
            Ok(record) => (
                RowOutcome::Processed,
                self.retry_policy
                    .run(job_id, "append_processed_row", || {
                        self.job_store.append_processed_row(job_id, &record)
                    })
                    .await,
            ),
            Err(validation_error) => {
                let processing_error = ProcessingError {
                    column: validation_error.column().to_string(),
                    row: row_number,
                    message: validation_error.to_string(),
                };
                (
                    RowOutcome::Rejected,
                    self.retry_policy
                        .run(job_id, "append_processing_error", || {
                            self.job_store
                                .append_processing_error(job_id, &processing_error)
                        })
                        .await,
                )
            }
        };

        match persisted {
            Ok(()) => outcome,
            Err(e) => {
                warn!(job_id = %job_id, row = row_number, error = %e, "Failed to persist row outcome");
                if let Err(count_err) = self
                    .retry_policy
                    .run(job_id, "increment_fault_count", || {
                        self.job_store.increment_fault_count(job_id)
                    })
                    .await
                {
                    error!(job_id = %job_id, row = row_number, error = %count_err, "Failed to record row fault");
                }
                RowOutcome::Faulted
            }
        }
    }

    async fn fail(&self, mut report: IngestionReport, reason: String) -> Result<IngestionReport> {
        error!(job_id = %report.job_id, reason = %reason, "Ingestion failed");
        self.abort(&report.job_id, &reason).await?;
        report.status = JobStatus::Failed;
        report.failure_reason = Some(reason);
        Ok(report)
    }
}
