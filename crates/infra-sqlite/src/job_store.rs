// SQLite JobStore Implementation

use async_trait::async_trait;
use sqlx::SqlitePool;
use tabula_core::domain::{
    ColumnSchema, Job, JobId, JobStatus, PageRequest, ProcessingError, Record, StorePage,
};
use tabula_core::error::{AppError, Result};
use tabula_core::port::{EntryCounts, JobStore};

// Helper to convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => AppError::Database(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    // Appends reference jobs(id); a violation means the job is gone
                    "787" | "3850" => AppError::NotFound(format!(
                        "Job not found (foreign key constraint: {})",
                        db_err.message()
                    )),
                    "5" => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}

// SQLite stores signed 64-bit integers only
fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| AppError::Validation(format!("{} out of range: {}", what, value)))
}

fn to_u64(value: i64, what: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| AppError::Internal(format!("Negative {} in store: {}", what, value)))
}

pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Conditional status change: only applies when the job is in `from`
    async fn transition(
        &self,
        id: &JobId,
        from: JobStatus,
        to: JobStatus,
        now_millis: i64,
        reason: Option<&str>,
    ) -> Result<()> {
        let query = match to {
            JobStatus::Processing => sqlx::query(
                r#"
                UPDATE jobs
                SET status = ?, started_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(to.to_string())
            .bind(now_millis)
            .bind(id)
            .bind(from.to_string()),
            _ => sqlx::query(
                r#"
                UPDATE jobs
                SET status = ?, finished_at = ?, failure_reason = COALESCE(?, failure_reason)
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(to.to_string())
            .bind(now_millis)
            .bind(reason)
            .bind(id)
            .bind(from.to_string()),
        };

        let result = query.execute(&self.pool).await.map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            // Either the job is missing or it is not in `from`
            let current: Option<String> =
                sqlx::query_scalar("SELECT status FROM jobs WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

            match current {
                None => Err(AppError::NotFound(format!("Job {} not found", id))),
                Some(current) => Err(AppError::InvalidState(format!(
                    "Cannot move job {} from {} to {}",
                    id, current, to
                ))),
            }
        } else {
            Ok(())
        }
    }

    async fn count(&self, table: Table, id: &JobId) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE job_id = ?", table.name());
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        to_u64(total, "count")
    }
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Errors,
    Processed,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Errors => "processing_errors",
            Table::Processed => "processed_rows",
        }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create_job(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, status, schema_json, fault_count, failure_reason,
                created_at, started_at, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(job.status.to_string())
        .bind(serde_json::to_string(&job.schema)?)
        .bind(to_i64(job.fault_count, "fault_count")?)
        .bind(&job.failure_reason)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn update_job_status(
        &self,
        id: &JobId,
        status: JobStatus,
        now_millis: i64,
    ) -> Result<()> {
        let from = match status {
            JobStatus::Processing => JobStatus::Pending,
            JobStatus::Done | JobStatus::Failed => JobStatus::Processing,
            JobStatus::Pending => {
                return Err(AppError::InvalidState(format!(
                    "Job {} cannot move back to {}",
                    id, status
                )))
            }
        };
        self.transition(id, from, status, now_millis, None).await
    }

    async fn mark_job_failed(&self, id: &JobId, reason: &str, now_millis: i64) -> Result<()> {
        self.transition(
            id,
            JobStatus::Processing,
            JobStatus::Failed,
            now_millis,
            Some(reason),
        )
        .await
    }

    async fn append_processed_row(&self, id: &JobId, record: &Record) -> Result<()> {
        sqlx::query("INSERT INTO processed_rows (job_id, data) VALUES (?, ?)")
            .bind(id)
            .bind(serde_json::to_string(record)?)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn append_processing_error(&self, id: &JobId, error: &ProcessingError) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO processing_errors (job_id, column_key, row_number, message)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&error.column)
        .bind(to_i64(error.row, "row number")?)
        .bind(&error.message)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn increment_fault_count(&self, id: &JobId) -> Result<()> {
        // Atomic increment without reading
        let result = sqlx::query("UPDATE jobs SET fault_count = fault_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {} not found", id)));
        }
        Ok(())
    }

    async fn count_entries(&self, id: &JobId) -> Result<EntryCounts> {
        Ok(EntryCounts {
            errors: self.count(Table::Errors, id).await?,
            processed: self.count(Table::Processed, id).await?,
        })
    }

    async fn get_errors_page(
        &self,
        id: &JobId,
        page: PageRequest,
    ) -> Result<StorePage<ProcessingError>> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            r#"
            SELECT column_key, row_number, message
            FROM processing_errors
            WHERE job_id = ?
            ORDER BY seq ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(id)
        .bind(to_i64(page.size, "page size")?)
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = rows
            .into_iter()
            .map(|(column, row, message)| {
                Ok(ProcessingError {
                    column,
                    row: to_u64(row, "row number")?,
                    message,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StorePage {
            items,
            total: self.count(Table::Errors, id).await?,
        })
    }

    async fn get_processed_page(
        &self,
        id: &JobId,
        page: PageRequest,
    ) -> Result<StorePage<Record>> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT data
            FROM processed_rows
            WHERE job_id = ?
            ORDER BY seq ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(id)
        .bind(to_i64(page.size, "page size")?)
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = rows
            .iter()
            .map(|data| serde_json::from_str::<Record>(data).map_err(AppError::from))
            .collect::<Result<Vec<_>>>()?;

        Ok(StorePage {
            items,
            total: self.count(Table::Processed, id).await?,
        })
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    status: String,
    schema_json: String,
    fault_count: i64,
    failure_reason: Option<String>,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let status: JobStatus = self.status.parse()?;
        let schema: ColumnSchema = serde_json::from_str(&self.schema_json)?;

        Ok(Job {
            id: self.id,
            status,
            schema,
            fault_count: to_u64(self.fault_count, "fault_count")?,
            failure_reason: self.failure_reason,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}
