// Job Domain Model

use super::error::{DomainError, Result};
use super::schema::ColumnSchema;
use serde::{Deserialize, Serialize};

/// Job ID (UUID v4)
pub type JobId = String;

/// Job Status
///
/// `PENDING -> PROCESSING -> DONE`, or `PROCESSING -> FAILED` on a stream fault.
/// Transitions are one-directional; no status is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Done)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Processing => write!(f, "PROCESSING"),
            JobStatus::Done => write!(f, "DONE"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "DONE" => Ok(JobStatus::Done),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(DomainError::Internal(format!("Unknown job status: {}", other))),
        }
    }
}

/// One row's validation failure, attributed to its row number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingError {
    /// Source column key, empty when the whole row was the wrong width
    pub column: String,
    /// 1-based file row; row 1 is the header so data starts at 2
    pub row: u64,
    pub message: String,
}

/// Job Entity
///
/// The processed rows and errors are not held here; they live in per-job append
/// logs behind the `JobStore` and are read page by page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub schema: ColumnSchema,

    /// Rows whose outcome could not be persisted
    pub fault_count: u64,
    pub failure_reason: Option<String>,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl Job {
    /// Create a new job in `PENDING`
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `schema` - Expected format, immutable afterwards
    pub fn new(id: impl Into<String>, created_at: i64, schema: ColumnSchema) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            schema,
            fault_count: 0,
            failure_reason: None,
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    /// Transition to Processing with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        self.transition(JobStatus::Processing)?;
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Done with explicit timestamp
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        self.transition(JobStatus::Done)?;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Failed with explicit timestamp
    pub fn fail(&mut self, now_millis: i64, reason: impl Into<String>) -> Result<()> {
        self.transition(JobStatus::Failed)?;
        self.finished_at = Some(now_millis);
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_job() -> Job {
        let schema =
            ColumnSchema::from_json(&json!({"A": {"name": "a", "type": "string"}})).unwrap();
        Job::new("job-1", 1000, schema)
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = test_job();
        assert_eq!(job.status, JobStatus::Pending);

        job.start(2000).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.started_at, Some(2000));

        job.complete(3000).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.finished_at, Some(3000));
        assert!(job.status.is_terminal());
    }

    #[test]
    fn test_fail_records_reason() {
        let mut job = test_job();
        job.start(2000).unwrap();
        job.fail(2500, "truncated input").unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_reason.as_deref(), Some("truncated input"));
    }

    #[test]
    fn test_no_state_is_revisited() {
        let mut job = test_job();
        assert!(job.complete(1).is_err());
        assert!(job.fail(1, "x").is_err());

        job.start(2).unwrap();
        assert!(job.start(3).is_err());

        job.complete(4).unwrap();
        assert!(job.start(5).is_err());
        assert!(job.fail(5, "late").is_err());
        assert_eq!(job.status, JobStatus::Done);
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Done,
            JobStatus::Failed,
        ] {
            let parsed: JobStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("QUEUED".parse::<JobStatus>().is_err());
    }
}
