//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};
use tabula_core::application::JobSummary;
use tabula_core::domain::{ColumnSchema, JobStatus, SchemaError};

/// files.upload.v1 - Register a CSV file for ingestion
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub file_path: String,
    /// `{key: {name, type}}`, either inline or as a JSON-encoded string
    pub expected_format: serde_json::Value,
}

impl UploadRequest {
    pub fn schema(&self) -> Result<ColumnSchema, SchemaError> {
        match &self.expected_format {
            serde_json::Value::String(raw) => ColumnSchema::from_json_str(raw),
            value => ColumnSchema::from_json(value),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
}

/// files.status.v1 - Status and counters of one file
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: JobStatus,
    pub errors: u64,
    pub processed: u64,
    pub faults: u64,
    pub failure_reason: Option<String>,
}

impl From<JobSummary> for StatusResponse {
    fn from(summary: JobSummary) -> Self {
        Self {
            id: summary.id,
            status: summary.status,
            errors: summary.error_count,
            processed: summary.processed_count,
            faults: summary.fault_count,
            failure_reason: summary.failure_reason,
        }
    }
}

/// files.errors.v1 / files.processed.v1 - Page through a file's results
///
/// Signed on the wire; the handler enforces `page >= 0` and `size > 0`.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub id: String,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_size() -> i64 {
    10
}
