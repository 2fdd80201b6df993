// Ingestion configuration

use crate::application::retry::RetryPolicy;
use crate::application::worker::constants::{
    DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_QUEUE_CAPACITY, DEFAULT_STORE_RETRY_ATTEMPTS,
    DEFAULT_STORE_RETRY_BASE_DELAY_MS,
};

/// Tuning knobs for the ingestion side of the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionConfig {
    pub max_concurrent_jobs: usize,
    pub queue_capacity: usize,
    pub store_retry_attempts: u32,
    pub store_retry_base_delay_ms: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
            store_retry_base_delay_ms: DEFAULT_STORE_RETRY_BASE_DELAY_MS,
        }
    }
}

impl IngestionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.store_retry_attempts, self.store_retry_base_delay_ms)
    }
}
