// Ingestion constants (No magic values)

/// First data row number; row 1 is the header
///
/// Rows are counted as the CSV reader yields them. Blank lines are skipped by the
/// reader and not counted, so after a blank line the row number is lower than the
/// file line number.
pub const FIRST_DATA_ROW: u64 = 2;

/// Jobs ingesting at the same time
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

/// Pending ingestion tasks; uploads beyond this are rejected with `QueueFull`
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Total attempts for a single store call (1 initial + 2 retries)
pub const DEFAULT_STORE_RETRY_ATTEMPTS: u32 = 3;

/// Delay before the first store retry (50ms)
pub const DEFAULT_STORE_RETRY_BASE_DELAY_MS: u64 = 50;

/// Exponential backoff multiplier
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// CSV reader buffer (64 KiB)
pub const CSV_BUFFER_CAPACITY: usize = 64 * 1024;
