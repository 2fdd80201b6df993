// Time Provider Port (for testability)

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock that advances 1ms on every read
    pub struct TickingTimeProvider {
        now: AtomicI64,
    }

    impl TickingTimeProvider {
        pub fn starting_at(millis: i64) -> Self {
            Self {
                now: AtomicI64::new(millis),
            }
        }
    }

    impl TimeProvider for TickingTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.fetch_add(1, Ordering::SeqCst)
        }
    }
}
