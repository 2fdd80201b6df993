// Pagination types

use serde::{Deserialize, Serialize};

/// Raw page as returned by a store: the window plus the full list length
#[derive(Debug, Clone, PartialEq)]
pub struct StorePage<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Page request, zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// Index of the first element of the window
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

/// A bounded page of a job's list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

impl<T> PaginatedResult<T> {
    pub fn from_store(page: StorePage<T>, request: PageRequest) -> Self {
        Self {
            data: page.items,
            total: page.total,
            page: request.page,
            size: request.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(0, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 25).offset(), 75);
        assert_eq!(PageRequest::new(u64::MAX, 2).offset(), u64::MAX);
    }
}
