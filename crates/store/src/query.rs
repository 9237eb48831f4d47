use serde::{Deserialize, Serialize};

/// Limit/page pair used by every paginated read.
///
/// Pages are zero-based: page `n` skips `limit * n` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: u32,
    pub page: u32,
}

impl PageRequest {
    /// Creates a page request.
    pub fn new(limit: u32, page: u32) -> Self {
        Self { limit, page }
    }

    /// Creates a request for the first page.
    pub fn first(limit: u32) -> Self {
        Self { limit, page: 0 }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.limit) * u64::from(self.page)
    }

    /// Maximum number of rows to return.
    pub fn limit(&self) -> u64 {
        u64::from(self.limit)
    }
}
