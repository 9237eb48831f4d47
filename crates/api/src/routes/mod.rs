//! HTTP route handlers.

pub mod destinations;
pub mod itineraries;
pub mod ops;

use serde::Deserialize;
use store::PageRequest;

use crate::error::ApiError;

const DEFAULT_LIMIT: u32 = 10;

/// `?limit=&page=` query parameters shared by paginated endpoints.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn into_request(self) -> PageRequest {
        PageRequest::new(
            self.limit.unwrap_or(DEFAULT_LIMIT),
            self.page.unwrap_or_default(),
        )
    }
}

/// Parses a path or query id, mapping failures to `400`.
pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what}: {e}")))
}
