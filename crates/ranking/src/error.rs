use store::StoreError;
use thiserror::Error;

/// Errors raised by a [`RankingCache`](crate::RankingCache) for anything
/// other than a plain miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The Redis client reported an error.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::RedisError),

    /// The cached value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The cache refused the operation.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while serving the ranking.
#[derive(Debug, Error)]
pub enum RankingError {
    /// The cache failed for a reason other than a miss.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// The catalog query failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// The request was rejected before any I/O.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for ranking operations.
pub type Result<T> = std::result::Result<T, RankingError>;
