//! Top destinations ranking served through a read-through cache.
//!
//! The ranking is a derived snapshot of the destination catalog:
//! - [`RankingCache`] abstracts the key-value store holding the snapshot
//!   ([`RedisRankingCache`] in production, [`InMemoryRankingCache`] in tests)
//! - [`DestinationRankingService`] reads through the cache and recomputes
//!   from the catalog when the snapshot is missing or too small

pub mod cache;
pub mod error;
pub mod memory;
pub mod redis;
pub mod service;

pub use cache::{RankedDestinationPage, RankingCache, TOP_DESTINATIONS_KEY, TopDestination};
pub use error::{CacheError, RankingError, Result};
pub use memory::InMemoryRankingCache;
pub use redis::RedisRankingCache;
pub use service::{DestinationRankingService, TOP_DESTINATIONS_TTL};
