use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CacheError, RankingCache, TopDestination};

#[derive(Debug)]
struct Entry {
    payload: String,
    expires_at: Instant,
}

/// In-memory ranking cache for testing.
///
/// Stores the snapshot serialized, like the Redis implementation, and
/// honours the TTL on read.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRankingCache {
    entry: Arc<RwLock<Option<Entry>>>,
    fail: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryRankingCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every operation to fail with [`CacheError::Unavailable`].
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of snapshots written.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Length of the live snapshot, if any.
    pub async fn cached_len(&self) -> Option<usize> {
        self.read_live().await.ok().flatten().map(|r| r.len())
    }

    /// Drops the snapshot as if it had expired.
    pub async fn expire(&self) {
        *self.entry.write().await = None;
    }

    async fn read_live(&self) -> Result<Option<Vec<TopDestination>>, CacheError> {
        let entry = self.entry.read().await;
        match entry.as_ref() {
            Some(entry) if entry.expires_at > Instant::now() => {
                Ok(Some(serde_json::from_str(&entry.payload)?))
            }
            _ => Ok(None),
        }
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RankingCache for InMemoryRankingCache {
    async fn get(&self) -> Result<Option<Vec<TopDestination>>, CacheError> {
        self.check_available()?;
        self.read_live().await
    }

    async fn set(&self, ranking: &[TopDestination], ttl: Duration) -> Result<(), CacheError> {
        self.check_available()?;
        let payload = serde_json::to_string(ranking)?;
        *self.entry.write().await = Some(Entry {
            payload,
            expires_at: Instant::now() + ttl,
        });
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
