use std::time::Duration;

use async_trait::async_trait;
use fred::clients::RedisClient;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::{Expiration, RedisConfig};

use crate::{CacheError, RankingCache, TOP_DESTINATIONS_KEY, TopDestination};

/// Redis-backed ranking cache.
///
/// The snapshot is stored as a JSON array under a single key with an `EX`
/// expiry. There is no versioning; the last writer wins.
#[derive(Clone)]
pub struct RedisRankingCache {
    client: RedisClient,
    key: String,
}

impl RedisRankingCache {
    /// Wraps an already connected client.
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            key: TOP_DESTINATIONS_KEY.to_string(),
        }
    }

    /// Connects to Redis at `url`.
    #[tracing::instrument(skip(url), name = "RedisRankingCache::connect", err)]
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let config = RedisConfig::from_url(url)?;
        let client = RedisClient::new(config, None, None, None);
        client.init().await?;
        Ok(Self::new(client))
    }

    /// Stores the snapshot under a different key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Returns true if the server answers a ping.
    pub async fn healthy(&self) -> bool {
        self.client.ping::<()>().await.is_ok()
    }
}

#[async_trait]
impl RankingCache for RedisRankingCache {
    async fn get(&self) -> Result<Option<Vec<TopDestination>>, CacheError> {
        let raw = self.client.get::<Option<String>, _>(&self.key).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, ranking: &[TopDestination], ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(ranking)?;
        let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        self.client
            .set::<(), _, _>(
                &self.key,
                payload,
                Some(Expiration::EX(seconds)),
                None,
                false,
            )
            .await?;
        Ok(())
    }
}
