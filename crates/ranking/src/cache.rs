use std::time::Duration;

use async_trait::async_trait;
use common::RankedDestinationId;
use serde::{Deserialize, Serialize};
use store::RankedDestination;

use crate::CacheError;

/// Key under which the ranking snapshot is stored.
pub const TOP_DESTINATIONS_KEY: &str = "TopDestinations";

/// A ranked destination as handed to callers. The popularity score stays
/// behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopDestination {
    pub id: RankedDestinationId,
    pub name: String,
    pub country: String,
    pub description: String,
}

impl From<RankedDestination> for TopDestination {
    fn from(d: RankedDestination) -> Self {
        Self {
            id: d.id,
            name: d.name,
            country: d.country,
            description: d.description,
        }
    }
}

/// Response of the ranking operations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RankedDestinationPage {
    pub destinations: Vec<TopDestination>,
}

/// Key-value store holding the ranking snapshot under a single key.
///
/// A miss (absent or expired) is `Ok(None)`; anything else that goes wrong
/// is a [`CacheError`].
#[async_trait]
pub trait RankingCache: Send + Sync {
    /// Reads the snapshot.
    async fn get(&self) -> Result<Option<Vec<TopDestination>>, CacheError>;

    /// Replaces the snapshot, expiring it after `ttl`.
    async fn set(&self, ranking: &[TopDestination], ttl: Duration) -> Result<(), CacheError>;
}
