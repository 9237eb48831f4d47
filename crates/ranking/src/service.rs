//! Cache-aside top destinations service.

use std::future::Future;
use std::time::Duration;

use store::{DestinationCatalog, NewRankedDestination, PageRequest, RankedDestination};
use tokio_util::sync::CancellationToken;

use crate::{RankedDestinationPage, RankingCache, RankingError, Result, TopDestination};

/// How long a recomputed snapshot stays in the cache.
pub const TOP_DESTINATIONS_TTL: Duration = Duration::from_secs(60 * 60);

/// Outcome of the cache read that starts every ranking request.
#[derive(Debug)]
enum CacheLookup {
    /// Nothing cached, or the snapshot expired.
    Miss,
    /// A snapshot exists but holds fewer entries than requested.
    Insufficient { cached: usize },
    /// The snapshot can serve the request.
    Hit(Vec<TopDestination>),
}

/// Serves the top destinations ranking through a [`RankingCache`].
///
/// The cache is never authoritative. On a miss, or when the cached snapshot
/// is smaller than the requested page, the ranking is recomputed from the
/// catalog and written back. Cache failures other than a miss are surfaced
/// instead of being treated as misses.
pub struct DestinationRankingService<C, R>
where
    C: DestinationCatalog,
    R: RankingCache,
{
    catalog: C,
    cache: R,
    ttl: Duration,
}

impl<C, R> DestinationRankingService<C, R>
where
    C: DestinationCatalog,
    R: RankingCache,
{
    /// Creates a ranking service with the default one hour TTL.
    pub fn new(catalog: C, cache: R) -> Self {
        Self {
            catalog,
            cache,
            ttl: TOP_DESTINATIONS_TTL,
        }
    }

    /// Overrides the snapshot TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &R {
        &self.cache
    }

    /// Returns the top `request.limit` destinations.
    ///
    /// Served from the cache when the snapshot holds at least `limit`
    /// entries; otherwise recomputed.
    #[tracing::instrument(skip(self, cancel), fields(limit = request.limit, page = request.page))]
    pub async fn get_top_destinations(
        &self,
        request: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<RankedDestinationPage> {
        validate(request)?;

        match self.lookup(request, cancel).await? {
            CacheLookup::Hit(mut cached) => {
                metrics::counter!("ranking_cache_hits_total").increment(1);
                cached.truncate(request.limit as usize);
                Ok(RankedDestinationPage {
                    destinations: cached,
                })
            }
            CacheLookup::Miss => {
                metrics::counter!("ranking_cache_misses_total", "reason" => "miss").increment(1);
                tracing::debug!("ranking cache miss, recomputing");
                self.recompute(request, cancel).await
            }
            CacheLookup::Insufficient { cached } => {
                metrics::counter!("ranking_cache_misses_total", "reason" => "insufficient")
                    .increment(1);
                tracing::debug!(cached, "cached ranking too small, recomputing");
                self.recompute(request, cancel).await
            }
        }
    }

    /// Recomputes the ranking unconditionally and replaces the snapshot.
    #[tracing::instrument(skip(self, cancel), fields(limit = request.limit, page = request.page))]
    pub async fn refresh_top_destinations(
        &self,
        request: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<RankedDestinationPage> {
        validate(request)?;
        self.recompute(request, cancel).await
    }

    /// Adds a destination to the catalog.
    ///
    /// The cached snapshot is left alone; it catches up on the next
    /// recompute.
    #[tracing::instrument(skip(self, new, cancel), fields(name = %new.name))]
    pub async fn create_destination(
        &self,
        new: &NewRankedDestination,
        cancel: &CancellationToken,
    ) -> Result<RankedDestination> {
        let created = or_cancelled(cancel, self.catalog.create_destination(new)).await??;
        tracing::info!(destination_id = %created.id, "catalog destination created");
        Ok(created)
    }

    async fn lookup(
        &self,
        request: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<CacheLookup> {
        let cached = or_cancelled(cancel, self.cache.get()).await?.map_err(|e| {
            tracing::error!(error = %e, "ranking cache read failed");
            RankingError::from(e)
        })?;

        Ok(match cached {
            None => CacheLookup::Miss,
            Some(cached) if cached.len() < request.limit as usize => CacheLookup::Insufficient {
                cached: cached.len(),
            },
            Some(cached) => CacheLookup::Hit(cached),
        })
    }

    async fn recompute(
        &self,
        request: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<RankedDestinationPage> {
        metrics::counter!("ranking_recomputes_total").increment(1);

        let ranked = or_cancelled(cancel, self.catalog.top_destinations(request))
            .await?
            .map_err(|e| {
                tracing::error!(error = %e, "top destinations query failed");
                RankingError::from(e)
            })?;
        let mut destinations: Vec<TopDestination> =
            ranked.into_iter().map(TopDestination::from).collect();

        or_cancelled(cancel, self.cache.set(&destinations, self.ttl))
            .await?
            .map_err(|e| {
                tracing::error!(error = %e, "ranking cache write failed");
                RankingError::from(e)
            })?;
        tracing::info!(cached = destinations.len(), "ranking snapshot refreshed");

        destinations.truncate(request.limit as usize);
        Ok(RankedDestinationPage { destinations })
    }
}

fn validate(request: PageRequest) -> Result<()> {
    if request.limit == 0 {
        return Err(RankingError::InvalidRequest(
            "limit must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Races `fut` against the cancellation token.
async fn or_cancelled<T>(cancel: &CancellationToken, fut: impl Future<Output = T>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RankingError::Cancelled),
        out = fut => Ok(out),
    }
}
