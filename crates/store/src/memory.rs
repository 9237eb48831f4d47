use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ActivityId, DestinationId, ItineraryId, RankedDestinationId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Activity, Destination, DestinationDetails, DestinationFields, Itinerary, ItineraryFields,
    NewRankedDestination, PageRequest, RankedDestination, Result, StoreError,
    store::{DestinationCatalog, ItineraryStore, ItineraryTransaction},
};

#[derive(Debug, Clone)]
struct Row<T> {
    value: T,
    deleted_at: Option<DateTime<Utc>>,
}

impl<T> Row<T> {
    fn live(value: T) -> Self {
        Self {
            value,
            deleted_at: None,
        }
    }

    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    itineraries: HashMap<ItineraryId, Row<Itinerary>>,
    destinations: HashMap<DestinationId, Row<Destination>>,
    activities: HashMap<ActivityId, Row<Activity>>,
    catalog: HashMap<RankedDestinationId, Row<RankedDestination>>,
}

#[derive(Debug, Default)]
struct Stats {
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    writes: AtomicUsize,
    ranking_queries: AtomicUsize,
    fail_on_commit: AtomicBool,
    fail_on_query: AtomicBool,
    exec_delay_ms: AtomicU64,
}

/// In-memory store implementation for testing.
///
/// Transactions take an exclusive lock on all tables and stage their writes
/// on a private copy, so an aborted transaction's writes are never visible.
/// Counters and failure switches let tests observe and steer the
/// transaction protocol.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    stats: Arc<Stats>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions opened.
    pub fn begin_count(&self) -> usize {
        self.stats.begins.load(Ordering::SeqCst)
    }

    /// Number of transactions committed.
    pub fn commit_count(&self) -> usize {
        self.stats.commits.load(Ordering::SeqCst)
    }

    /// Number of transactions explicitly rolled back.
    pub fn rollback_count(&self) -> usize {
        self.stats.rollbacks.load(Ordering::SeqCst)
    }

    /// Number of row mutations that became visible (committed writes plus
    /// soft deletes).
    pub fn write_count(&self) -> usize {
        self.stats.writes.load(Ordering::SeqCst)
    }

    /// Number of top-destination queries served.
    pub fn ranking_query_count(&self) -> usize {
        self.stats.ranking_queries.load(Ordering::SeqCst)
    }

    /// Configures commits to fail.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.stats.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Configures catalog queries to fail.
    pub fn set_fail_on_query(&self, fail: bool) {
        self.stats.fail_on_query.store(fail, Ordering::SeqCst);
    }

    /// Delays every statement executed inside a transaction.
    pub fn set_exec_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.stats.exec_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Seeds a live itinerary row directly, bypassing transactions.
    pub async fn insert_itinerary(&self, itinerary: Itinerary) {
        self.tables
            .lock()
            .await
            .itineraries
            .insert(itinerary.id, Row::live(itinerary));
    }

    /// Seeds a live destination row directly, bypassing transactions.
    pub async fn insert_destination(&self, destination: Destination) {
        self.tables
            .lock()
            .await
            .destinations
            .insert(destination.id, Row::live(destination));
    }

    /// Seeds a live activity row directly, bypassing transactions.
    pub async fn insert_activity(&self, activity: Activity) {
        self.tables
            .lock()
            .await
            .activities
            .insert(activity.id, Row::live(activity));
    }

    /// Loads an activity if it is live.
    pub async fn get_activity(&self, id: ActivityId) -> Option<Activity> {
        self.tables
            .lock()
            .await
            .activities
            .get(&id)
            .filter(|row| row.is_live())
            .map(|row| row.value.clone())
    }

    /// Loads a destination if it is live.
    pub async fn get_destination(&self, id: DestinationId) -> Option<Destination> {
        self.tables
            .lock()
            .await
            .destinations
            .get(&id)
            .filter(|row| row.is_live())
            .map(|row| row.value.clone())
    }

    /// Removes every row.
    pub async fn clear(&self) {
        *self.tables.lock().await = Tables::default();
    }
}

#[async_trait]
impl ItineraryStore for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        self.stats.begins.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryTransaction {
            guard,
            staged,
            pending_writes: 0,
            stats: self.stats.clone(),
        })
    }

    async fn get_itinerary(&self, id: ItineraryId) -> Result<Option<Itinerary>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .itineraries
            .get(&id)
            .filter(|row| row.is_live())
            .map(|row| row.value.clone()))
    }

    async fn get_destinations(
        &self,
        itinerary_id: ItineraryId,
    ) -> Result<Vec<DestinationDetails>> {
        let tables = self.tables.lock().await;
        let mut destinations: Vec<Destination> = tables
            .destinations
            .values()
            .filter(|row| row.is_live() && row.value.itinerary_id == itinerary_id)
            .map(|row| row.value.clone())
            .collect();
        destinations.sort_by_key(|d| d.position);

        let details = destinations
            .into_iter()
            .map(|destination| {
                let mut activities: Vec<Activity> = tables
                    .activities
                    .values()
                    .filter(|row| row.is_live() && row.value.destination_id == destination.id)
                    .map(|row| row.value.clone())
                    .collect();
                activities.sort_by_key(|a| a.position);
                DestinationDetails {
                    destination,
                    activities,
                }
            })
            .collect();

        Ok(details)
    }

    async fn list_itineraries(&self, page: PageRequest) -> Result<Vec<Itinerary>> {
        let tables = self.tables.lock().await;
        let mut itineraries: Vec<Itinerary> = tables
            .itineraries
            .values()
            .filter(|row| row.is_live())
            .map(|row| row.value.clone())
            .collect();
        itineraries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(paginate(itineraries, page))
    }

    async fn count_itineraries(&self) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.itineraries.values().filter(|r| r.is_live()).count() as i64)
    }

    async fn soft_delete_itinerary(&self, id: ItineraryId, at: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        Ok(self.mark_deleted(tables.itineraries.get_mut(&id), at))
    }

    async fn soft_delete_destination(&self, id: DestinationId, at: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        Ok(self.mark_deleted(tables.destinations.get_mut(&id), at))
    }

    async fn soft_delete_activity(&self, id: ActivityId, at: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        Ok(self.mark_deleted(tables.activities.get_mut(&id), at))
    }
}

impl InMemoryStore {
    fn mark_deleted<T>(&self, row: Option<&mut Row<T>>, at: DateTime<Utc>) -> u64 {
        match row {
            Some(row) if row.is_live() => {
                row.deleted_at = Some(at);
                self.stats.writes.fetch_add(1, Ordering::SeqCst);
                1
            }
            _ => 0,
        }
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

/// A transaction on the in-memory store.
///
/// Holds the table lock for its whole lifetime. Writes go to a staged copy
/// that replaces the tables on commit.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    pending_writes: usize,
    stats: Arc<Stats>,
}

impl InMemoryTransaction {
    async fn exec_delay(&self) {
        let delay = self.stats.exec_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn parent_is_live_itinerary(&self, id: ItineraryId) -> bool {
        self.staged
            .itineraries
            .get(&id)
            .is_some_and(|row| row.is_live())
    }

    fn parent_is_live_destination(&self, id: DestinationId) -> bool {
        self.staged
            .destinations
            .get(&id)
            .is_some_and(|row| row.is_live())
    }
}

#[async_trait]
impl ItineraryTransaction for InMemoryTransaction {
    async fn insert_itinerary(&mut self, itinerary: &Itinerary) -> Result<()> {
        self.exec_delay().await;
        self.staged
            .itineraries
            .insert(itinerary.id, Row::live(itinerary.clone()));
        self.pending_writes += 1;
        Ok(())
    }

    async fn insert_destination(&mut self, destination: &Destination) -> Result<()> {
        self.exec_delay().await;
        if !self.parent_is_live_itinerary(destination.itinerary_id) {
            return Err(StoreError::Unavailable(format!(
                "foreign key violation: itinerary {} does not exist",
                destination.itinerary_id
            )));
        }
        self.staged
            .destinations
            .insert(destination.id, Row::live(destination.clone()));
        self.pending_writes += 1;
        Ok(())
    }

    async fn insert_activity(&mut self, activity: &Activity) -> Result<()> {
        self.exec_delay().await;
        if !self.parent_is_live_destination(activity.destination_id) {
            return Err(StoreError::Unavailable(format!(
                "foreign key violation: destination {} does not exist",
                activity.destination_id
            )));
        }
        self.staged
            .activities
            .insert(activity.id, Row::live(activity.clone()));
        self.pending_writes += 1;
        Ok(())
    }

    async fn update_itinerary(
        &mut self,
        id: ItineraryId,
        fields: &ItineraryFields,
        updated_at: DateTime<Utc>,
    ) -> Result<u64> {
        self.exec_delay().await;
        match self.staged.itineraries.get_mut(&id) {
            Some(row) if row.is_live() => {
                row.value.fields = fields.clone();
                row.value.updated_at = updated_at;
                self.pending_writes += 1;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn update_destination(
        &mut self,
        itinerary_id: ItineraryId,
        id: DestinationId,
        fields: &DestinationFields,
    ) -> Result<u64> {
        self.exec_delay().await;
        match self.staged.destinations.get_mut(&id) {
            Some(row) if row.is_live() && row.value.itinerary_id == itinerary_id => {
                row.value.fields = fields.clone();
                self.pending_writes += 1;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn update_activity(
        &mut self,
        destination_id: DestinationId,
        id: ActivityId,
        activity: &str,
    ) -> Result<u64> {
        self.exec_delay().await;
        match self.staged.activities.get_mut(&id) {
            Some(row) if row.is_live() && row.value.destination_id == destination_id => {
                row.value.activity = activity.to_string();
                self.pending_writes += 1;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn commit(self) -> Result<()> {
        let InMemoryTransaction {
            mut guard,
            staged,
            pending_writes,
            stats,
        } = self;

        if stats.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit rejected".to_string()));
        }

        *guard = staged;
        stats.writes.fetch_add(pending_writes, Ordering::SeqCst);
        stats.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.stats.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl DestinationCatalog for InMemoryStore {
    async fn create_destination(&self, new: &NewRankedDestination) -> Result<RankedDestination> {
        let destination = RankedDestination {
            id: RankedDestinationId::new(),
            name: new.name.clone(),
            country: new.country.clone(),
            description: new.description.clone(),
            popularity_score: new.popularity_score,
        };
        self.tables
            .lock()
            .await
            .catalog
            .insert(destination.id, Row::live(destination.clone()));
        Ok(destination)
    }

    async fn top_destinations(&self, page: PageRequest) -> Result<Vec<RankedDestination>> {
        if self.stats.fail_on_query.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("query rejected".to_string()));
        }
        self.stats.ranking_queries.fetch_add(1, Ordering::SeqCst);

        let tables = self.tables.lock().await;
        let mut ranked: Vec<RankedDestination> = tables
            .catalog
            .values()
            .filter(|row| row.is_live())
            .map(|row| row.value.clone())
            .collect();
        ranked.sort_by(|a, b| {
            b.popularity_score
                .cmp(&a.popularity_score)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(paginate(ranked, page))
    }
}
