use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ActivityId, DestinationId, ItineraryId};

use crate::{
    Activity, Destination, DestinationDetails, DestinationFields, Itinerary, ItineraryFields,
    NewRankedDestination, PageRequest, RankedDestination, Result,
};

/// Core trait for itinerary persistence.
///
/// Reads and soft deletes run directly against the store; anything that
/// touches more than one row goes through a [`ItineraryTransaction`] opened
/// with [`ItineraryStore::begin`]. Every read and write ignores rows whose
/// deletion marker is set.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    /// The transaction handle returned by [`ItineraryStore::begin`].
    type Transaction: ItineraryTransaction;

    /// Opens a transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Loads a live itinerary.
    async fn get_itinerary(&self, id: ItineraryId) -> Result<Option<Itinerary>>;

    /// Loads the live destinations of an itinerary with their live
    /// activities, both in position order.
    async fn get_destinations(&self, itinerary_id: ItineraryId)
    -> Result<Vec<DestinationDetails>>;

    /// Lists live itineraries, oldest first.
    async fn list_itineraries(&self, page: PageRequest) -> Result<Vec<Itinerary>>;

    /// Counts live itineraries.
    async fn count_itineraries(&self) -> Result<i64>;

    /// Sets the deletion marker on a live itinerary. Returns rows affected.
    async fn soft_delete_itinerary(&self, id: ItineraryId, at: DateTime<Utc>) -> Result<u64>;

    /// Sets the deletion marker on a live destination. Returns rows affected.
    async fn soft_delete_destination(&self, id: DestinationId, at: DateTime<Utc>) -> Result<u64>;

    /// Sets the deletion marker on a live activity. Returns rows affected.
    async fn soft_delete_activity(&self, id: ActivityId, at: DateTime<Utc>) -> Result<u64>;
}

/// A unit of work against the itinerary tables.
///
/// `commit` and `rollback` consume the transaction, so nothing can be
/// committed once a rollback has been issued. Dropping a transaction
/// without finishing it discards its writes.
///
/// Update methods return the number of rows affected; zero means the
/// target row is missing, soft-deleted, or not owned by the given parent.
#[async_trait]
pub trait ItineraryTransaction: Send {
    /// Inserts a new itinerary row.
    async fn insert_itinerary(&mut self, itinerary: &Itinerary) -> Result<()>;

    /// Inserts a new destination row.
    async fn insert_destination(&mut self, destination: &Destination) -> Result<()>;

    /// Inserts a new activity row.
    async fn insert_activity(&mut self, activity: &Activity) -> Result<()>;

    /// Updates the mutable fields and `updated_at` of a live itinerary.
    async fn update_itinerary(
        &mut self,
        id: ItineraryId,
        fields: &ItineraryFields,
        updated_at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Updates a live destination owned by `itinerary_id`.
    async fn update_destination(
        &mut self,
        itinerary_id: ItineraryId,
        id: DestinationId,
        fields: &DestinationFields,
    ) -> Result<u64>;

    /// Updates a live activity owned by `destination_id`.
    async fn update_activity(
        &mut self,
        destination_id: DestinationId,
        id: ActivityId,
        activity: &str,
    ) -> Result<u64>;

    /// Makes every write in this transaction durable.
    async fn commit(self) -> Result<()>;

    /// Discards every write in this transaction.
    async fn rollback(self) -> Result<()>;
}

/// Read/write access to the destination catalog the ranking is built from.
#[async_trait]
pub trait DestinationCatalog: Send + Sync {
    /// Inserts a catalog destination with a generated id.
    async fn create_destination(&self, new: &NewRankedDestination) -> Result<RankedDestination>;

    /// Returns live catalog destinations ordered by popularity, highest
    /// first, ties broken by name.
    async fn top_destinations(&self, page: PageRequest) -> Result<Vec<RankedDestination>>;
}
