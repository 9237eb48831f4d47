//! Relational store for itineraries, their nested destinations/activities,
//! and the destination catalog the ranking is computed from.
//!
//! Two implementations share the [`ItineraryStore`] and [`DestinationCatalog`]
//! traits: [`PostgresStore`] (sqlx) and [`InMemoryStore`] for tests.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{ActivityId, DestinationId, ItineraryId, RankedDestinationId, UserId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use model::{
    Activity, Destination, DestinationDetails, DestinationFields, Itinerary, ItineraryFields,
    NewRankedDestination, RankedDestination,
};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use query::PageRequest;
pub use store::{DestinationCatalog, ItineraryStore, ItineraryTransaction};
