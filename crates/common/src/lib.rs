//! Shared identifier types for the travel content backend.

pub mod ids;

pub use ids::{ActivityId, DestinationId, ItineraryId, RankedDestinationId, UserId};
