//! Row types for the itinerary hierarchy and the destination catalog.

use chrono::{DateTime, NaiveDate, Utc};
use common::{ActivityId, DestinationId, ItineraryId, RankedDestinationId, UserId};
use serde::{Deserialize, Serialize};

/// The mutable fields of an itinerary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryFields {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// The mutable fields of a destination row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationFields {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A live itinerary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: ItineraryId,
    pub author_id: UserId,
    #[serde(flatten)]
    pub fields: ItineraryFields,
    /// Maintained by the interaction subsystem; read-only here.
    pub likes_count: i64,
    /// Maintained by the interaction subsystem; read-only here.
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Itinerary {
    /// Builds a fresh itinerary with a generated id and zeroed counters.
    pub fn new(author_id: UserId, fields: ItineraryFields, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ItineraryId::new(),
            author_id,
            fields,
            likes_count: 0,
            comments_count: 0,
            created_at,
            updated_at: created_at,
        }
    }
}

/// A live destination row, owned by an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub itinerary_id: ItineraryId,
    /// Position within the itinerary, assigned at creation.
    pub position: i32,
    #[serde(flatten)]
    pub fields: DestinationFields,
}

/// A live activity row, owned by a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub destination_id: DestinationId,
    /// Position within the destination, assigned at creation.
    pub position: i32,
    pub activity: String,
}

/// A destination together with its live activities, in position order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationDetails {
    pub destination: Destination,
    pub activities: Vec<Activity>,
}

/// A catalog destination as seen by the ranking.
///
/// `popularity_score` only drives ordering and is never handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedDestination {
    pub id: RankedDestinationId,
    pub name: String,
    pub country: String,
    pub description: String,
    pub popularity_score: i64,
}

/// Input for a new catalog destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRankedDestination {
    pub name: String,
    pub country: String,
    pub description: String,
    pub best_time_to_visit: String,
    pub average_cost_per_day: i64,
    pub currency: String,
    pub language: String,
    pub popularity_score: i64,
}
