//! Requests accepted and views returned by the itinerary services.

use chrono::{DateTime, Utc};
use common::{ActivityId, DestinationId, ItineraryId, UserId};
use serde::{Deserialize, Serialize};
use store::{DestinationDetails, DestinationFields, Itinerary, ItineraryFields};

use crate::services::AuthorInfo;

/// New text for one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEdit {
    pub id: ActivityId,
    pub activity: String,
}

/// New values for one destination and the activities nested under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationEdit {
    pub id: DestinationId,
    #[serde(flatten)]
    pub fields: DestinationFields,
    #[serde(default)]
    pub activities: Vec<ActivityEdit>,
}

/// A whole-hierarchy edit, applied atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditItinerary {
    pub id: ItineraryId,
    pub editor_id: UserId,
    #[serde(flatten)]
    pub fields: ItineraryFields,
    #[serde(default)]
    pub destinations: Vec<DestinationEdit>,
}

/// The itinerary as written by a successful edit.
///
/// Built from the submitted values, not re-read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedItinerary {
    pub id: ItineraryId,
    pub editor_id: UserId,
    #[serde(flatten)]
    pub fields: ItineraryFields,
    pub updated_at: DateTime<Utc>,
}

/// A destination to create, with its activities in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDestination {
    #[serde(flatten)]
    pub fields: DestinationFields,
    #[serde(default)]
    pub activities: Vec<String>,
}

/// Request to create an itinerary with its whole hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItinerary {
    pub author_id: UserId,
    #[serde(flatten)]
    pub fields: ItineraryFields,
    #[serde(default)]
    pub destinations: Vec<NewDestination>,
}

/// The rows written by a successful creation, with generated ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedItinerary {
    pub itinerary: Itinerary,
    pub destinations: Vec<DestinationDetails>,
}

/// One entry of the itinerary listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItinerarySummary {
    pub id: ItineraryId,
    pub title: String,
    pub author: AuthorInfo,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
}

impl ItinerarySummary {
    pub(crate) fn new(itinerary: Itinerary, author: AuthorInfo) -> Self {
        Self {
            id: itinerary.id,
            title: itinerary.fields.title,
            author,
            start_date: itinerary.fields.start_date,
            end_date: itinerary.fields.end_date,
            likes_count: itinerary.likes_count,
            comments_count: itinerary.comments_count,
            created_at: itinerary.created_at,
        }
    }
}

/// A page of the itinerary listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryPage {
    pub itineraries: Vec<ItinerarySummary>,
    pub total: i64,
    pub limit: u32,
    pub page: u32,
}

/// An itinerary with its author and live destinations/activities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryFullInfo {
    pub itinerary: Itinerary,
    pub author: AuthorInfo,
    pub destinations: Vec<DestinationDetails>,
}
