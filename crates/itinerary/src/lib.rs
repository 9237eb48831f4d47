//! Itinerary coordination: identity-checked, all-or-nothing edits of the
//! itinerary → destinations → activities hierarchy.
//!
//! An edit follows these steps:
//! 1. Validate the editing identity (before any transaction is opened)
//! 2. Update the itinerary row
//! 3. Update each destination, then each of its activities, in input order
//! 4. Commit, or roll back everything if any row fails to match

pub mod coordinator;
pub mod error;
pub mod query;
pub mod request;
pub mod services;

pub use coordinator::ItineraryCoordinator;
pub use error::{EntityKind, ItineraryError, Result};
pub use query::ItineraryQueryService;
pub use request::{
    ActivityEdit, CreateItinerary, CreatedItinerary, DestinationEdit, EditItinerary,
    EditedItinerary, ItineraryFullInfo, ItineraryPage, ItinerarySummary, NewDestination,
};
pub use services::{
    AuthorInfo, HttpIdentityValidator, IdentityError, IdentityValidator,
    InMemoryIdentityValidator,
};
