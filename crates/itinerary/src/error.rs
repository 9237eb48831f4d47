//! Itinerary error types.

use common::UserId;
use store::StoreError;
use thiserror::Error;
use uuid::Uuid;

use crate::services::IdentityError;

/// The kind of row a [`ItineraryError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Itinerary,
    Destination,
    Activity,
    Author,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Itinerary => "itinerary",
            EntityKind::Destination => "destination",
            EntityKind::Activity => "activity",
            EntityKind::Author => "author",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during itinerary operations.
#[derive(Debug, Error)]
pub enum ItineraryError {
    /// The acting identity is invalid or could not be verified.
    #[error("Unauthorized user {user_id}: {reason}")]
    Unauthorized { user_id: UserId, reason: String },

    /// A referenced row is missing, soft-deleted, or not owned by its
    /// expected parent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: Uuid },

    /// The store failed (begin, exec, query or commit).
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The identity service failed while resolving author info.
    #[error("Identity service error: {0}")]
    Identity(IdentityError),

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ItineraryError {
    /// Builds a [`ItineraryError::NotFound`] for any id type.
    pub fn not_found(entity: EntityKind, id: impl Into<Uuid>) -> Self {
        ItineraryError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Convenience type alias for itinerary results.
pub type Result<T> = std::result::Result<T, ItineraryError>;
