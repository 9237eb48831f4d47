//! Coordinator for identity-checked, transactional itinerary writes.

use std::future::Future;

use chrono::{DateTime, Utc};
use common::{ActivityId, DestinationId, ItineraryId, UserId};
use store::{
    Activity, Destination, DestinationDetails, Itinerary, ItineraryStore, ItineraryTransaction,
};
use tokio_util::sync::CancellationToken;

use crate::error::{EntityKind, ItineraryError, Result};
use crate::request::{CreateItinerary, CreatedItinerary, EditItinerary, EditedItinerary};
use crate::services::IdentityValidator;

/// Orchestrates writes to the itinerary hierarchy.
///
/// Every write validates the acting identity first, without holding a
/// transaction. Multi-row writes then run in a single store transaction
/// that commits only when every statement matched its row, and is rolled
/// back on any error or cancellation.
pub struct ItineraryCoordinator<S, V>
where
    S: ItineraryStore,
    V: IdentityValidator,
{
    store: S,
    identity: V,
}

impl<S, V> ItineraryCoordinator<S, V>
where
    S: ItineraryStore,
    V: IdentityValidator,
{
    /// Creates a new coordinator.
    pub fn new(store: S, identity: V) -> Self {
        Self { store, identity }
    }

    /// Returns a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Applies an edit to an itinerary, its destinations and their
    /// activities as one unit.
    ///
    /// Any destination or activity that does not resolve to a live row owned
    /// by its parent aborts the whole edit with `NotFound`, and nothing is
    /// written.
    #[tracing::instrument(
        skip(self, request, cancel),
        fields(itinerary_id = %request.id, editor_id = %request.editor_id, destinations = request.destinations.len())
    )]
    pub async fn edit_itinerary(
        &self,
        request: EditItinerary,
        cancel: &CancellationToken,
    ) -> Result<EditedItinerary> {
        let started = std::time::Instant::now();
        let outcome = self.run_edit(&request, cancel).await;

        let label = match &outcome {
            Ok(_) => "applied",
            Err(ItineraryError::Unauthorized { .. }) => "unauthorized",
            Err(ItineraryError::NotFound { .. }) => "not_found",
            Err(ItineraryError::Cancelled) => "cancelled",
            Err(_) => "failed",
        };
        metrics::counter!("itinerary_edits_total", "outcome" => label).increment(1);
        metrics::histogram!("itinerary_edit_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(edited) => tracing::info!(updated_at = %edited.updated_at, "itinerary edit applied"),
            Err(e) => tracing::warn!(error = %e, "itinerary edit rejected"),
        }
        outcome
    }

    async fn run_edit(
        &self,
        request: &EditItinerary,
        cancel: &CancellationToken,
    ) -> Result<EditedItinerary> {
        self.authorize(request.editor_id, cancel).await?;

        let updated_at = Utc::now();
        let mut tx = or_cancelled(cancel, self.store.begin()).await??;
        let applied = or_cancelled(cancel, apply_edit(&mut tx, request, updated_at))
            .await
            .and_then(|inner| inner);
        finish(tx, applied, cancel).await?;

        Ok(EditedItinerary {
            id: request.id,
            editor_id: request.editor_id,
            fields: request.fields.clone(),
            updated_at,
        })
    }

    /// Creates an itinerary with its destinations and activities in one
    /// transaction. Ids are generated here.
    #[tracing::instrument(skip(self, request, cancel), fields(author_id = %request.author_id))]
    pub async fn create_itinerary(
        &self,
        request: CreateItinerary,
        cancel: &CancellationToken,
    ) -> Result<CreatedItinerary> {
        self.authorize(request.author_id, cancel).await?;

        let created = build_rows(request, Utc::now());

        let mut tx = or_cancelled(cancel, self.store.begin()).await??;
        let inserted = or_cancelled(cancel, insert_rows(&mut tx, &created))
            .await
            .and_then(|inner| inner);
        finish(tx, inserted, cancel).await?;

        metrics::counter!("itineraries_created_total").increment(1);
        tracing::info!(itinerary_id = %created.itinerary.id, "itinerary created");
        Ok(created)
    }

    /// Soft-deletes an itinerary. Its children stay as they are but become
    /// unreachable through the itinerary.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn delete_itinerary(
        &self,
        id: ItineraryId,
        editor_id: UserId,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.authorize(editor_id, cancel).await?;
        let affected =
            or_cancelled(cancel, self.store.soft_delete_itinerary(id, Utc::now())).await??;
        expect_row(affected, EntityKind::Itinerary, id)
    }

    /// Soft-deletes a destination.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn delete_destination(
        &self,
        id: DestinationId,
        editor_id: UserId,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.authorize(editor_id, cancel).await?;
        let affected =
            or_cancelled(cancel, self.store.soft_delete_destination(id, Utc::now())).await??;
        expect_row(affected, EntityKind::Destination, id)
    }

    /// Soft-deletes an activity.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn delete_activity(
        &self,
        id: ActivityId,
        editor_id: UserId,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.authorize(editor_id, cancel).await?;
        let affected =
            or_cancelled(cancel, self.store.soft_delete_activity(id, Utc::now())).await??;
        expect_row(affected, EntityKind::Activity, id)
    }

    async fn authorize(&self, user_id: UserId, cancel: &CancellationToken) -> Result<()> {
        match or_cancelled(cancel, self.identity.validate_user(user_id)).await? {
            Ok(true) => Ok(()),
            Ok(false) => Err(ItineraryError::Unauthorized {
                user_id,
                reason: "identity is not valid".to_string(),
            }),
            Err(e) => Err(ItineraryError::Unauthorized {
                user_id,
                reason: e.to_string(),
            }),
        }
    }
}

/// Runs the edit statements in order: itinerary, then each destination
/// followed by its activities. Stops at the first row that does not match.
async fn apply_edit<T: ItineraryTransaction>(
    tx: &mut T,
    request: &EditItinerary,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    let affected = tx
        .update_itinerary(request.id, &request.fields, updated_at)
        .await?;
    expect_row(affected, EntityKind::Itinerary, request.id)?;

    for destination in &request.destinations {
        let affected = tx
            .update_destination(request.id, destination.id, &destination.fields)
            .await?;
        expect_row(affected, EntityKind::Destination, destination.id)?;

        for activity in &destination.activities {
            let affected = tx
                .update_activity(destination.id, activity.id, &activity.activity)
                .await?;
            expect_row(affected, EntityKind::Activity, activity.id)?;
        }
    }

    Ok(())
}

fn build_rows(request: CreateItinerary, now: DateTime<Utc>) -> CreatedItinerary {
    let itinerary = Itinerary::new(request.author_id, request.fields, now);

    let destinations: Vec<DestinationDetails> = request
        .destinations
        .into_iter()
        .zip(0..)
        .map(|(new, position)| {
            let destination = Destination {
                id: DestinationId::new(),
                itinerary_id: itinerary.id,
                position,
                fields: new.fields,
            };
            let activities = new
                .activities
                .into_iter()
                .zip(0..)
                .map(|(activity, position)| Activity {
                    id: ActivityId::new(),
                    destination_id: destination.id,
                    position,
                    activity,
                })
                .collect();
            DestinationDetails {
                destination,
                activities,
            }
        })
        .collect();

    CreatedItinerary {
        itinerary,
        destinations,
    }
}

async fn insert_rows<T: ItineraryTransaction>(tx: &mut T, rows: &CreatedItinerary) -> Result<()> {
    tx.insert_itinerary(&rows.itinerary).await?;
    for details in &rows.destinations {
        tx.insert_destination(&details.destination).await?;
        for activity in &details.activities {
            tx.insert_activity(activity).await?;
        }
    }
    Ok(())
}

/// Commits when `outcome` succeeded and the caller has not cancelled;
/// otherwise rolls back and returns the error.
async fn finish<T: ItineraryTransaction, R>(
    tx: T,
    outcome: Result<R>,
    cancel: &CancellationToken,
) -> Result<R> {
    let value = match outcome {
        Ok(_) if cancel.is_cancelled() => {
            rollback(tx).await;
            return Err(ItineraryError::Cancelled);
        }
        Ok(value) => value,
        Err(e) => {
            rollback(tx).await;
            return Err(e);
        }
    };

    tx.commit().await.map_err(|e| {
        tracing::error!(error = %e, "transaction commit failed");
        ItineraryError::Storage(e)
    })?;
    Ok(value)
}

async fn rollback<T: ItineraryTransaction>(tx: T) {
    if let Err(e) = tx.rollback().await {
        // The writes are discarded with the connection either way.
        tracing::warn!(error = %e, "transaction rollback failed");
    }
}

fn expect_row(affected: u64, entity: EntityKind, id: impl Into<uuid::Uuid>) -> Result<()> {
    if affected == 0 {
        return Err(ItineraryError::not_found(entity, id));
    }
    Ok(())
}

/// Races `fut` against the cancellation token.
pub(crate) async fn or_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ItineraryError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use store::{DestinationFields, InMemoryStore, ItineraryFields};

    use super::*;
    use crate::request::{ActivityEdit, DestinationEdit, NewDestination};
    use crate::services::InMemoryIdentityValidator;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, day).unwrap()
    }

    fn fields(title: &str) -> ItineraryFields {
        ItineraryFields {
            title: title.to_string(),
            description: "desc".to_string(),
            start_date: date(1),
            end_date: date(5),
        }
    }

    async fn setup() -> (
        ItineraryCoordinator<InMemoryStore, InMemoryIdentityValidator>,
        InMemoryStore,
        UserId,
    ) {
        let store = InMemoryStore::new();
        let identity = InMemoryIdentityValidator::new();
        let user = identity.register("traveller").await;
        (
            ItineraryCoordinator::new(store.clone(), identity),
            store,
            user,
        )
    }

    #[tokio::test]
    async fn create_assigns_positions_in_input_order() {
        let (coordinator, store, user) = setup().await;

        let created = coordinator
            .create_itinerary(
                CreateItinerary {
                    author_id: user,
                    fields: fields("Trip"),
                    destinations: vec![
                        NewDestination {
                            fields: DestinationFields {
                                name: "Tashkent".to_string(),
                                start_date: date(1),
                                end_date: date(2),
                            },
                            activities: vec!["bazaar".to_string(), "metro".to_string()],
                        },
                        NewDestination {
                            fields: DestinationFields {
                                name: "Samarkand".to_string(),
                                start_date: date(3),
                                end_date: date(5),
                            },
                            activities: vec![],
                        },
                    ],
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(store.commit_count(), 1);
        let details = store.get_destinations(created.itinerary.id).await.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].destination.position, 0);
        assert_eq!(details[1].destination.fields.name, "Samarkand");
        let activities: Vec<_> = details[0]
            .activities
            .iter()
            .map(|a| (a.position, a.activity.as_str()))
            .collect();
        assert_eq!(activities, vec![(0, "bazaar"), (1, "metro")]);
    }

    #[tokio::test]
    async fn edit_of_unknown_itinerary_rolls_back() {
        let (coordinator, store, user) = setup().await;
        let missing = ItineraryId::new();

        let result = coordinator
            .edit_itinerary(
                EditItinerary {
                    id: missing,
                    editor_id: user,
                    fields: fields("Nothing"),
                    destinations: vec![],
                },
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(ItineraryError::NotFound { entity: EntityKind::Itinerary, id }) if id == missing.as_uuid()
        ));
        assert_eq!(store.rollback_count(), 1);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn activity_under_wrong_destination_is_not_found() {
        let (coordinator, store, user) = setup().await;
        let cancel = CancellationToken::new();
        let created = coordinator
            .create_itinerary(
                CreateItinerary {
                    author_id: user,
                    fields: fields("Trip"),
                    destinations: vec![
                        NewDestination {
                            fields: DestinationFields {
                                name: "A".to_string(),
                                start_date: date(1),
                                end_date: date(2),
                            },
                            activities: vec!["a1".to_string()],
                        },
                        NewDestination {
                            fields: DestinationFields {
                                name: "B".to_string(),
                                start_date: date(3),
                                end_date: date(4),
                            },
                            activities: vec![],
                        },
                    ],
                },
                &cancel,
            )
            .await
            .unwrap();
        let a = &created.destinations[0];
        let b = &created.destinations[1];

        // a1 belongs to A, but is nested under B in the request.
        let result = coordinator
            .edit_itinerary(
                EditItinerary {
                    id: created.itinerary.id,
                    editor_id: user,
                    fields: fields("Renamed"),
                    destinations: vec![DestinationEdit {
                        id: b.destination.id,
                        fields: b.destination.fields.clone(),
                        activities: vec![ActivityEdit {
                            id: a.activities[0].id,
                            activity: "moved".to_string(),
                        }],
                    }],
                },
                &cancel,
            )
            .await;

        assert!(matches!(
            result,
            Err(ItineraryError::NotFound {
                entity: EntityKind::Activity,
                ..
            })
        ));
        let itinerary = store
            .get_itinerary(created.itinerary.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(itinerary.fields.title, "Trip");
    }

    #[tokio::test]
    async fn soft_delete_twice_is_not_found() {
        let (coordinator, _store, user) = setup().await;
        let cancel = CancellationToken::new();
        let created = coordinator
            .create_itinerary(
                CreateItinerary {
                    author_id: user,
                    fields: fields("Trip"),
                    destinations: vec![],
                },
                &cancel,
            )
            .await
            .unwrap();

        coordinator
            .delete_itinerary(created.itinerary.id, user, &cancel)
            .await
            .unwrap();
        let again = coordinator
            .delete_itinerary(created.itinerary.id, user, &cancel)
            .await;

        assert!(matches!(
            again,
            Err(ItineraryError::NotFound {
                entity: EntityKind::Itinerary,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn unauthorized_create_writes_nothing() {
        let (coordinator, store, _) = setup().await;

        let result = coordinator
            .create_itinerary(
                CreateItinerary {
                    author_id: UserId::new(),
                    fields: fields("Trip"),
                    destinations: vec![],
                },
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(ItineraryError::Unauthorized { .. })));
        assert_eq!(store.begin_count(), 0);
        assert_eq!(store.count_itineraries().await.unwrap(), 0);
    }
}
