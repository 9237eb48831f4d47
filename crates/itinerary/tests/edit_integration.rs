//! Integration tests for itinerary edits through the coordinator.

use std::time::Duration;

use chrono::NaiveDate;
use itinerary::{
    ActivityEdit, CreateItinerary, CreatedItinerary, DestinationEdit, EditItinerary, EntityKind,
    InMemoryIdentityValidator, ItineraryCoordinator, ItineraryError, ItineraryQueryService,
    NewDestination,
};
use store::{
    DestinationFields, InMemoryStore, ItineraryFields, ItineraryStore, PageRequest, UserId,
};
use tokio_util::sync::CancellationToken;

type TestCoordinator = ItineraryCoordinator<InMemoryStore, InMemoryIdentityValidator>;

struct TestHarness {
    coordinator: TestCoordinator,
    queries: ItineraryQueryService<InMemoryStore, InMemoryIdentityValidator>,
    store: InMemoryStore,
    identity: InMemoryIdentityValidator,
    user: UserId,
}

impl TestHarness {
    async fn new() -> Self {
        let store = InMemoryStore::new();
        let identity = InMemoryIdentityValidator::new();
        let user = identity.register("nomad").await;

        Self {
            coordinator: ItineraryCoordinator::new(store.clone(), identity.clone()),
            queries: ItineraryQueryService::new(store.clone(), identity.clone()),
            store,
            identity,
            user,
        }
    }

    /// Creates IT1 with D1 (activity A1) and D2 (no activities).
    async fn create_trip(&self) -> CreatedItinerary {
        self.coordinator
            .create_itinerary(
                CreateItinerary {
                    author_id: self.user,
                    fields: itinerary_fields("IT1"),
                    destinations: vec![
                        NewDestination {
                            fields: destination_fields("D1"),
                            activities: vec!["A1".to_string()],
                        },
                        NewDestination {
                            fields: destination_fields("D2"),
                            activities: vec![],
                        },
                    ],
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap()
    }

    /// Builds a rename of IT1, D1 and A1 from the created rows.
    fn rename_edit(&self, trip: &CreatedItinerary) -> EditItinerary {
        let d1 = &trip.destinations[0];
        EditItinerary {
            id: trip.itinerary.id,
            editor_id: self.user,
            fields: itinerary_fields("IT1 renamed"),
            destinations: vec![DestinationEdit {
                id: d1.destination.id,
                fields: destination_fields("D1 renamed"),
                activities: vec![ActivityEdit {
                    id: d1.activities[0].id,
                    activity: "A1 renamed".to_string(),
                }],
            }],
        }
    }

    async fn title(&self, trip: &CreatedItinerary) -> String {
        self.store
            .get_itinerary(trip.itinerary.id)
            .await
            .unwrap()
            .unwrap()
            .fields
            .title
    }

    async fn d1_name(&self, trip: &CreatedItinerary) -> String {
        self.store
            .get_destination(trip.destinations[0].destination.id)
            .await
            .unwrap()
            .fields
            .name
    }

    async fn a1_text(&self, trip: &CreatedItinerary) -> String {
        self.store
            .get_activity(trip.destinations[0].activities[0].id)
            .await
            .unwrap()
            .activity
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

fn itinerary_fields(title: &str) -> ItineraryFields {
    ItineraryFields {
        title: title.to_string(),
        description: "spring loop".to_string(),
        start_date: date(1),
        end_date: date(10),
    }
}

fn destination_fields(name: &str) -> DestinationFields {
    DestinationFields {
        name: name.to_string(),
        start_date: date(2),
        end_date: date(4),
    }
}

#[tokio::test]
async fn test_full_edit_commits_once() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    let begins = h.store.begin_count();
    let commits = h.store.commit_count();

    let edited = h
        .coordinator
        .edit_itinerary(h.rename_edit(&trip), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(edited.id, trip.itinerary.id);
    assert_eq!(edited.editor_id, h.user);
    assert_eq!(edited.fields.title, "IT1 renamed");
    assert_eq!(h.store.begin_count() - begins, 1);
    assert_eq!(h.store.commit_count() - commits, 1);
    assert_eq!(h.store.rollback_count(), 0);

    assert_eq!(h.title(&trip).await, "IT1 renamed");
    assert_eq!(h.d1_name(&trip).await, "D1 renamed");
    assert_eq!(h.a1_text(&trip).await, "A1 renamed");
}

#[tokio::test]
async fn test_unknown_activity_rolls_back_everything() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    let mut edit = h.rename_edit(&trip);
    let unknown = ActivityEdit {
        id: store::ActivityId::new(),
        activity: "ghost".to_string(),
    };
    let unknown_id = unknown.id;
    edit.destinations[0].activities = vec![unknown];

    let result = h
        .coordinator
        .edit_itinerary(edit, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(ItineraryError::NotFound { entity: EntityKind::Activity, id }) if id == unknown_id.as_uuid()
    ));
    assert_eq!(h.store.rollback_count(), 1);
    assert_eq!(h.title(&trip).await, "IT1");
    assert_eq!(h.d1_name(&trip).await, "D1");
    assert_eq!(h.a1_text(&trip).await, "A1");
}

#[tokio::test]
async fn test_invalid_identity_never_opens_a_transaction() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    let begins = h.store.begin_count();
    let writes = h.store.write_count();
    h.identity.deactivate(h.user).await;

    let result = h
        .coordinator
        .edit_itinerary(h.rename_edit(&trip), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ItineraryError::Unauthorized { .. })));
    assert_eq!(h.store.begin_count(), begins);
    assert_eq!(h.store.write_count(), writes);
    assert_eq!(h.title(&trip).await, "IT1");
}

#[tokio::test]
async fn test_identity_outage_is_unauthorized() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    let begins = h.store.begin_count();
    h.identity.set_fail(true);

    let result = h
        .coordinator
        .edit_itinerary(h.rename_edit(&trip), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ItineraryError::Unauthorized { .. })));
    assert_eq!(h.store.begin_count(), begins);
}

#[tokio::test]
async fn test_resubmitting_an_edit_is_idempotent() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    let cancel = CancellationToken::new();

    h.coordinator
        .edit_itinerary(h.rename_edit(&trip), &cancel)
        .await
        .unwrap();
    let first = h
        .queries
        .get_itinerary(trip.itinerary.id, &cancel)
        .await
        .unwrap();
    h.coordinator
        .edit_itinerary(h.rename_edit(&trip), &cancel)
        .await
        .unwrap();
    let second = h
        .queries
        .get_itinerary(trip.itinerary.id, &cancel)
        .await
        .unwrap();

    assert_eq!(first.itinerary.fields, second.itinerary.fields);
    assert_eq!(first.destinations, second.destinations);
    assert!(second.itinerary.updated_at >= first.itinerary.updated_at);
}

#[tokio::test]
async fn test_edit_advances_updated_at() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;

    let edited = h
        .coordinator
        .edit_itinerary(h.rename_edit(&trip), &CancellationToken::new())
        .await
        .unwrap();

    assert!(edited.updated_at >= trip.itinerary.updated_at);
    let stored = h
        .store
        .get_itinerary(trip.itinerary.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.updated_at, edited.updated_at);
    assert_eq!(stored.created_at, trip.itinerary.created_at);
}

#[tokio::test]
async fn test_soft_deleted_destination_is_not_found() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    let cancel = CancellationToken::new();
    h.coordinator
        .delete_destination(trip.destinations[0].destination.id, h.user, &cancel)
        .await
        .unwrap();

    let result = h
        .coordinator
        .edit_itinerary(h.rename_edit(&trip), &cancel)
        .await;

    assert!(matches!(
        result,
        Err(ItineraryError::NotFound {
            entity: EntityKind::Destination,
            ..
        })
    ));
    assert_eq!(h.title(&trip).await, "IT1");
}

#[tokio::test]
async fn test_destination_of_another_itinerary_is_not_found() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    let other = h.create_trip().await;
    let mut edit = h.rename_edit(&trip);
    edit.destinations = vec![DestinationEdit {
        id: other.destinations[1].destination.id,
        fields: destination_fields("stolen"),
        activities: vec![],
    }];

    let result = h
        .coordinator
        .edit_itinerary(edit, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(ItineraryError::NotFound {
            entity: EntityKind::Destination,
            ..
        })
    ));
    assert_eq!(h.title(&trip).await, "IT1");
    let untouched = h
        .store
        .get_destination(other.destinations[1].destination.id)
        .await
        .unwrap();
    assert_eq!(untouched.fields.name, "D2");
}

#[tokio::test]
async fn test_cancellation_mid_edit_rolls_back() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    h.store.set_exec_delay(Duration::from_millis(200));
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let result = h
        .coordinator
        .edit_itinerary(h.rename_edit(&trip), &cancel)
        .await;
    canceller.await.unwrap();
    h.store.set_exec_delay(Duration::ZERO);

    assert!(matches!(result, Err(ItineraryError::Cancelled)));
    assert_eq!(h.store.rollback_count(), 1);
    assert_eq!(h.title(&trip).await, "IT1");
    assert_eq!(h.a1_text(&trip).await, "A1");
}

#[tokio::test]
async fn test_commit_failure_is_storage_error() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    h.store.set_fail_on_commit(true);

    let result = h
        .coordinator
        .edit_itinerary(h.rename_edit(&trip), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ItineraryError::Storage(_))));
    h.store.set_fail_on_commit(false);
    assert_eq!(h.title(&trip).await, "IT1");
}

#[tokio::test]
async fn test_create_then_list_and_get() {
    let h = TestHarness::new().await;
    let trip = h.create_trip().await;
    let cancel = CancellationToken::new();

    let page = h
        .queries
        .list_itineraries(PageRequest::first(10), &cancel)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.itineraries[0].id, trip.itinerary.id);
    assert_eq!(page.itineraries[0].author.display_name, "nomad");

    let info = h
        .queries
        .get_itinerary(trip.itinerary.id, &cancel)
        .await
        .unwrap();
    assert_eq!(info.destinations, trip.destinations);

    h.coordinator
        .delete_itinerary(trip.itinerary.id, h.user, &cancel)
        .await
        .unwrap();
    let page = h
        .queries
        .list_itineraries(PageRequest::first(10), &cancel)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(page.itineraries.is_empty());
}
