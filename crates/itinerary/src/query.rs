//! Read side of the itinerary hierarchy.

use common::{ItineraryId, UserId};
use futures_util::future::try_join_all;
use store::{ItineraryStore, PageRequest};
use tokio_util::sync::CancellationToken;

use crate::coordinator::or_cancelled;
use crate::error::{EntityKind, ItineraryError, Result};
use crate::request::{ItineraryFullInfo, ItineraryPage, ItinerarySummary};
use crate::services::{AuthorInfo, IdentityError, IdentityValidator};

/// Serves itinerary listings and full views, resolving author details
/// through the identity service.
pub struct ItineraryQueryService<S, V>
where
    S: ItineraryStore,
    V: IdentityValidator,
{
    store: S,
    identity: V,
}

impl<S, V> ItineraryQueryService<S, V>
where
    S: ItineraryStore,
    V: IdentityValidator,
{
    pub fn new(store: S, identity: V) -> Self {
        Self { store, identity }
    }

    /// Lists live itineraries oldest first, with the total live count.
    #[tracing::instrument(skip(self, cancel), fields(limit = page.limit, page = page.page))]
    pub async fn list_itineraries(
        &self,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<ItineraryPage> {
        let itineraries = or_cancelled(cancel, self.store.list_itineraries(page)).await??;
        let total = or_cancelled(cancel, self.store.count_itineraries()).await??;

        let authors = try_join_all(
            itineraries
                .iter()
                .map(|itinerary| self.author(itinerary.author_id, cancel)),
        )
        .await?;
        let summaries: Vec<ItinerarySummary> = itineraries
            .into_iter()
            .zip(authors)
            .map(|(itinerary, author)| ItinerarySummary::new(itinerary, author))
            .collect();

        tracing::debug!(returned = summaries.len(), total, "itineraries listed");
        Ok(ItineraryPage {
            itineraries: summaries,
            total,
            limit: page.limit,
            page: page.page,
        })
    }

    /// Returns an itinerary with its author and live destinations and
    /// activities, in position order.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_itinerary(
        &self,
        id: ItineraryId,
        cancel: &CancellationToken,
    ) -> Result<ItineraryFullInfo> {
        let itinerary = or_cancelled(cancel, self.store.get_itinerary(id))
            .await??
            .ok_or_else(|| ItineraryError::not_found(EntityKind::Itinerary, id))?;
        let destinations = or_cancelled(cancel, self.store.get_destinations(id)).await??;
        let author = self.author(itinerary.author_id, cancel).await?;

        Ok(ItineraryFullInfo {
            itinerary,
            author,
            destinations,
        })
    }

    async fn author(&self, user_id: UserId, cancel: &CancellationToken) -> Result<AuthorInfo> {
        or_cancelled(cancel, self.identity.get_author_info(user_id))
            .await?
            .map_err(|e| match e {
                IdentityError::NotFound(id) => ItineraryError::not_found(EntityKind::Author, id),
                other => {
                    tracing::error!(error = %other, "author lookup failed");
                    ItineraryError::Identity(other)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};
    use store::{Destination, DestinationFields, InMemoryStore, Itinerary, ItineraryFields};

    use super::*;
    use crate::services::InMemoryIdentityValidator;

    fn itinerary(author: UserId, title: &str, minutes_ago: i64) -> Itinerary {
        let day = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        Itinerary::new(
            author,
            ItineraryFields {
                title: title.to_string(),
                description: String::new(),
                start_date: day,
                end_date: day,
            },
            Utc::now() - Duration::minutes(minutes_ago),
        )
    }

    #[tokio::test]
    async fn list_resolves_authors_and_counts_all() {
        let store = InMemoryStore::new();
        let identity = InMemoryIdentityValidator::new();
        let alice = identity.register("alice").await;
        let bob = identity.register("bob").await;
        store.insert_itinerary(itinerary(alice, "First", 30)).await;
        store.insert_itinerary(itinerary(bob, "Second", 20)).await;
        store.insert_itinerary(itinerary(alice, "Third", 10)).await;
        let service = ItineraryQueryService::new(store, identity);

        let page = service
            .list_itineraries(PageRequest::new(2, 0), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        let titles: Vec<_> = page.itineraries.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(page.itineraries[1].author.display_name, "bob");
    }

    #[tokio::test]
    async fn full_info_orders_destinations_by_position() {
        let store = InMemoryStore::new();
        let identity = InMemoryIdentityValidator::new();
        let author = identity.register("carol").await;
        let trip = itinerary(author, "Trip", 0);
        let day = trip.fields.start_date;
        for (position, name) in [(1, "Khiva"), (0, "Bukhara")] {
            store
                .insert_destination(Destination {
                    id: common::DestinationId::new(),
                    itinerary_id: trip.id,
                    position,
                    fields: DestinationFields {
                        name: name.to_string(),
                        start_date: day,
                        end_date: day,
                    },
                })
                .await;
        }
        let id = trip.id;
        store.insert_itinerary(trip).await;
        let service = ItineraryQueryService::new(store, identity);

        let info = service
            .get_itinerary(id, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(info.author.display_name, "carol");
        let names: Vec<_> = info
            .destinations
            .iter()
            .map(|d| d.destination.fields.name.as_str())
            .collect();
        assert_eq!(names, vec!["Bukhara", "Khiva"]);
    }

    #[tokio::test]
    async fn missing_itinerary_is_not_found() {
        let service =
            ItineraryQueryService::new(InMemoryStore::new(), InMemoryIdentityValidator::new());

        let result = service
            .get_itinerary(ItineraryId::new(), &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(ItineraryError::NotFound {
                entity: EntityKind::Itinerary,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn unknown_author_is_not_found() {
        let store = InMemoryStore::new();
        let trip = itinerary(UserId::new(), "Orphan", 0);
        let id = trip.id;
        store.insert_itinerary(trip).await;
        let service = ItineraryQueryService::new(store, InMemoryIdentityValidator::new());

        let result = service.get_itinerary(id, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(ItineraryError::NotFound {
                entity: EntityKind::Author,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn identity_outage_is_surfaced() {
        let store = InMemoryStore::new();
        let identity = InMemoryIdentityValidator::new();
        let author = identity.register("dave").await;
        store.insert_itinerary(itinerary(author, "Trip", 0)).await;
        identity.set_fail(true);
        let service = ItineraryQueryService::new(store, identity);

        let result = service
            .list_itineraries(PageRequest::first(10), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ItineraryError::Identity(_))));
    }
}
