//! HTTP API server with observability for the travel content backend.
//!
//! Provides REST endpoints for itinerary editing and the top destinations
//! ranking, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use itinerary::{IdentityValidator, ItineraryCoordinator, ItineraryQueryService};
use metrics_exporter_prometheus::PrometheusHandle;
use ranking::{DestinationRankingService, RankingCache};
use store::{DestinationCatalog, ItineraryStore};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// A store that backs both the itinerary hierarchy and the catalog.
pub trait ContentStore: ItineraryStore + DestinationCatalog + Clone + 'static {}

impl<T> ContentStore for T where T: ItineraryStore + DestinationCatalog + Clone + 'static {}

/// Shared application state accessible from all handlers.
pub struct AppState<S, R, V>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    pub coordinator: ItineraryCoordinator<S, V>,
    pub queries: ItineraryQueryService<S, V>,
    pub ranking: DestinationRankingService<S, R>,
    /// Cancelled on shutdown; every request works on a child token.
    pub shutdown: CancellationToken,
}

impl<S, R, V> AppState<S, R, V>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    /// Wires the services around one store, one cache and one identity client.
    pub fn new(store: S, cache: R, identity: V, shutdown: CancellationToken) -> Self {
        Self {
            coordinator: ItineraryCoordinator::new(store.clone(), identity.clone()),
            queries: ItineraryQueryService::new(store.clone(), identity),
            ranking: DestinationRankingService::new(store, cache),
            shutdown,
        }
    }

    pub(crate) fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, R, V>(state: Arc<AppState<S, R, V>>, metrics_handle: PrometheusHandle) -> Router
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health::<S, R, V>))
        .route(
            "/itineraries",
            post(routes::itineraries::create::<S, R, V>).get(routes::itineraries::list::<S, R, V>),
        )
        .route(
            "/itineraries/{id}",
            get(routes::itineraries::get::<S, R, V>)
                .put(routes::itineraries::edit::<S, R, V>)
                .delete(routes::itineraries::delete::<S, R, V>),
        )
        .route(
            "/itineraries/destinations/{id}",
            delete(routes::itineraries::delete_destination::<S, R, V>),
        )
        .route(
            "/itineraries/activities/{id}",
            delete(routes::itineraries::delete_activity::<S, R, V>),
        )
        .route("/destinations", post(routes::destinations::create::<S, R, V>))
        .route("/destinations/top", get(routes::destinations::top::<S, R, V>))
        .route(
            "/destinations/top/refresh",
            post(routes::destinations::refresh::<S, R, V>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
