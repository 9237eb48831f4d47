//! Destination catalog and top destinations endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use itinerary::IdentityValidator;
use ranking::{RankedDestinationPage, RankingCache, TopDestination};
use store::NewRankedDestination;

use super::PageQuery;
use crate::error::ApiError;
use crate::{AppState, ContentStore};

/// POST /destinations: add a destination to the catalog.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Json(req): Json<NewRankedDestination>,
) -> Result<(StatusCode, Json<TopDestination>), ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let created = state
        .ranking
        .create_destination(&req, &state.request_token())
        .await?;
    Ok((StatusCode::CREATED, Json(TopDestination::from(created))))
}

/// GET /destinations/top: top destinations, served from the cache when possible.
#[tracing::instrument(skip(state))]
pub async fn top<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<RankedDestinationPage>, ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let page = state
        .ranking
        .get_top_destinations(query.into_request(), &state.request_token())
        .await?;
    Ok(Json(page))
}

/// POST /destinations/top/refresh: recompute the ranking and replace the snapshot.
#[tracing::instrument(skip(state))]
pub async fn refresh<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<RankedDestinationPage>, ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let page = state
        .ranking
        .refresh_top_destinations(query.into_request(), &state.request_token())
        .await?;
    Ok(Json(page))
}
