//! Itinerary CRUD and edit endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{ActivityId, DestinationId, ItineraryId, UserId};
use itinerary::{
    CreateItinerary, CreatedItinerary, DestinationEdit, EditItinerary, EditedItinerary,
    IdentityValidator, ItineraryFullInfo, ItineraryPage,
};
use ranking::RankingCache;
use serde::Deserialize;
use store::ItineraryFields;

use super::{PageQuery, parse_id};
use crate::error::ApiError;
use crate::{AppState, ContentStore};

// -- Request types --

/// Body of `PUT /itineraries/{id}`; the itinerary id comes from the path.
#[derive(Deserialize)]
pub struct EditItineraryRequest {
    pub editor_id: UserId,
    #[serde(flatten)]
    pub fields: ItineraryFields,
    #[serde(default)]
    pub destinations: Vec<DestinationEdit>,
}

#[derive(Debug, Deserialize)]
pub struct EditorQuery {
    pub editor_id: String,
}

// -- Handlers --

/// POST /itineraries: create an itinerary with its destinations and activities.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Json(req): Json<CreateItinerary>,
) -> Result<(StatusCode, Json<CreatedItinerary>), ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let created = state
        .coordinator
        .create_itinerary(req, &state.request_token())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /itineraries: list live itineraries with author details.
#[tracing::instrument(skip(state))]
pub async fn list<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ItineraryPage>, ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let page = state
        .queries
        .list_itineraries(query.into_request(), &state.request_token())
        .await?;
    Ok(Json(page))
}

/// GET /itineraries/{id}: itinerary with author, destinations and activities.
#[tracing::instrument(skip(state))]
pub async fn get<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Path(id): Path<String>,
) -> Result<Json<ItineraryFullInfo>, ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let id: ItineraryId = parse_id(&id, "itinerary id")?;
    let info = state
        .queries
        .get_itinerary(id, &state.request_token())
        .await?;
    Ok(Json(info))
}

/// PUT /itineraries/{id}: apply a nested edit atomically.
#[tracing::instrument(skip(state, req))]
pub async fn edit<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Path(id): Path<String>,
    Json(req): Json<EditItineraryRequest>,
) -> Result<Json<EditedItinerary>, ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let id: ItineraryId = parse_id(&id, "itinerary id")?;
    let edit = EditItinerary {
        id,
        editor_id: req.editor_id,
        fields: req.fields,
        destinations: req.destinations,
    };
    let edited = state
        .coordinator
        .edit_itinerary(edit, &state.request_token())
        .await?;
    Ok(Json(edited))
}

/// DELETE /itineraries/{id}?editor_id=: soft-delete an itinerary.
#[tracing::instrument(skip(state))]
pub async fn delete<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Path(id): Path<String>,
    Query(query): Query<EditorQuery>,
) -> Result<StatusCode, ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let id: ItineraryId = parse_id(&id, "itinerary id")?;
    let editor_id: UserId = parse_id(&query.editor_id, "editor_id")?;
    state
        .coordinator
        .delete_itinerary(id, editor_id, &state.request_token())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /itineraries/destinations/{id}?editor_id=: soft-delete a destination.
#[tracing::instrument(skip(state))]
pub async fn delete_destination<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Path(id): Path<String>,
    Query(query): Query<EditorQuery>,
) -> Result<StatusCode, ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let id: DestinationId = parse_id(&id, "destination id")?;
    let editor_id: UserId = parse_id(&query.editor_id, "editor_id")?;
    state
        .coordinator
        .delete_destination(id, editor_id, &state.request_token())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /itineraries/activities/{id}?editor_id=: soft-delete an activity.
#[tracing::instrument(skip(state))]
pub async fn delete_activity<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
    Path(id): Path<String>,
    Query(query): Query<EditorQuery>,
) -> Result<StatusCode, ApiError>
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let id: ActivityId = parse_id(&id, "activity id")?;
    let editor_id: UserId = parse_id(&query.editor_id, "editor_id")?;
    state
        .coordinator
        .delete_activity(id, editor_id, &state.request_token())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
