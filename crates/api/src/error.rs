//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use itinerary::ItineraryError;
use ranking::RankingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Itinerary coordination or query error.
    Itinerary(ItineraryError),
    /// Ranking service error.
    Ranking(RankingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Itinerary(err) => itinerary_error_to_response(err),
            ApiError::Ranking(err) => ranking_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn itinerary_error_to_response(err: ItineraryError) -> (StatusCode, String) {
    match &err {
        ItineraryError::Unauthorized { .. } => (StatusCode::FORBIDDEN, err.to_string()),
        ItineraryError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ItineraryError::Identity(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        ItineraryError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        ItineraryError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn ranking_error_to_response(err: RankingError) -> (StatusCode, String) {
    match &err {
        RankingError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        RankingError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        RankingError::Cache(_) | RankingError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<ItineraryError> for ApiError {
    fn from(err: ItineraryError) -> Self {
        ApiError::Itinerary(err)
    }
}

impl From<RankingError> for ApiError {
    fn from(err: RankingError) -> Self {
        ApiError::Ranking(err)
    }
}
