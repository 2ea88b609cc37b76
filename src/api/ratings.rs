//! Rating endpoints. All of them require the session cookie.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde_json::Value;

use super::{json_body, relay, ProxyResult};
use crate::proxy::{ForwardRequest, RelayPolicy};
use crate::AppState;

/// GET /api/rating-history - The user's rated movies.
pub async fn rating_history(State(state): State<AppState>, headers: HeaderMap) -> ProxyResult {
    let request = ForwardRequest::get("/api/rating-history").cookies_from(&headers);
    relay(
        &state,
        request,
        RelayPolicy::Verbatim,
        "Failed to fetch rating history",
    )
    .await
}

/// POST /api/submit-ratings - `{ratings: {"rating_<id>": value}, movie_details?}`.
pub async fn submit_ratings(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ProxyResult {
    let body = json_body(body)?;
    let request = ForwardRequest::post("/api/submit-ratings")
        .cookies_from(&headers)
        .json(body);
    relay(
        &state,
        request,
        RelayPolicy::RequireSuccess,
        "Failed to submit ratings",
    )
    .await
}

/// POST /api/remove-rating - `{movie_id}`.
pub async fn remove_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ProxyResult {
    let body = json_body(body)?;
    let request = ForwardRequest::post("/api/remove-rating")
        .cookies_from(&headers)
        .json(body);
    relay(
        &state,
        request,
        RelayPolicy::Verbatim,
        "Internal server error",
    )
    .await
}

/// GET /api/user-stats - Aggregates over the user's ratings.
pub async fn user_stats(State(state): State<AppState>, headers: HeaderMap) -> ProxyResult {
    let request = ForwardRequest::get("/api/user-stats").cookies_from(&headers);
    relay(
        &state,
        request,
        RelayPolicy::RequireSuccess,
        "Failed to fetch user stats",
    )
    .await
}
