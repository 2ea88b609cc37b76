//! Catalog endpoints: popular movies, details lookup, rating pages, search and recommendations.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{query_params, relay, ProxyResult};
use crate::errors::AppError;
use crate::models::SearchResults;
use crate::proxy::{ForwardRequest, RelayPolicy};
use crate::AppState;

/// Query parameters of the details lookup.
#[derive(Debug, Deserialize)]
pub struct MovieDetailsQuery {
    /// Comma-joined movie ids.
    pub ids: Option<String>,
}

/// Query parameters of paginated listings.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Query parameters of the title search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
}

/// GET /api/popular-movies - Catalog sample for the home page. No session needed.
pub async fn popular_movies(State(state): State<AppState>, headers: HeaderMap) -> ProxyResult {
    let request = ForwardRequest::get("/api/popular-movies").cookies_from(&headers);
    relay(
        &state,
        request,
        RelayPolicy::RequireSuccess,
        "Failed to fetch popular movies",
    )
    .await
}

/// GET /api/movie-details?ids=1,2 - Batched lookup by id.
pub async fn movie_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<MovieDetailsQuery>,
) -> ProxyResult {
    let ids = params
        .ids
        .filter(|ids| !ids.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Movie IDs are required".to_string()))?;

    let request = ForwardRequest::get("/api/movie-details")
        .query("ids", &ids)
        .cookies_from(&headers)
        .scrub_non_finite();
    relay(
        &state,
        request,
        RelayPolicy::RequireSuccess,
        "Failed to fetch movie details",
    )
    .await
}

/// GET /api/rate-movies?page=N - One page of movies to rate.
pub async fn rate_movies(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PageQuery>,
) -> ProxyResult {
    let page = params.page.unwrap_or_else(|| "1".to_string());
    let request = ForwardRequest::get("/api/rate-movies")
        .query("page", &page)
        .cookies_from(&headers)
        .scrub_non_finite();
    relay(
        &state,
        request,
        RelayPolicy::RequireSuccess,
        "Failed to fetch rate movies",
    )
    .await
}

/// GET /api/search-movies?q=...&page=N - Title search. A blank query is answered locally.
pub async fn search_movies(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let params = query_params(params)?;
    let page = params.page.unwrap_or(1);
    let query = params.q.trim();
    if query.is_empty() {
        return Ok(Json(SearchResults::empty(query, page)).into_response());
    }

    let request = ForwardRequest::get("/api/search-movies")
        .query("q", query)
        .query("page", &page.to_string())
        .cookies_from(&headers);
    let response = relay(
        &state,
        request,
        RelayPolicy::Verbatim,
        "Failed to search movies",
    )
    .await?;
    Ok(response.into_response())
}

/// GET /api/recommendations - Personalized recommendations plus the ratings they were based on.
pub async fn recommendations(State(state): State<AppState>, headers: HeaderMap) -> ProxyResult {
    let request = ForwardRequest::get("/api/recommendations").cookies_from(&headers);
    relay(
        &state,
        request,
        RelayPolicy::Verbatim,
        "Failed to fetch recommendations",
    )
    .await
}
