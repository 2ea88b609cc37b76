//! NoodlePicks web layer
//!
//! A same-origin proxy in front of the recommendation backend, plus the typed
//! client, rating synchronization core and session provider used by the UI.

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod proxy;
pub mod session;
pub mod sync;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use metrics::Metrics;
use proxy::Upstream;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<Upstream>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            upstream: Arc::new(Upstream::new(&config.backend_url)),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Session routes, reachable both at the root and under /api
    let auth_routes = || {
        Router::new()
            .route("/login", post(api::login))
            .route("/register", post(api::register))
            .route("/logout", post(api::logout))
            .route("/user", get(api::current_user))
    };

    let api_routes = Router::new()
        // Catalog
        .route("/popular-movies", get(api::popular_movies))
        .route("/movie-details", get(api::movie_details))
        .route("/rate-movies", get(api::rate_movies))
        .route("/search-movies", get(api::search_movies))
        .route("/recommendations", get(api::recommendations))
        // Ratings
        .route("/rating-history", get(api::rating_history))
        .route("/submit-ratings", post(api::submit_ratings))
        .route("/remove-rating", post(api::remove_rating))
        .route("/user-stats", get(api::user_stats))
        // Account
        .route("/profile", get(api::profile))
        .route("/reset-password", post(api::reset_password))
        // Metrics
        .route("/metrics", get(api::get_metrics).post(api::record_metric))
        .merge(auth_routes());

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(auth_routes())
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod testing;
