//! Remote data access layer.
//!
//! [`ApiClient`] talks to the same-origin proxy the way the browser does: a
//! cookie jar carries the session, every endpoint is one async method, and each
//! response is decoded into its typed model. Non-2xx answers, transport
//! failures and shape mismatches are returned as [`ClientError`]; nothing is
//! retried.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ClientError;
use crate::models::{
    AuthResponse, LoginRequest, Movie, MovieId, MoviePage, MutationAck, RatedMovie, RatingValue,
    RecommendationSet, RegisterRequest, RemoveRatingRequest, SearchResults, SubmitRatingsRequest,
    User, UserStats,
};

/// The backend operations the sync core and session provider depend on.
#[async_trait]
pub trait MovieBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ClientError>;

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError>;

    async fn logout(&self) -> Result<(), ClientError>;

    /// `None` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<User>, ClientError>;

    async fn popular_movies(&self) -> Result<Vec<Movie>, ClientError>;

    async fn search_movies(&self, query: &str, page: u32) -> Result<SearchResults, ClientError>;

    async fn rate_movies(&self, page: u32) -> Result<MoviePage, ClientError>;

    async fn movie_details(&self, ids: &BTreeSet<MovieId>) -> Result<Vec<Movie>, ClientError>;

    async fn submit_ratings(
        &self,
        ratings: &BTreeMap<MovieId, RatingValue>,
        movie_details: Option<&BTreeMap<MovieId, Movie>>,
    ) -> Result<MutationAck, ClientError>;

    async fn remove_rating(&self, movie_id: MovieId) -> Result<MutationAck, ClientError>;

    async fn recommendations(&self) -> Result<RecommendationSet, ClientError>;

    async fn user_stats(&self) -> Result<UserStats, ClientError>;

    async fn rating_history(&self) -> Result<Vec<RatedMovie>, ClientError>;
}

/// HTTP client for the proxy endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with its own cookie jar.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send once and decode a 2xx body as `T`.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: error_message(&text, status.canonical_reason()),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// GET /api/profile - The signed-in user's profile.
    pub async fn profile(&self) -> Result<User, ClientError> {
        self.execute(self.http.get(self.url("/api/profile"))).await
    }
}

/// Best human-readable message for a failed response.
fn error_message(body: &str, reason: Option<&str>) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| reason.unwrap_or("request failed").to_string())
}

#[async_trait]
impl MovieBackend for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.execute(self.http.post(self.url("/api/login")).json(&body))
            .await
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.execute(self.http.post(self.url("/api/register")).json(&body))
            .await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let _: Value = self.execute(self.http.post(self.url("/api/logout"))).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, ClientError> {
        self.execute(self.http.get(self.url("/api/user"))).await
    }

    async fn popular_movies(&self) -> Result<Vec<Movie>, ClientError> {
        self.execute(self.http.get(self.url("/api/popular-movies")))
            .await
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<SearchResults, ClientError> {
        if query.trim().is_empty() {
            return Ok(SearchResults::empty(query, page));
        }
        let request = self
            .http
            .get(self.url("/api/search-movies"))
            .query(&[("q", query.to_string()), ("page", page.to_string())]);
        self.execute(request).await
    }

    async fn rate_movies(&self, page: u32) -> Result<MoviePage, ClientError> {
        let request = self
            .http
            .get(self.url("/api/rate-movies"))
            .query(&[("page", page.to_string())]);
        self.execute(request).await
    }

    async fn movie_details(&self, ids: &BTreeSet<MovieId>) -> Result<Vec<Movie>, ClientError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let request = self
            .http
            .get(self.url("/api/movie-details"))
            .query(&[("ids", joined)]);
        self.execute(request).await
    }

    async fn submit_ratings(
        &self,
        ratings: &BTreeMap<MovieId, RatingValue>,
        movie_details: Option<&BTreeMap<MovieId, Movie>>,
    ) -> Result<MutationAck, ClientError> {
        let body = SubmitRatingsRequest::new(ratings, movie_details);
        self.execute(self.http.post(self.url("/api/submit-ratings")).json(&body))
            .await
    }

    async fn remove_rating(&self, movie_id: MovieId) -> Result<MutationAck, ClientError> {
        let body = RemoveRatingRequest { movie_id };
        self.execute(self.http.post(self.url("/api/remove-rating")).json(&body))
            .await
    }

    async fn recommendations(&self) -> Result<RecommendationSet, ClientError> {
        self.execute(self.http.get(self.url("/api/recommendations")))
            .await
    }

    async fn user_stats(&self) -> Result<UserStats, ClientError> {
        self.execute(self.http.get(self.url("/api/user-stats"))).await
    }

    async fn rating_history(&self) -> Result<Vec<RatedMovie>, ClientError> {
        self.execute(self.http.get(self.url("/api/rating-history")))
            .await
    }
}
