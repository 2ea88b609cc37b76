//! In-memory backend used by the sync core and session tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::client::MovieBackend;
use crate::errors::ClientError;
use crate::models::{
    AuthResponse, Movie, MovieId, MoviePage, MutationAck, RatedMovie, RatingValue,
    Recommendation, RecommendationKind, RecommendationSet, SearchResults, User, UserStats,
};

pub const PASSWORD: &str = "Secret123";

#[derive(Default)]
struct FakeState {
    catalog: Vec<Movie>,
    /// Fresher records returned by the details lookup than by the catalog.
    details: BTreeMap<MovieId, Movie>,
    ratings: BTreeMap<MovieId, RatingValue>,
    user: Option<User>,
    fail_submits: bool,
    fail_removes: bool,
    fail_current_user: bool,
    hold_submits: bool,
    hold_removes: bool,
    held: Vec<Arc<Notify>>,
    calls: HashMap<&'static str, usize>,
}

/// A backend whose state lives in memory and whose mutations can be held back.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

pub fn user(id: i64, name: &str) -> User {
    User {
        user_id: id,
        username: name.to_string(),
        email: format!("{}@example.com", name),
        created_at: "2025-01-04 10:11:12".to_string(),
    }
}

impl FakeBackend {
    /// A catalog of `size` movies with ids 1..=size.
    pub fn with_catalog(size: i64) -> Arc<Self> {
        let backend = Self::default();
        backend.state.lock().catalog = (1..=size)
            .map(|id| {
                let mut movie = Movie::new(id, format!("Movie {}", id));
                movie.genre = Some("Drama".to_string());
                movie.vote_average = Some(7.0);
                movie
            })
            .collect();
        Arc::new(backend)
    }

    pub fn sign_in_as(&self, user: User) {
        self.state.lock().user = Some(user);
    }

    pub fn set_details(&self, movie: Movie) {
        self.state.lock().details.insert(movie.movie_id, movie);
    }

    pub fn seed_rating(&self, movie_id: MovieId, value: i64) {
        let value = RatingValue::new(value).unwrap();
        self.state.lock().ratings.insert(movie_id, value);
    }

    pub fn server_rating(&self, movie_id: MovieId) -> Option<RatingValue> {
        self.state.lock().ratings.get(&movie_id).copied()
    }

    pub fn fail_submits(&self, fail: bool) {
        self.state.lock().fail_submits = fail;
    }

    pub fn fail_removes(&self, fail: bool) {
        self.state.lock().fail_removes = fail;
    }

    pub fn fail_current_user(&self, fail: bool) {
        self.state.lock().fail_current_user = fail;
    }

    /// Park every subsequent submit until released with [`release`](Self::release).
    pub fn hold_submits(&self) {
        self.state.lock().hold_submits = true;
    }

    /// Park every subsequent removal the same way.
    pub fn hold_removes(&self) {
        self.state.lock().hold_removes = true;
    }

    pub fn held_count(&self) -> usize {
        self.state.lock().held.len()
    }

    /// Let the `index`-th held request (in dispatch order) proceed.
    pub fn release(&self, index: usize) {
        let gate = self.state.lock().held[index].clone();
        gate.notify_one();
    }

    pub async fn wait_for_held(&self, count: usize) {
        while self.held_count() < count {
            tokio::task::yield_now().await;
        }
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.state.lock().calls.get(endpoint).copied().unwrap_or(0)
    }

    fn record(&self, endpoint: &'static str) {
        *self.state.lock().calls.entry(endpoint).or_insert(0) += 1;
    }

    fn require_user(&self) -> Result<(), ClientError> {
        if self.state.lock().user.is_some() {
            Ok(())
        } else {
            Err(ClientError::Status {
                status: 401,
                message: "User not authenticated".to_string(),
            })
        }
    }

    /// Wait for release if `held` says requests of this kind are parked.
    async fn gate(&self, held: fn(&FakeState) -> bool) {
        let gate = {
            let mut state = self.state.lock();
            if held(&*state) {
                let gate = Arc::new(Notify::new());
                state.held.push(gate.clone());
                Some(gate)
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn movie(&self, movie_id: MovieId) -> Movie {
        let state = self.state.lock();
        state
            .catalog
            .iter()
            .find(|movie| movie.movie_id == movie_id)
            .cloned()
            .unwrap_or_else(|| Movie::new(movie_id, format!("Movie {}", movie_id)))
    }
}

#[async_trait]
impl MovieBackend for FakeBackend {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ClientError> {
        self.record("login");
        if password != PASSWORD {
            return Err(ClientError::Status {
                status: 401,
                message: "Invalid password. Please check your credentials and try again.".to_string(),
            });
        }
        let user = user(1, username);
        self.state.lock().user = Some(user.clone());
        Ok(AuthResponse {
            message: Some("Login successful".to_string()),
            user,
        })
    }

    async fn register(
        &self,
        username: &str,
        _email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        self.record("register");
        if password.len() < 8 {
            return Err(ClientError::Status {
                status: 400,
                message: "Password must be at least 8 characters long".to_string(),
            });
        }
        let user = user(2, username);
        let mut state = self.state.lock();
        state.user = Some(user.clone());
        state.ratings.clear();
        Ok(AuthResponse {
            message: Some("Registration successful".to_string()),
            user,
        })
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.record("logout");
        self.state.lock().user = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, ClientError> {
        self.record("current_user");
        let state = self.state.lock();
        if state.fail_current_user {
            return Err(ClientError::Network("connection refused".to_string()));
        }
        Ok(state.user.clone())
    }

    async fn popular_movies(&self) -> Result<Vec<Movie>, ClientError> {
        self.record("popular_movies");
        Ok(self.state.lock().catalog.iter().take(12).cloned().collect())
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<SearchResults, ClientError> {
        self.record("search_movies");
        let state = self.state.lock();
        let movies: Vec<Movie> = state
            .catalog
            .iter()
            .filter(|movie| movie.title.contains(query))
            .cloned()
            .collect();
        let total = movies.len() as u32;
        Ok(SearchResults {
            movies,
            page,
            total_pages: 1,
            total_results: total,
            query: Some(query.to_string()),
        })
    }

    async fn rate_movies(&self, page: u32) -> Result<MoviePage, ClientError> {
        self.record("rate_movies");
        let state = self.state.lock();
        let per_page = 5usize;
        let start = (page as usize - 1) * per_page;
        let movies = state
            .catalog
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect();
        Ok(MoviePage {
            movies,
            page,
            total_pages: (state.catalog.len() / per_page) as u32,
            movies_per_page: Some(per_page as u32),
            total_movies: Some(state.catalog.len() as u32),
        })
    }

    async fn movie_details(&self, ids: &BTreeSet<MovieId>) -> Result<Vec<Movie>, ClientError> {
        self.record("movie_details");
        let details = self.state.lock().details.clone();
        Ok(ids
            .iter()
            .map(|id| details.get(id).cloned().unwrap_or_else(|| self.movie(*id)))
            .collect())
    }

    async fn submit_ratings(
        &self,
        ratings: &BTreeMap<MovieId, RatingValue>,
        _movie_details: Option<&BTreeMap<MovieId, Movie>>,
    ) -> Result<MutationAck, ClientError> {
        self.record("submit_ratings");
        self.require_user()?;
        self.gate(|state| state.hold_submits).await;

        let mut state = self.state.lock();
        if state.fail_submits {
            return Err(ClientError::Status {
                status: 500,
                message: "Failed to submit ratings".to_string(),
            });
        }
        state.ratings.extend(ratings.iter().map(|(id, v)| (*id, *v)));
        Ok(MutationAck {
            message: Some("Ratings submitted successfully".to_string()),
            movie_id: None,
        })
    }

    async fn remove_rating(&self, movie_id: MovieId) -> Result<MutationAck, ClientError> {
        self.record("remove_rating");
        self.require_user()?;
        self.gate(|state| state.hold_removes).await;
        let mut state = self.state.lock();
        if state.fail_removes {
            return Err(ClientError::Status {
                status: 500,
                message: "Internal server error".to_string(),
            });
        }
        state.ratings.remove(&movie_id);
        Ok(MutationAck {
            message: Some("Rating removed successfully".to_string()),
            movie_id: Some(movie_id),
        })
    }

    async fn recommendations(&self) -> Result<RecommendationSet, ClientError> {
        self.record("recommendations");
        self.require_user()?;
        let state = self.state.lock();
        if state.ratings.is_empty() {
            return Ok(RecommendationSet::default());
        }
        let recommendations = state
            .catalog
            .iter()
            .filter(|movie| !state.ratings.contains_key(&movie.movie_id))
            .take(12)
            .enumerate()
            .map(|(rank, movie)| Recommendation {
                movie: movie.clone(),
                score: 1.0 - rank as f64 * 0.05,
                kind: if rank % 2 == 0 {
                    RecommendationKind::ContentBased
                } else {
                    RecommendationKind::Collaborative
                },
            })
            .collect();
        Ok(RecommendationSet {
            recommendations,
            user_ratings: state.ratings.clone(),
        })
    }

    async fn user_stats(&self) -> Result<UserStats, ClientError> {
        self.record("user_stats");
        self.require_user()?;
        let state = self.state.lock();
        let count = state.ratings.len() as u32;
        let sum: u32 = state.ratings.values().map(|v| v.get() as u32).sum();
        Ok(UserStats {
            movies_rated: count,
            average_rating: if count == 0 {
                0.0
            } else {
                (sum as f64 / count as f64 * 10.0).round() / 10.0
            },
            favorite_movies: state.ratings.values().filter(|v| v.get() == 5).count() as u32,
        })
    }

    async fn rating_history(&self) -> Result<Vec<RatedMovie>, ClientError> {
        self.record("rating_history");
        self.require_user()?;
        let ratings = self.state.lock().ratings.clone();
        Ok(ratings
            .into_iter()
            .map(|(movie_id, rating)| RatedMovie {
                rating,
                movie: self.movie(movie_id),
            })
            .collect())
    }
}
