//! Client-side synchronization of ratings and the views derived from them.
//!
//! [`SyncStore`] owns the query cache and the optimistic rating edits. Reads
//! are served from memory while fresh and refetched otherwise; rating
//! mutations write locally first, then invalidate every dependent collection
//! once the backend confirms. Identity changes purge all user-scoped data.
//!
//! The store is injectable: it is created with a [`MovieBackend`] and holds no
//! global state, so the invalidation rules can be exercised against a fake.

mod cache;
mod local;

pub use cache::{CacheStatus, Collection, RATING_DEPENDENTS, USER_SCOPED};
pub use local::LocalValue;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::MovieBackend;
use crate::errors::ClientError;
use crate::models::{
    Movie, MovieId, MoviePage, RatedMovie, RatingValue, RecommendationSet, SearchResults, User,
    UserStats,
};
use cache::{CacheControl, CacheState, Cached, Keyed};
use local::LocalRatings;

/// Transient outcome of a mutation, for the presentation layer to toast.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    RatingSaved {
        movie_id: MovieId,
        rating: RatingValue,
    },
    RatingRemoved {
        movie_id: MovieId,
    },
    RatingsSubmitted {
        count: usize,
    },
    MutationFailed {
        movie_id: Option<MovieId>,
        message: String,
    },
}

impl Notice {
    /// Text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Notice::RatingSaved { .. } => "Rating saved!".to_string(),
            Notice::RatingRemoved { .. } => "Rating removed!".to_string(),
            Notice::RatingsSubmitted { count } => format!("{} ratings saved!", count),
            Notice::MutationFailed { message, .. } => message.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    cache: CacheState,
    local: LocalRatings,
    /// Bumped on every identity change; responses from an older epoch are ignored.
    epoch: u64,
    notices: Vec<Notice>,
}

impl Inner {
    fn invalidate_all(&mut self, collections: &[Collection]) {
        for collection in collections {
            self.cache.control(*collection).invalidate();
        }
    }
}

/// The synchronization core.
pub struct SyncStore<B> {
    backend: Arc<B>,
    inner: Mutex<Inner>,
}

impl<B: MovieBackend> SyncStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Counter of identity changes seen by this store.
    pub fn identity_epoch(&self) -> u64 {
        self.inner.lock().epoch
    }

    // ==================== CACHE CONTROL ====================

    pub fn status(&self, collection: Collection) -> CacheStatus {
        self.inner.lock().cache.status(collection)
    }

    /// Mark a collection stale so its next read refetches.
    pub fn invalidate(&self, collection: Collection) {
        self.inner.lock().cache.control(collection).invalidate();
    }

    /// Drop a collection entirely.
    pub fn remove(&self, collection: Collection) {
        self.inner.lock().cache.control(collection).clear();
    }

    /// Take every pending notice, oldest first.
    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.inner.lock().notices)
    }

    // ==================== READS ====================

    /// Serve a slot from memory if fresh, otherwise fetch and store.
    ///
    /// The flag is `true` when a fetched result was stored.
    async fn load<T, F, Fut>(
        &self,
        collection: Collection,
        select: fn(&mut CacheState) -> &mut Cached<T>,
        fetch: F,
    ) -> Result<(T, bool), ClientError>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let generation = {
            let mut inner = self.inner.lock();
            let slot = select(&mut inner.cache);
            if let Some(value) = slot.fresh_value() {
                tracing::debug!("Cache hit for {}", collection.as_str());
                return Ok((value, false));
            }
            slot.generation()
        };

        tracing::debug!("Fetching {}", collection.as_str());
        let value = fetch().await?;

        let mut inner = self.inner.lock();
        let stored = select(&mut inner.cache).complete(generation, value.clone());
        if !stored {
            tracing::debug!("Discarding superseded {} response", collection.as_str());
        }
        Ok((value, stored))
    }

    /// Like [`load`](Self::load) for collections cached one key at a time.
    async fn load_keyed<K, T, F, Fut>(
        &self,
        collection: Collection,
        select: fn(&mut CacheState) -> &mut Keyed<K, T>,
        key: K,
        fetch: F,
    ) -> Result<T, ClientError>
    where
        K: PartialEq + Clone,
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let generation = {
            let mut inner = self.inner.lock();
            let slot = select(&mut inner.cache);
            if let Some(value) = slot.fresh_value(&key) {
                tracing::debug!("Cache hit for {}", collection.as_str());
                return Ok(value);
            }
            slot.begin(&key)
        };

        tracing::debug!("Fetching {}", collection.as_str());
        let value = fetch().await?;

        let mut inner = self.inner.lock();
        if !select(&mut inner.cache).complete(generation, value.clone()) {
            tracing::debug!("Discarding superseded {} response", collection.as_str());
        }
        Ok(value)
    }

    pub async fn popular_movies(&self) -> Result<Vec<Movie>, ClientError> {
        let (movies, _) = self
            .load(
                Collection::PopularMovies,
                |cache| &mut cache.popular_movies,
                || self.backend.popular_movies(),
            )
            .await?;
        Ok(movies)
    }

    /// One page of movies to rate. Only the most recently requested page is cached.
    pub async fn rate_movies(&self, page: u32) -> Result<MoviePage, ClientError> {
        if page == 0 {
            return Err(ClientError::Validation("pages start at 1".to_string()));
        }
        self.load_keyed(
            Collection::RateMovies,
            |cache| &mut cache.rate_movies,
            page,
            || self.backend.rate_movies(page),
        )
        .await
    }

    /// One page of title search results. Only the current query and page are cached.
    pub async fn search_movies(&self, query: &str, page: u32) -> Result<SearchResults, ClientError> {
        if page == 0 {
            return Err(ClientError::Validation("pages start at 1".to_string()));
        }
        self.load_keyed(
            Collection::SearchMovies,
            |cache| &mut cache.search_movies,
            (query.to_string(), page),
            || self.backend.search_movies(query, page),
        )
        .await
    }

    pub async fn rating_history(&self) -> Result<Vec<RatedMovie>, ClientError> {
        let (history, stored) = self
            .load(
                Collection::RatingHistory,
                |cache| &mut cache.rating_history,
                || self.backend.rating_history(),
            )
            .await?;
        if stored {
            self.inner.lock().local.reconcile();
        }
        Ok(history)
    }

    /// Server-confirmed ratings keyed by movie id.
    pub async fn user_ratings(&self) -> Result<BTreeMap<MovieId, RatingValue>, ClientError> {
        let (ratings, stored) = self
            .load(
                Collection::UserRatings,
                |cache| &mut cache.user_ratings,
                || async {
                    let history = self.backend.rating_history().await?;
                    Ok::<_, ClientError>(
                        history
                            .into_iter()
                            .map(|entry| (entry.movie_id(), entry.rating))
                            .collect(),
                    )
                },
            )
            .await?;
        if stored {
            self.inner.lock().local.reconcile();
        }
        Ok(ratings)
    }

    pub async fn user_stats(&self) -> Result<UserStats, ClientError> {
        let (stats, _) = self
            .load(
                Collection::UserStats,
                |cache| &mut cache.user_stats,
                || self.backend.user_stats(),
            )
            .await?;
        Ok(stats)
    }

    pub async fn recommendations(&self) -> Result<RecommendationSet, ClientError> {
        let (set, _) = self
            .load(
                Collection::Recommendations,
                |cache| &mut cache.recommendations,
                || self.backend.recommendations(),
            )
            .await?;
        Ok(set)
    }

    /// Metadata for exactly the given ids. An empty set needs no request.
    pub async fn movie_details(&self, ids: &BTreeSet<MovieId>) -> Result<Vec<Movie>, ClientError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.load_keyed(
            Collection::MovieDetails,
            |cache| &mut cache.movie_details,
            ids.clone(),
            || self.backend.movie_details(ids),
        )
        .await
    }

    /// The signed-in user, `None` for anonymous visitors.
    pub async fn current_user(&self) -> Result<Option<User>, ClientError> {
        let (user, _) = self
            .load(
                Collection::User,
                |cache| &mut cache.user,
                || self.backend.current_user(),
            )
            .await?;
        Ok(user)
    }

    /// Metadata for every movie the recommendation views may reference.
    ///
    /// Combines the popular catalog with a details lookup for the rated ids; on
    /// collision the details lookup wins.
    pub async fn movie_lookup(&self) -> Result<HashMap<MovieId, Movie>, ClientError> {
        let recommendations = self.recommendations().await?;
        let popular = self.popular_movies().await?;
        let details = self.movie_details(&recommendations.rated_ids()).await?;
        Ok(merge_movie_sources(&popular, &details))
    }

    // ==================== LOCAL VIEW ====================

    /// What the UI should show for one movie: the local edit if any, else the server's value.
    pub fn effective_rating(&self, movie_id: MovieId) -> Option<RatingValue> {
        let inner = self.inner.lock();
        match inner.local.get(movie_id) {
            Some(LocalValue::Rated(value)) => Some(value),
            Some(LocalValue::Removed) => None,
            None => server_ratings(&inner.cache).get(&movie_id).copied(),
        }
    }

    /// Every rating the UI should show, local edits layered over cached server data.
    pub fn effective_ratings(&self) -> BTreeMap<MovieId, RatingValue> {
        let inner = self.inner.lock();
        inner.local.overlay(&server_ratings(&inner.cache))
    }

    pub fn local_rating(&self, movie_id: MovieId) -> Option<LocalValue> {
        self.inner.lock().local.get(movie_id)
    }

    /// Whether a rating request for this movie has not settled yet.
    pub fn is_pending(&self, movie_id: MovieId) -> bool {
        self.inner.lock().local.is_pending(movie_id)
    }

    // ==================== MUTATIONS ====================

    /// Rate one movie: shown immediately, submitted, dependents invalidated on success.
    ///
    /// A failed submit leaves the optimistic value in place and queues a
    /// [`Notice::MutationFailed`].
    pub async fn apply_rating(&self, movie_id: MovieId, value: i64) -> Result<(), ClientError> {
        let rating = RatingValue::new(value)?;

        let (seq, epoch) = {
            let mut inner = self.inner.lock();
            (inner.local.write(movie_id, rating), inner.epoch)
        };

        let mut batch = BTreeMap::new();
        batch.insert(movie_id, rating);
        let result = self.backend.submit_ratings(&batch, None).await;

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            tracing::debug!("Ignoring rating response for movie {} from a previous session", movie_id);
            return result.map(|_| ());
        }
        let latest = inner.local.finish(movie_id, seq);

        match result {
            Ok(_) => {
                if !latest {
                    tracing::debug!("Rating response for movie {} superseded by a newer edit", movie_id);
                }
                inner.invalidate_all(&RATING_DEPENDENTS);
                inner.notices.push(Notice::RatingSaved { movie_id, rating });
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Failed to save rating for movie {}: {}", movie_id, err);
                inner.notices.push(Notice::MutationFailed {
                    movie_id: Some(movie_id),
                    message: "Failed to save rating.".to_string(),
                });
                Err(err)
            }
        }
    }

    /// Remove one rating. Local state only changes once the backend confirms,
    /// and not at all if the movie was rated again in the meantime.
    pub async fn remove_rating(&self, movie_id: MovieId) -> Result<(), ClientError> {
        let (seq, epoch) = {
            let mut inner = self.inner.lock();
            (inner.local.begin_remove(movie_id), inner.epoch)
        };
        let result = self.backend.remove_rating(movie_id).await;

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return result.map(|_| ());
        }

        match result {
            Ok(_) => {
                if !inner.local.confirm_removed(movie_id, seq) {
                    tracing::debug!("Removal of movie {} superseded by a newer edit", movie_id);
                }
                inner.invalidate_all(&RATING_DEPENDENTS);
                inner.notices.push(Notice::RatingRemoved { movie_id });
                Ok(())
            }
            Err(err) => {
                inner.local.finish(movie_id, seq);
                tracing::warn!("Failed to remove rating for movie {}: {}", movie_id, err);
                inner.notices.push(Notice::MutationFailed {
                    movie_id: Some(movie_id),
                    message: "Failed to remove rating.".to_string(),
                });
                Err(err)
            }
        }
    }

    /// Submit several queued ratings in one request.
    ///
    /// `movie_details` lets the backend learn movies it has no record of (e.g. search hits).
    pub async fn submit_ratings(
        &self,
        ratings: &BTreeMap<MovieId, i64>,
        movie_details: Option<&BTreeMap<MovieId, Movie>>,
    ) -> Result<(), ClientError> {
        if ratings.is_empty() {
            return Err(ClientError::Validation("no ratings to submit".to_string()));
        }
        let batch = ratings
            .iter()
            .map(|(movie_id, value)| Ok((*movie_id, RatingValue::new(*value)?)))
            .collect::<Result<BTreeMap<MovieId, RatingValue>, ClientError>>()?;

        let (sequences, epoch) = {
            let mut inner = self.inner.lock();
            let sequences: Vec<(MovieId, u64)> = batch
                .iter()
                .map(|(movie_id, rating)| (*movie_id, inner.local.write(*movie_id, *rating)))
                .collect();
            (sequences, inner.epoch)
        };

        let result = self.backend.submit_ratings(&batch, movie_details).await;

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return result.map(|_| ());
        }
        for (movie_id, seq) in sequences {
            inner.local.finish(movie_id, seq);
        }

        match result {
            Ok(_) => {
                inner.invalidate_all(&RATING_DEPENDENTS);
                inner.notices.push(Notice::RatingsSubmitted { count: batch.len() });
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Failed to submit {} ratings: {}", batch.len(), err);
                inner.notices.push(Notice::MutationFailed {
                    movie_id: None,
                    message: "Failed to save ratings.".to_string(),
                });
                Err(err)
            }
        }
    }

    // ==================== IDENTITY ====================

    /// Forget everything that belongs to the current user.
    pub fn purge_user_scope(&self) {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        for collection in USER_SCOPED {
            inner.cache.control(collection).clear();
        }
        inner.local.clear();
        tracing::debug!("Purged user-scoped caches (epoch {})", inner.epoch);
    }

    /// Hold the newly signed-in user, to be confirmed by the next current-user read.
    pub fn set_signed_in(&self, user: User) {
        self.inner.lock().cache.user.set_stale(Some(user));
    }

    pub fn clear_user(&self) {
        self.inner.lock().cache.user.clear();
    }
}

/// Best server-side rating map currently held, fresh or stale.
fn server_ratings(cache: &CacheState) -> BTreeMap<MovieId, RatingValue> {
    if let Some(ratings) = cache.user_ratings.peek() {
        return ratings.clone();
    }
    cache
        .rating_history
        .peek()
        .map(|history| {
            history
                .iter()
                .map(|entry| (entry.movie_id(), entry.rating))
                .collect()
        })
        .unwrap_or_default()
}

/// Index catalog and details by id; details take precedence on collision.
pub fn merge_movie_sources(popular: &[Movie], details: &[Movie]) -> HashMap<MovieId, Movie> {
    let mut map = HashMap::with_capacity(popular.len() + details.len());
    for movie in popular.iter().chain(details) {
        map.insert(movie.movie_id, movie.clone());
    }
    map
}
