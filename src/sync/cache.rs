//! Cache slots for server-derived collections.
//!
//! Every slot carries a generation. A fetch remembers the generation it was
//! dispatched under and may only store its result if nothing invalidated,
//! purged or re-keyed the slot in the meantime.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    Movie, MovieId, MoviePage, RatedMovie, RatingValue, RecommendationSet, SearchResults, User,
    UserStats,
};

/// The cached collections, named after the query groups the UI reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    PopularMovies,
    RateMovies,
    SearchMovies,
    RatingHistory,
    /// Rating history reshaped as `movie_id -> rating`.
    UserRatings,
    UserStats,
    Recommendations,
    MovieDetails,
    User,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::PopularMovies => "popular-movies",
            Collection::RateMovies => "rate-movies",
            Collection::SearchMovies => "search-movies",
            Collection::RatingHistory => "rating-history",
            Collection::UserRatings => "user-ratings",
            Collection::UserStats => "user-stats",
            Collection::Recommendations => "recommendations",
            Collection::MovieDetails => "movie-details",
            Collection::User => "user",
        }
    }
}

/// Collections that depend on the rating set and go stale whenever it changes.
pub const RATING_DEPENDENTS: [Collection; 4] = [
    Collection::Recommendations,
    Collection::UserStats,
    Collection::RatingHistory,
    Collection::UserRatings,
];

/// Collections holding one user's data; purged on every identity change.
pub const USER_SCOPED: [Collection; 5] = [
    Collection::UserRatings,
    Collection::RatingHistory,
    Collection::UserStats,
    Collection::Recommendations,
    Collection::MovieDetails,
];

/// Observable state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Never fetched, or purged: the next read goes to the network.
    Empty,
    /// Served from memory on the next read.
    Fresh,
    /// Still holds data for display, but the next read refetches.
    Stale,
}

/// Operations shared by every slot regardless of its payload.
pub trait CacheControl {
    fn status(&self) -> CacheStatus;
    fn invalidate(&mut self);
    fn clear(&mut self);
}

/// A single cached value.
#[derive(Debug)]
pub struct Cached<T> {
    value: Option<T>,
    fresh: bool,
    generation: u64,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            value: None,
            fresh: false,
            generation: 0,
        }
    }
}

impl<T: Clone> Cached<T> {
    /// The value, if it can be served without a refetch.
    pub fn fresh_value(&self) -> Option<T> {
        if self.fresh {
            self.value.clone()
        } else {
            None
        }
    }

    /// Whatever is held, fresh or stale.
    pub fn peek(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Store a fetch result if the slot has not moved on since `generation`.
    pub fn complete(&mut self, generation: u64, value: T) -> bool {
        if generation != self.generation {
            return false;
        }
        self.value = Some(value);
        self.fresh = true;
        true
    }

    /// Hold a value that must still be confirmed by the next read.
    pub fn set_stale(&mut self, value: T) {
        self.generation += 1;
        self.value = Some(value);
        self.fresh = false;
    }
}

impl<T> CacheControl for Cached<T> {
    fn status(&self) -> CacheStatus {
        match (&self.value, self.fresh) {
            (None, _) => CacheStatus::Empty,
            (Some(_), true) => CacheStatus::Fresh,
            (Some(_), false) => CacheStatus::Stale,
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.fresh = false;
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.value = None;
        self.fresh = false;
    }
}

/// A value cached for one key at a time (current page, current id set).
#[derive(Debug)]
pub struct Keyed<K, T> {
    key: Option<K>,
    entry: Cached<T>,
}

impl<K, T> Default for Keyed<K, T> {
    fn default() -> Self {
        Self {
            key: None,
            entry: Cached::default(),
        }
    }
}

impl<K: PartialEq + Clone, T: Clone> Keyed<K, T> {
    pub fn fresh_value(&self, key: &K) -> Option<T> {
        if self.key.as_ref() == Some(key) {
            self.entry.fresh_value()
        } else {
            None
        }
    }

    pub fn peek(&self, key: &K) -> Option<&T> {
        if self.key.as_ref() == Some(key) {
            self.entry.peek()
        } else {
            None
        }
    }

    /// Make `key` the current key and return the generation to fetch under.
    ///
    /// Switching keys drops the old value; results for the old key are discarded.
    pub fn begin(&mut self, key: &K) -> u64 {
        if self.key.as_ref() != Some(key) {
            self.key = Some(key.clone());
            self.entry.clear();
        }
        self.entry.generation()
    }

    pub fn complete(&mut self, generation: u64, value: T) -> bool {
        self.entry.complete(generation, value)
    }
}

impl<K, T> CacheControl for Keyed<K, T> {
    fn status(&self) -> CacheStatus {
        self.entry.status()
    }

    fn invalidate(&mut self) {
        self.entry.invalidate();
    }

    fn clear(&mut self) {
        self.key = None;
        self.entry.clear();
    }
}

/// All cached collections.
#[derive(Debug, Default)]
pub struct CacheState {
    pub popular_movies: Cached<Vec<Movie>>,
    pub rate_movies: Keyed<u32, MoviePage>,
    pub search_movies: Keyed<(String, u32), SearchResults>,
    pub rating_history: Cached<Vec<RatedMovie>>,
    pub user_ratings: Cached<BTreeMap<MovieId, RatingValue>>,
    pub user_stats: Cached<UserStats>,
    pub recommendations: Cached<RecommendationSet>,
    pub movie_details: Keyed<BTreeSet<MovieId>, Vec<Movie>>,
    pub user: Cached<Option<User>>,
}

impl CacheState {
    pub fn control(&mut self, collection: Collection) -> &mut dyn CacheControl {
        match collection {
            Collection::PopularMovies => &mut self.popular_movies,
            Collection::RateMovies => &mut self.rate_movies,
            Collection::SearchMovies => &mut self.search_movies,
            Collection::RatingHistory => &mut self.rating_history,
            Collection::UserRatings => &mut self.user_ratings,
            Collection::UserStats => &mut self.user_stats,
            Collection::Recommendations => &mut self.recommendations,
            Collection::MovieDetails => &mut self.movie_details,
            Collection::User => &mut self.user,
        }
    }

    pub fn status(&mut self, collection: Collection) -> CacheStatus {
        self.control(collection).status()
    }
}
