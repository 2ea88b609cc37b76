//! Recommendation models. Always server-computed; the client only reads them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Movie, MovieId, RatingValue};

/// Which recommender produced a suggestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    ContentBased,
    Collaborative,
    Hybrid,
}

/// A recommended movie with its score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(flatten)]
    pub movie: Movie,
    pub score: f64,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
}

/// Payload of `GET /api/recommendations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    /// The ratings the backend based the list on, keyed by movie id.
    #[serde(default)]
    pub user_ratings: BTreeMap<MovieId, RatingValue>,
}

impl RecommendationSet {
    /// Ids of the movies the user has rated, as reported alongside the list.
    pub fn rated_ids(&self) -> BTreeSet<MovieId> {
        self.user_ratings.keys().copied().collect()
    }

    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.recommendations
            .iter()
            .any(|rec| rec.movie.movie_id == movie_id)
    }
}
