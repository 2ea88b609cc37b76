//! Rating models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Movie, MovieId};
use crate::errors::ClientError;

/// Prefix of the per-movie keys in a submit-ratings body (`rating_<id>`).
pub const RATING_KEY_PREFIX: &str = "rating_";

/// A persisted star rating. Only 1 through 5 exist; "unrated" is the absence of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct RatingValue(u8);

impl RatingValue {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validate a raw value coming from the presentation layer.
    pub fn new(value: i64) -> Result<Self, ClientError> {
        Self::try_from(value).map_err(ClientError::Validation)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for RatingValue {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err("rating 0 means unrated and cannot be stored".to_string());
        }
        if value < Self::MIN as i64 || value > Self::MAX as i64 {
            return Err(format!(
                "rating must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            ));
        }
        Ok(Self(value as u8))
    }
}

impl From<RatingValue> for u8 {
    fn from(value: RatingValue) -> Self {
        value.0
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entry of the rating history: the movie plus the user's rating of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatedMovie {
    pub rating: RatingValue,
    #[serde(flatten)]
    pub movie: Movie,
}

impl RatedMovie {
    pub fn movie_id(&self) -> MovieId {
        self.movie.movie_id
    }
}

/// Body of `POST /api/submit-ratings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitRatingsRequest {
    pub ratings: BTreeMap<String, u8>,
    /// Metadata for movies the backend may not know yet (e.g. search hits), keyed by id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_details: Option<BTreeMap<String, Movie>>,
}

impl SubmitRatingsRequest {
    pub fn new(
        ratings: &BTreeMap<MovieId, RatingValue>,
        movie_details: Option<&BTreeMap<MovieId, Movie>>,
    ) -> Self {
        Self {
            ratings: ratings
                .iter()
                .map(|(id, value)| (rating_key(*id), value.get()))
                .collect(),
            movie_details: movie_details.map(|details| {
                details
                    .iter()
                    .map(|(id, movie)| (id.to_string(), movie.clone()))
                    .collect()
            }),
        }
    }
}

/// Wire key for a movie in a submit-ratings body.
pub fn rating_key(movie_id: MovieId) -> String {
    format!("{}{}", RATING_KEY_PREFIX, movie_id)
}

/// Body of `POST /api/remove-rating`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoveRatingRequest {
    pub movie_id: MovieId,
}

/// Acknowledgement returned by rating mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MutationAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub movie_id: Option<MovieId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rating_bounds() {
        assert!(RatingValue::new(1).is_ok());
        assert!(RatingValue::new(5).is_ok());
        assert!(matches!(
            RatingValue::new(0),
            Err(ClientError::Validation(_))
        ));
        assert!(RatingValue::new(6).is_err());
        assert!(RatingValue::new(-3).is_err());
    }

    #[test]
    fn test_rating_zero_rejected_on_the_wire() {
        let result = serde_json::from_value::<RatedMovie>(json!({
            "movie_id": 42, "rating": 0, "title": "Unrated"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_rated_movie_flattens_movie_fields() {
        let entry: RatedMovie = serde_json::from_value(json!({
            "movie_id": 42,
            "rating": 5,
            "title": "The Hitchhiker's Guide to the Galaxy",
            "overview": "",
            "genre": "Comedy",
            "poster_url": null,
            "backdrop_url": null,
            "vote_average": 0,
            "release_date": ""
        }))
        .unwrap();

        assert_eq!(entry.movie_id(), 42);
        assert_eq!(entry.rating.get(), 5);
        assert_eq!(entry.movie.genre.as_deref(), Some("Comedy"));
    }

    #[test]
    fn test_submit_body_uses_prefixed_keys() {
        let mut ratings = BTreeMap::new();
        ratings.insert(42, RatingValue::new(5).unwrap());
        ratings.insert(7, RatingValue::new(2).unwrap());

        let body = serde_json::to_value(SubmitRatingsRequest::new(&ratings, None)).unwrap();
        assert_eq!(body, json!({ "ratings": { "rating_42": 5, "rating_7": 2 } }));
    }

    #[test]
    fn test_submit_body_carries_movie_details() {
        let mut ratings = BTreeMap::new();
        ratings.insert(603, RatingValue::new(4).unwrap());
        let mut details = BTreeMap::new();
        details.insert(603, Movie::new(603, "The Matrix"));

        let body =
            serde_json::to_value(SubmitRatingsRequest::new(&ratings, Some(&details))).unwrap();
        assert_eq!(body["movie_details"]["603"]["title"], "The Matrix");
    }
}
