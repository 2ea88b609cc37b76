//! Movie catalog models.

use serde::{Deserialize, Serialize};

/// Numeric movie identity as assigned by the backend (TMDb ids).
pub type MovieId = i64;

/// A movie as supplied by the backend. Immutable from the client's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub movie_id: MovieId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
    /// TMDb vote average; `None` when the backend had no usable number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

impl Movie {
    pub fn new(movie_id: MovieId, title: impl Into<String>) -> Self {
        Self {
            movie_id,
            title: title.into(),
            overview: None,
            genre: None,
            poster_url: None,
            backdrop_url: None,
            vote_average: None,
            release_date: None,
        }
    }
}

/// One page of the rate-movies listing (pages are 1-indexed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub page: u32,
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movies_per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_movies: Option<u32>,
}

/// One page of title search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    pub movies: Vec<Movie>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl SearchResults {
    /// The answer for a blank query; no backend round-trip is needed.
    pub fn empty(query: &str, page: u32) -> Self {
        Self {
            movies: Vec::new(),
            page,
            total_pages: 0,
            total_results: 0,
            query: Some(query.to_string()),
        }
    }
}
