//! Optimistic rating edits that have not been confirmed by a refetch yet.

use std::collections::BTreeMap;

use crate::models::{MovieId, RatingValue};

/// What the user last did to a movie locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalValue {
    Rated(RatingValue),
    Removed,
}

#[derive(Debug, Clone)]
struct LocalEntry {
    /// `None` while only a removal is in flight: the server value still shows.
    value: Option<LocalValue>,
    /// Sequence number of the most recent request dispatched for this movie.
    latest_seq: u64,
    in_flight: u32,
}

/// Per-movie optimistic state with request sequencing.
#[derive(Debug, Default)]
pub struct LocalRatings {
    entries: BTreeMap<MovieId, LocalEntry>,
    next_seq: u64,
}

impl LocalRatings {
    /// Record an optimistic rating and return the sequence number of its request.
    pub fn write(&mut self, movie_id: MovieId, value: RatingValue) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        let entry = self.entries.entry(movie_id).or_insert(LocalEntry {
            value: None,
            latest_seq: seq,
            in_flight: 0,
        });
        entry.value = Some(LocalValue::Rated(value));
        entry.latest_seq = seq;
        entry.in_flight += 1;
        seq
    }

    /// Mark the request `seq` for `movie_id` as settled.
    ///
    /// Returns `true` if it is still the latest request for that movie, i.e. its
    /// outcome may be reflected in local state.
    pub fn finish(&mut self, movie_id: MovieId, seq: u64) -> bool {
        match self.entries.get_mut(&movie_id) {
            Some(entry) => {
                entry.in_flight = entry.in_flight.saturating_sub(1);
                entry.latest_seq == seq
            }
            None => false,
        }
    }

    /// Take a sequence number for a removal request. The displayed value is
    /// unchanged until the backend confirms.
    pub fn begin_remove(&mut self, movie_id: MovieId) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        let entry = self.entries.entry(movie_id).or_insert(LocalEntry {
            value: None,
            latest_seq: seq,
            in_flight: 0,
        });
        entry.latest_seq = seq;
        entry.in_flight += 1;
        seq
    }

    /// Settle the removal `seq`, leaving a tombstone only if nothing newer was
    /// dispatched for the movie since. Returns whether the tombstone was written.
    pub fn confirm_removed(&mut self, movie_id: MovieId, seq: u64) -> bool {
        if !self.finish(movie_id, seq) {
            return false;
        }
        if let Some(entry) = self.entries.get_mut(&movie_id) {
            entry.value = Some(LocalValue::Removed);
        }
        true
    }

    pub fn get(&self, movie_id: MovieId) -> Option<LocalValue> {
        self.entries.get(&movie_id).and_then(|entry| entry.value)
    }

    pub fn is_pending(&self, movie_id: MovieId) -> bool {
        self.entries
            .get(&movie_id)
            .is_some_and(|entry| entry.in_flight > 0)
    }

    /// Drop every entry a fresh server read now speaks for.
    ///
    /// Entries with a request still in flight are kept; their outcome is not
    /// reflected in the data just fetched.
    pub fn reconcile(&mut self) {
        self.entries.retain(|_, entry| entry.in_flight > 0);
    }

    /// Overlay local values on server-confirmed ratings.
    pub fn overlay(
        &self,
        server: &BTreeMap<MovieId, RatingValue>,
    ) -> BTreeMap<MovieId, RatingValue> {
        let mut merged = server.clone();
        for (movie_id, entry) in &self.entries {
            match entry.value {
                Some(LocalValue::Rated(value)) => {
                    merged.insert(*movie_id, value);
                }
                Some(LocalValue::Removed) => {
                    merged.remove(movie_id);
                }
                None => {}
            }
        }
        merged
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of movies with a local value to show.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|entry| entry.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
