//! In-memory adapter for the `MovieCore` movie details library
//!
//! This crate provides in-memory implementations of the `MovieStore`,
//! `MetadataSource` and `RatingSource` traits, useful for testing and
//! development scenarios where persistence is not required.
//!
//! Every multi-row operation runs under one write lock and validates before it
//! mutates, so an operation that fails leaves the store exactly as it found it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod sources;

use std::collections::BTreeMap;
use std::sync::Arc;

use moviecore_types::{
    AggregateRating, MovieDetails, MovieId, MovieRecord, MovieStore, MovieWrite, Page, Rating,
    RatingValue, RecordId, RecordType, StoreError, UserId, UserRating,
};
use parking_lot::RwLock;
use tracing::{debug, instrument};

pub use sources::{InMemoryMetadataRepository, InMemoryRatingRepository};

type RatingsByUser = BTreeMap<UserId, RatingValue>;

#[derive(Debug, Default)]
struct StoreState {
    movies: BTreeMap<MovieId, MovieRecord>,
    ratings: BTreeMap<(RecordId, RecordType), RatingsByUser>,
}

impl StoreState {
    fn details(&self, record: &MovieRecord) -> MovieDetails {
        let rating = self
            .ratings
            .get(&(record.id.clone(), RecordType::Movie))
            .map_or(AggregateRating::Absent, |by_user| {
                AggregateRating::from_values(by_user.values().copied())
            });
        MovieDetails::new(record.clone(), rating)
    }

    fn upsert_rating(&mut self, record_id: &RecordId, record_type: RecordType, rating: UserRating) {
        let _ = self
            .ratings
            .entry((record_id.clone(), record_type))
            .or_default()
            .insert(rating.user_id, rating.value);
    }
}

/// Thread-safe in-memory movie store for testing
///
/// Clones share the same underlying storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMovieStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryMovieStore {
    /// Create a new empty in-memory movie store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of movies currently stored.
    pub fn movie_count(&self) -> usize {
        self.state.read().movies.len()
    }

    /// Number of rating rows currently stored, across all records.
    pub fn rating_count(&self) -> usize {
        self.state.read().ratings.values().map(BTreeMap::len).sum()
    }
}

impl MovieStore for InMemoryMovieStore {
    #[instrument(name = "memory.get_movie", skip(self), fields(movie_id = %id))]
    async fn get(&self, id: &MovieId) -> Result<MovieDetails, StoreError> {
        let state = self.state.read();
        state.movies.get(id).map_or_else(
            || {
                debug!("[memory.get_movie] movie not found");
                Err(StoreError::NotFound {
                    movie_id: id.clone(),
                })
            },
            |record| Ok(state.details(record)),
        )
    }

    #[instrument(name = "memory.put_movie", skip(self, movie), fields(movie_id = %movie.id()))]
    async fn put(&self, movie: &MovieWrite) -> Result<(), StoreError> {
        let mut state = self.state.write();

        if !state.movies.contains_key(movie.id()) {
            let _ = state
                .movies
                .insert(movie.id().clone(), movie.record.clone());
        }

        if let Some(rating) = &movie.rating {
            state.upsert_rating(movie.id(), RecordType::Movie, rating.clone());
        }

        Ok(())
    }

    #[instrument(name = "memory.update_movie", skip(self, movie), fields(movie_id = %movie.id()))]
    async fn update(&self, movie: &MovieWrite) -> Result<(), StoreError> {
        let mut state = self.state.write();

        let Some(record) = state.movies.get_mut(movie.id()) else {
            debug!("[memory.update_movie] movie not found, nothing updated");
            return Err(StoreError::NotFound {
                movie_id: movie.id().clone(),
            });
        };
        record.clone_from(&movie.record);

        if let Some(rating) = &movie.rating {
            if let Some(value) = state
                .ratings
                .get_mut(&(movie.id().clone(), RecordType::Movie))
                .and_then(|by_user| by_user.get_mut(&rating.user_id))
            {
                *value = rating.value;
            }
        }

        Ok(())
    }

    #[instrument(name = "memory.delete_movie", skip(self), fields(movie_id = %id))]
    async fn delete(&self, id: &MovieId) -> Result<(), StoreError> {
        let mut state = self.state.write();

        if state.movies.remove(id).is_none() {
            debug!("[memory.delete_movie] movie not found, nothing deleted");
            return Err(StoreError::NotFound {
                movie_id: id.clone(),
            });
        }
        let _ = state.ratings.remove(&(id.clone(), RecordType::Movie));

        Ok(())
    }

    #[instrument(name = "memory.list_movies", skip(self))]
    async fn list(&self, skip: i64, take: i64) -> Result<Vec<MovieDetails>, StoreError> {
        let page = Page::try_new(skip, take)?;
        let state = self.state.read();

        Ok(state
            .movies
            .values()
            .skip(page.skip_usize())
            .take(page.take_usize())
            .map(|record| state.details(record))
            .collect())
    }

    #[instrument(name = "memory.put_rating", skip(self, rating), fields(record_id = %record_id))]
    async fn put_rating(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write();

        if !state.movies.contains_key(record_id) {
            debug!("[memory.put_rating] owning movie not found, rating rejected");
            return Err(StoreError::NotFound {
                movie_id: record_id.clone(),
            });
        }
        state.upsert_rating(record_id, record_type, rating);

        Ok(())
    }

    #[instrument(name = "memory.read_ratings", skip(self), fields(record_id = %record_id))]
    async fn ratings(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<Vec<Rating>, StoreError> {
        let state = self.state.read();

        Ok(state
            .ratings
            .get(&(record_id.clone(), record_type))
            .map(|by_user| {
                by_user
                    .iter()
                    .map(|(user_id, value)| {
                        Rating::new(record_id.clone(), record_type, user_id.clone(), *value)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
