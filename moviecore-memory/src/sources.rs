//! In-memory stand-ins for the metadata and rating subsystems.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use moviecore_types::{
    AggregateRating, MetadataSource, MovieId, MovieRecord, Rating, RatingSource, RatingValue,
    RecordId, RecordType, SourceError, UserId, UserRating,
};
use parking_lot::RwLock;
use tracing::{debug, instrument};

/// In-memory metadata subsystem. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataRepository {
    records: Arc<RwLock<HashMap<MovieId, MovieRecord>>>,
}

impl InMemoryMetadataRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace the metadata of a movie.
    pub fn put(&self, record: MovieRecord) {
        let _ = self.records.write().insert(record.id.clone(), record);
    }
}

impl MetadataSource for InMemoryMetadataRepository {
    #[instrument(name = "memory.get_metadata", skip(self), fields(movie_id = %id))]
    async fn get(&self, id: &MovieId) -> Result<MovieRecord, SourceError> {
        self.records.read().get(id).cloned().ok_or_else(|| {
            debug!("[memory.get_metadata] metadata not found");
            SourceError::NotFound
        })
    }
}

/// In-memory rating subsystem. Clones share storage.
///
/// Ratings are keyed by `(record, type, user)`; the aggregate is the mean of
/// all values for a record.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRatingRepository {
    ratings: Arc<RwLock<BTreeMap<(RecordId, RecordType), BTreeMap<UserId, RatingValue>>>>,
}

impl InMemoryRatingRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// All ratings of a record, ordered by user.
    ///
    /// Returns `Err(SourceError::NotFound)` when the record has none.
    pub fn ratings(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<Vec<Rating>, SourceError> {
        let ratings = self.ratings.read();
        match ratings.get(&(record_id.clone(), record_type)) {
            Some(by_user) if !by_user.is_empty() => Ok(by_user
                .iter()
                .map(|(user_id, value)| {
                    Rating::new(record_id.clone(), record_type, user_id.clone(), *value)
                })
                .collect()),
            _ => Err(SourceError::NotFound),
        }
    }
}

impl RatingSource for InMemoryRatingRepository {
    #[instrument(name = "memory.get_aggregate_rating", skip(self), fields(record_id = %record_id))]
    async fn aggregate(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<f64, SourceError> {
        let ratings = self.ratings.read();
        let aggregate = ratings
            .get(&(record_id.clone(), record_type))
            .map_or(AggregateRating::Absent, |by_user| {
                AggregateRating::from_values(by_user.values().copied())
            });

        aggregate.value().ok_or_else(|| {
            debug!("[memory.get_aggregate_rating] record has no ratings");
            SourceError::NotFound
        })
    }

    #[instrument(name = "memory.put_rating", skip(self, rating), fields(record_id = %record_id))]
    async fn put(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), SourceError> {
        let _ = self
            .ratings
            .write()
            .entry((record_id.clone(), record_type))
            .or_default()
            .insert(rating.user_id, rating.value);
        Ok(())
    }
}
