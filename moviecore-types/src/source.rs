use crate::errors::SourceError;
use crate::model::{MovieId, MovieRecord, RecordId, RecordType, UserRating};
use std::future::Future;
use std::sync::Arc;

/// Contract of the metadata subsystem: the authoritative source of movie records.
///
/// Implementations include:
/// - `moviecore-postgres`: `PostgresMetadataRepository`
/// - `moviecore-memory`: `InMemoryMetadataRepository`
/// - `moviecore`: `StoreBackedSources`, for single-store deployments
pub trait MetadataSource {
    /// Fetch the record for `id`.
    ///
    /// # Returns
    ///
    /// * `Ok(MovieRecord)` - The movie exists
    /// * `Err(SourceError::NotFound)` - No movie has this identifier
    /// * `Err(SourceError::Unavailable { .. })` - The subsystem failed
    fn get(
        &self,
        id: &MovieId,
    ) -> impl Future<Output = Result<MovieRecord, SourceError>> + Send;
}

/// Contract of the rating subsystem.
///
/// The aggregate is computed by the subsystem itself; callers treat it as an
/// opaque number.
pub trait RatingSource {
    /// Aggregate rating for a record.
    ///
    /// Returns `Err(SourceError::NotFound)` when the record has no ratings.
    fn aggregate(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> impl Future<Output = Result<f64, SourceError>> + Send;

    /// Submit a user's rating for a record, replacing any earlier rating by
    /// the same user.
    fn put(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> impl Future<Output = Result<(), SourceError>> + Send;
}

impl<T: MetadataSource + Sync> MetadataSource for &T {
    async fn get(&self, id: &MovieId) -> Result<MovieRecord, SourceError> {
        (*self).get(id).await
    }
}

impl<T: MetadataSource + Send + Sync> MetadataSource for Arc<T> {
    async fn get(&self, id: &MovieId) -> Result<MovieRecord, SourceError> {
        self.as_ref().get(id).await
    }
}

impl<T: RatingSource + Sync> RatingSource for &T {
    async fn aggregate(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<f64, SourceError> {
        (*self).aggregate(record_id, record_type).await
    }

    async fn put(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), SourceError> {
        (*self).put(record_id, record_type, rating).await
    }
}

impl<T: RatingSource + Send + Sync> RatingSource for Arc<T> {
    async fn aggregate(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<f64, SourceError> {
        self.as_ref().aggregate(record_id, record_type).await
    }

    async fn put(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), SourceError> {
        self.as_ref().put(record_id, record_type, rating).await
    }
}
