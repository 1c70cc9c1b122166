use crate::errors::StoreError;
use crate::model::{MovieDetails, MovieId, MovieWrite, Rating, RecordId, RecordType, UserRating};
use std::future::Future;
use std::sync::Arc;

/// Trait defining the contract for movie store implementations.
///
/// A movie store durably owns movie records and their per-user ratings. Every
/// operation that touches more than one row is atomic: it either commits all of
/// its effects or none of them. In particular a movie's ratings are deleted in
/// the same unit of work as the movie, so no rating ever outlives its movie.
///
/// The MovieStore trait hides how backends achieve atomicity (PostgreSQL uses
/// transactions, in-memory uses a single write lock).
///
/// Implementations include:
/// - `moviecore-postgres`: Production PostgreSQL backend
/// - `moviecore-memory`: In-memory backend for testing
pub trait MovieStore {
    /// Read a movie together with its aggregate rating.
    ///
    /// The aggregate is the mean of the movie's rating values and is
    /// [`AggregateRating::Absent`](crate::AggregateRating::Absent) when the
    /// movie has no ratings.
    ///
    /// # Returns
    ///
    /// * `Ok(MovieDetails)` - The movie exists
    /// * `Err(StoreError::NotFound)` - No movie has this identifier
    fn get(
        &self,
        id: &MovieId,
    ) -> impl Future<Output = Result<MovieDetails, StoreError>> + Send;

    /// Insert a movie if it does not exist yet, plus an optional initial rating.
    ///
    /// An existing movie row is left untouched (insert-if-absent). The rating,
    /// when present, is upserted by key with [`RecordType::Movie`]. Both steps
    /// commit together or not at all.
    fn put(&self, movie: &MovieWrite) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Update a movie's mutable fields and, when present, the matching rating row.
    ///
    /// Returns `Err(StoreError::NotFound)` without changing anything when the
    /// movie does not exist. A rating whose key has no row is not created.
    fn update(&self, movie: &MovieWrite)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a movie and all of its ratings atomically.
    ///
    /// Returns `Err(StoreError::NotFound)` without changing anything when the
    /// movie does not exist.
    fn delete(&self, id: &MovieId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Page through movies ordered by identifier.
    ///
    /// `take == 0` yields an empty page. Negative arguments are a caller bug
    /// and fail with `Err(StoreError::InvalidPage)`.
    fn list(
        &self,
        skip: i64,
        take: i64,
    ) -> impl Future<Output = Result<Vec<MovieDetails>, StoreError>> + Send;

    /// Insert or replace one user's rating of a record.
    ///
    /// Returns `Err(StoreError::NotFound)` when the owning movie does not exist.
    fn put_rating(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All rating rows of a record, ordered by user.
    ///
    /// An empty result is not an error.
    fn ratings(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> impl Future<Output = Result<Vec<Rating>, StoreError>> + Send;
}

/// Validated `list` arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    skip: u64,
    take: u64,
}

impl Page {
    /// Validate raw offset/limit arguments.
    pub fn try_new(skip: i64, take: i64) -> Result<Self, StoreError> {
        match (u64::try_from(skip), u64::try_from(take)) {
            (Ok(skip), Ok(take)) => Ok(Self { skip, take }),
            _ => Err(StoreError::InvalidPage { skip, take }),
        }
    }

    /// Number of movies to pass over.
    pub const fn skip(self) -> u64 {
        self.skip
    }

    /// Maximum number of movies to return.
    pub const fn take(self) -> u64 {
        self.take
    }

    /// The offset as a `usize`, saturating on narrow platforms.
    pub fn skip_usize(self) -> usize {
        usize::try_from(self.skip).unwrap_or(usize::MAX)
    }

    /// The limit as a `usize`, saturating on narrow platforms.
    pub fn take_usize(self) -> usize {
        usize::try_from(self.take).unwrap_or(usize::MAX)
    }
}

/// Blanket implementation allowing MovieStore to work with references.
impl<T: MovieStore + Sync> MovieStore for &T {
    async fn get(&self, id: &MovieId) -> Result<MovieDetails, StoreError> {
        (*self).get(id).await
    }

    async fn put(&self, movie: &MovieWrite) -> Result<(), StoreError> {
        (*self).put(movie).await
    }

    async fn update(&self, movie: &MovieWrite) -> Result<(), StoreError> {
        (*self).update(movie).await
    }

    async fn delete(&self, id: &MovieId) -> Result<(), StoreError> {
        (*self).delete(id).await
    }

    async fn list(&self, skip: i64, take: i64) -> Result<Vec<MovieDetails>, StoreError> {
        (*self).list(skip, take).await
    }

    async fn put_rating(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), StoreError> {
        (*self).put_rating(record_id, record_type, rating).await
    }

    async fn ratings(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<Vec<Rating>, StoreError> {
        (*self).ratings(record_id, record_type).await
    }
}

impl<T: MovieStore + Send + Sync> MovieStore for Arc<T> {
    async fn get(&self, id: &MovieId) -> Result<MovieDetails, StoreError> {
        self.as_ref().get(id).await
    }

    async fn put(&self, movie: &MovieWrite) -> Result<(), StoreError> {
        self.as_ref().put(movie).await
    }

    async fn update(&self, movie: &MovieWrite) -> Result<(), StoreError> {
        self.as_ref().update(movie).await
    }

    async fn delete(&self, id: &MovieId) -> Result<(), StoreError> {
        self.as_ref().delete(id).await
    }

    async fn list(&self, skip: i64, take: i64) -> Result<Vec<MovieDetails>, StoreError> {
        self.as_ref().list(skip, take).await
    }

    async fn put_rating(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), StoreError> {
        self.as_ref().put_rating(record_id, record_type, rating).await
    }

    async fn ratings(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<Vec<Rating>, StoreError> {
        self.as_ref().ratings(record_id, record_type).await
    }
}
