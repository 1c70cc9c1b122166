use std::sync::Arc;

use moviecore_types::{
    MetadataSource, MovieId, MovieRecord, MovieStore, Operation, RatingSource,
    RecordId, RecordType, SourceError, StoreError, UserRating,
};

/// Both collaborator contracts served by one [`MovieStore`].
///
/// The metadata subsystem is the store's movie table and the rating subsystem
/// is its rating table, so a movie and its ratings live and die together.
/// Both lookups go through [`MovieStore::get`], so the aggregate is the one
/// the store computes itself. Clones share the same store.
#[derive(Debug)]
pub struct StoreBackedSources<S> {
    store: Arc<S>,
}

impl<S> StoreBackedSources<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// The underlying store, for writes the controller does not expose.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> Clone for StoreBackedSources<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn to_source_error(error: StoreError, operation: Operation) -> SourceError {
    match error {
        StoreError::NotFound { .. } => SourceError::NotFound,
        other => SourceError::unavailable(operation, other),
    }
}

impl<S> MetadataSource for StoreBackedSources<S>
where
    S: MovieStore + Send + Sync,
{
    async fn get(&self, id: &MovieId) -> Result<MovieRecord, SourceError> {
        MovieStore::get(self.store.as_ref(), id)
            .await
            .map(|details| details.metadata)
            .map_err(|error| to_source_error(error, Operation::GetMetadata))
    }
}

impl<S> RatingSource for StoreBackedSources<S>
where
    S: MovieStore + Send + Sync,
{
    async fn aggregate(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<f64, SourceError> {
        let details = match record_type {
            RecordType::Movie => MovieStore::get(self.store.as_ref(), record_id)
                .await
                .map_err(|error| to_source_error(error, Operation::GetAggregateRating))?,
        };

        details.rating.value().ok_or(SourceError::NotFound)
    }

    async fn put(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), SourceError> {
        self.store
            .put_rating(record_id, record_type, rating)
            .await
            .map_err(|error| to_source_error(error, Operation::PutRating))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moviecore_memory::InMemoryMovieStore;
    use moviecore_types::{MovieDetails, MovieWrite, Rating, RatingValue, UserId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn movie_id(raw: &str) -> MovieId {
        MovieId::try_new(raw).expect("valid movie id")
    }

    fn user_rating(user: &str, value: i32) -> UserRating {
        UserRating::new(
            UserId::try_new(user).expect("valid user id"),
            RatingValue::new(value),
        )
    }

    #[tokio::test]
    async fn clones_share_one_store() {
        let sources = StoreBackedSources::new(InMemoryMovieStore::new());
        let clone = sources.clone();

        assert!(Arc::ptr_eq(&sources.store, &clone.store));
    }

    #[tokio::test]
    async fn aggregate_is_mean_of_store_ratings() {
        let sources = StoreBackedSources::new(InMemoryMovieStore::new());
        let id = movie_id("m1");
        sources
            .store()
            .put(&MovieWrite::new(MovieRecord::new(id.clone(), "A", "d", "x")))
            .await
            .unwrap();

        assert_eq!(
            sources.aggregate(&id, RecordType::Movie).await,
            Err(SourceError::NotFound)
        );

        RatingSource::put(&sources, &id, RecordType::Movie, user_rating("u1", 2))
            .await
            .unwrap();
        RatingSource::put(&sources, &id, RecordType::Movie, user_rating("u2", 5))
            .await
            .unwrap();

        assert_eq!(sources.aggregate(&id, RecordType::Movie).await, Ok(3.5));
    }

    /// Counts calls while delegating to an in-memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryMovieStore,
        gets: AtomicUsize,
        rating_reads: AtomicUsize,
    }

    impl MovieStore for CountingStore {
        async fn get(&self, id: &MovieId) -> Result<MovieDetails, StoreError> {
            let _ = self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(id).await
        }

        async fn put(&self, movie: &MovieWrite) -> Result<(), StoreError> {
            self.inner.put(movie).await
        }

        async fn update(&self, movie: &MovieWrite) -> Result<(), StoreError> {
            self.inner.update(movie).await
        }

        async fn delete(&self, id: &MovieId) -> Result<(), StoreError> {
            self.inner.delete(id).await
        }

        async fn list(&self, skip: i64, take: i64) -> Result<Vec<MovieDetails>, StoreError> {
            self.inner.list(skip, take).await
        }

        async fn put_rating(
            &self,
            record_id: &RecordId,
            record_type: RecordType,
            rating: UserRating,
        ) -> Result<(), StoreError> {
            self.inner.put_rating(record_id, record_type, rating).await
        }

        async fn ratings(
            &self,
            record_id: &RecordId,
            record_type: RecordType,
        ) -> Result<Vec<Rating>, StoreError> {
            let _ = self.rating_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.ratings(record_id, record_type).await
        }
    }

    #[tokio::test]
    async fn aggregate_comes_from_the_store_aggregate_query() {
        let sources = StoreBackedSources::new(CountingStore::default());
        let id = movie_id("m1");
        sources
            .store()
            .put(
                &MovieWrite::new(MovieRecord::new(id.clone(), "A", "d", "x"))
                    .with_rating(user_rating("u1", 4)),
            )
            .await
            .unwrap();

        assert_eq!(sources.aggregate(&id, RecordType::Movie).await, Ok(4.0));
        assert_eq!(sources.store().gets.load(Ordering::SeqCst), 1);
        assert_eq!(sources.store().rating_reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn aggregate_of_missing_movie_is_not_found() {
        let sources = StoreBackedSources::new(InMemoryMovieStore::new());

        assert_eq!(
            sources.aggregate(&movie_id("ghost"), RecordType::Movie).await,
            Err(SourceError::NotFound)
        );
    }

    #[tokio::test]
    async fn rating_for_missing_movie_is_not_found() {
        let sources = StoreBackedSources::new(InMemoryMovieStore::new());

        let result =
            RatingSource::put(&sources, &movie_id("ghost"), RecordType::Movie, user_rating("u1", 1))
                .await;

        assert_eq!(result, Err(SourceError::NotFound));
        assert_eq!(sources.store().rating_count(), 0);
    }

    #[test]
    fn store_failure_becomes_unavailable() {
        let error = to_source_error(
            StoreError::StoreFailure {
                operation: Operation::GetMovie,
            },
            Operation::GetMetadata,
        );

        assert!(matches!(
            error,
            SourceError::Unavailable {
                operation: Operation::GetMetadata,
                ..
            }
        ));
    }
}
