use moviecore_types::{
    AggregateRating, MetadataSource, MovieDetails, MovieError, MovieId, MovieStore, RatingSource,
    RecordId, RecordType, SourceError, UserRating,
};
use tracing::{debug, error, instrument};

use crate::single_store::StoreBackedSources;

/// Aggregates movie metadata with its rating.
///
/// The service holds no state of its own; every call goes to the two
/// collaborators. It is `Send + Sync` whenever they are, so one instance can
/// serve concurrent requests.
#[derive(Debug, Clone)]
pub struct MovieService<M, R> {
    metadata: M,
    ratings: R,
}

impl<M, R> MovieService<M, R> {
    /// Create a service over a metadata source and a rating source.
    pub const fn new(metadata: M, ratings: R) -> Self {
        Self { metadata, ratings }
    }

    /// The metadata collaborator.
    pub const fn metadata(&self) -> &M {
        &self.metadata
    }

    /// The rating collaborator.
    pub const fn ratings(&self) -> &R {
        &self.ratings
    }
}

impl<S: MovieStore> MovieService<StoreBackedSources<S>, StoreBackedSources<S>> {
    /// Serve both collaborators from one movie store.
    pub fn single_store(store: S) -> Self {
        let sources = StoreBackedSources::new(store);
        Self::new(sources.clone(), sources)
    }
}

impl<M, R> MovieService<M, R>
where
    M: MetadataSource + Sync,
    R: RatingSource + Sync,
{
    /// Movie metadata together with its aggregate rating.
    ///
    /// The rating subsystem is only consulted once the metadata subsystem has
    /// confirmed the movie exists. A movie nobody has rated yet comes back with
    /// [`AggregateRating::Absent`]; any other rating-subsystem failure fails
    /// the whole call.
    ///
    /// # Errors
    ///
    /// * [`MovieError::NotFound`] - the metadata subsystem does not know `id`
    /// * [`MovieError::Internal`] - either subsystem failed
    #[instrument(name = "movie_service.get_details", skip(self), fields(movie_id = %id))]
    pub async fn get_details(&self, id: &MovieId) -> Result<MovieDetails, MovieError> {
        let metadata = match self.metadata.get(id).await {
            Ok(record) => record,
            Err(SourceError::NotFound) => {
                debug!("[movie_service.get_details] movie not found");
                return Err(MovieError::NotFound {
                    movie_id: id.clone(),
                });
            }
            Err(source) => {
                error!(
                    error = %source,
                    "[movie_service.get_details] metadata lookup failed"
                );
                return Err(MovieError::internal(source));
            }
        };

        let rating = match self.ratings.aggregate(id, RecordType::Movie).await {
            Ok(value) => AggregateRating::Present(value),
            Err(SourceError::NotFound) => {
                debug!("[movie_service.get_details] movie has no ratings yet");
                AggregateRating::Absent
            }
            Err(source) => {
                error!(
                    error = %source,
                    "[movie_service.get_details] rating lookup failed"
                );
                return Err(MovieError::internal(source));
            }
        };

        Ok(MovieDetails::new(metadata, rating))
    }

    /// Forward a user's rating to the rating subsystem unchanged.
    ///
    /// # Errors
    ///
    /// * [`MovieError::NotFound`] - the rating subsystem rejected the record as unknown
    /// * [`MovieError::Internal`] - the rating subsystem failed
    #[instrument(
        name = "movie_service.put_rating",
        skip(self, rating),
        fields(record_id = %record_id, record_type = %record_type, user_id = %rating.user_id)
    )]
    pub async fn put_rating(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), MovieError> {
        match self.ratings.put(record_id, record_type, rating).await {
            Ok(()) => Ok(()),
            Err(SourceError::NotFound) => {
                debug!("[movie_service.put_rating] record not found");
                Err(MovieError::NotFound {
                    movie_id: record_id.clone(),
                })
            }
            Err(source) => {
                error!(
                    error = %source,
                    "[movie_service.put_rating] rating submission failed"
                );
                Err(MovieError::internal(source))
            }
        }
    }
}
