use std::future::Future;

use moviecore_types::{
    MetadataSource, MovieDetails, MovieId, MovieRecord, MovieStore, MovieWrite, Operation,
    Rating, RatingSource, RecordId, RecordType, SourceError, StoreError, UserRating,
};
use nutype::nutype;
use parking_lot::Mutex;
use rand::{random, rngs::StdRng, Rng, SeedableRng};

/// Probability value for chaos engineering injection rates.
///
/// Probability represents a value in the range [0.0, 1.0] where 0.0 means
/// never inject failures and 1.0 means always inject failures.
///
/// # Examples
///
/// ```ignore
/// use moviecore_testing::chaos::Probability;
///
/// let never = Probability::try_new(0.0).unwrap();
/// let always = Probability::try_new(1.0).unwrap();
///
/// assert!(Probability::try_new(1.5).is_err());
/// ```
#[nutype(
    validate(greater_or_equal = 0.0, less_or_equal = 1.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Into)
)]
pub struct Probability(f32);

#[derive(Debug, Clone)]
pub struct ChaosConfig {
    deterministic_seed: Option<u64>,
    failure_probability: Probability,
}

impl ChaosConfig {
    pub fn deterministic() -> Self {
        Self {
            deterministic_seed: Some(0),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.deterministic_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_failure_probability(mut self, probability: f32) -> Self {
        self.failure_probability = Probability::try_new(probability.clamp(0.0, 1.0))
            .expect("clamped value is always valid");
        self
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            deterministic_seed: None,
            failure_probability: Probability::try_new(0.0).expect("0.0 is valid probability"),
        }
    }
}

pub trait ChaosStoreExt: Sized {
    fn with_chaos(self, config: ChaosConfig) -> ChaosStore<Self>;
}

/// Wraps a store or source and fails a configurable share of its calls.
///
/// Injected failures surface as `StoreError::StoreFailure` or
/// `SourceError::Unavailable`, the same shapes a real backend produces when
/// its database goes away. The wrapped value never sees a failed call.
pub struct ChaosStore<S> {
    inner: S,
    config: ChaosConfig,
    rng: Mutex<StdRng>,
}

impl<S> ChaosStore<S> {
    pub fn new(inner: S, config: ChaosConfig) -> Self {
        let rng = match config.deterministic_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(random()),
        };

        Self {
            inner,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }

    fn should_fail(&self) -> bool {
        let probability: f32 = self.config.failure_probability.into();

        if probability <= 0.0 {
            return false;
        }

        if probability >= 1.0 {
            return true;
        }

        self.rng.lock().random_bool(f64::from(probability))
    }

    fn store_failure(&self, operation: Operation) -> Option<StoreError> {
        self.should_fail()
            .then_some(StoreError::StoreFailure { operation })
    }

    fn source_failure(&self, operation: Operation) -> Option<SourceError> {
        self.should_fail()
            .then(|| SourceError::unavailable(operation, "chaos: injected failure"))
    }
}

impl<S> MovieStore for ChaosStore<S>
where
    S: MovieStore + Sync,
{
    fn get(&self, id: &MovieId) -> impl Future<Output = Result<MovieDetails, StoreError>> + Send {
        let failure = self.store_failure(Operation::GetMovie);
        let store = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            store.get(id).await
        }
    }

    fn put(&self, movie: &MovieWrite) -> impl Future<Output = Result<(), StoreError>> + Send {
        let failure = self.store_failure(Operation::InsertMovie);
        let store = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            store.put(movie).await
        }
    }

    fn update(&self, movie: &MovieWrite) -> impl Future<Output = Result<(), StoreError>> + Send {
        let failure = self.store_failure(Operation::UpdateMovie);
        let store = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            store.update(movie).await
        }
    }

    fn delete(&self, id: &MovieId) -> impl Future<Output = Result<(), StoreError>> + Send {
        let failure = self.store_failure(Operation::DeleteMovie);
        let store = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            store.delete(id).await
        }
    }

    fn list(
        &self,
        skip: i64,
        take: i64,
    ) -> impl Future<Output = Result<Vec<MovieDetails>, StoreError>> + Send {
        let failure = self.store_failure(Operation::ListMovies);
        let store = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            store.list(skip, take).await
        }
    }

    fn put_rating(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let failure = self.store_failure(Operation::UpsertRating);
        let store = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            store.put_rating(record_id, record_type, rating).await
        }
    }

    fn ratings(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> impl Future<Output = Result<Vec<Rating>, StoreError>> + Send {
        let failure = self.store_failure(Operation::ReadRatings);
        let store = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            store.ratings(record_id, record_type).await
        }
    }
}

impl<S> MetadataSource for ChaosStore<S>
where
    S: MetadataSource + Sync,
{
    fn get(&self, id: &MovieId) -> impl Future<Output = Result<MovieRecord, SourceError>> + Send {
        let failure = self.source_failure(Operation::GetMetadata);
        let source = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            source.get(id).await
        }
    }
}

impl<S> RatingSource for ChaosStore<S>
where
    S: RatingSource + Sync,
{
    fn aggregate(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> impl Future<Output = Result<f64, SourceError>> + Send {
        let failure = self.source_failure(Operation::GetAggregateRating);
        let source = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            source.aggregate(record_id, record_type).await
        }
    }

    fn put(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> impl Future<Output = Result<(), SourceError>> + Send {
        let failure = self.source_failure(Operation::PutRating);
        let source = &self.inner;

        async move {
            if let Some(error) = failure {
                return Err(error);
            }

            source.put(record_id, record_type, rating).await
        }
    }
}

impl<S> ChaosStoreExt for S {
    fn with_chaos(self, config: ChaosConfig) -> ChaosStore<Self> {
        ChaosStore::new(self, config)
    }
}
