//! Behavioural contract every `MovieStore` implementation must satisfy.
//!
//! Each scenario builds its own identifiers with a UUIDv7 suffix so the suite
//! can run in parallel against a shared database.

use moviecore_types::{
    AggregateRating, MovieDetails, MovieId, MovieRecord, MovieStore, MovieWrite, RatingValue,
    RecordType, StoreError, UserId, UserRating,
};
use std::fmt;
use uuid::Uuid;

#[derive(Debug)]
pub struct ContractTestFailure {
    scenario: &'static str,
    detail: String,
}

impl ContractTestFailure {
    fn new(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self {
            scenario,
            detail: detail.into(),
        }
    }

    fn store_error(scenario: &'static str, operation: &'static str, error: &StoreError) -> Self {
        Self::new(
            scenario,
            format!("{operation} operation returned unexpected error: {error}"),
        )
    }

    fn assertion(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self::new(scenario, detail)
    }
}

impl fmt::Display for ContractTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scenario, self.detail)
    }
}

impl std::error::Error for ContractTestFailure {}

pub type ContractTestResult = Result<(), ContractTestFailure>;

fn contract_movie_id(scenario: &'static str, label: &str) -> Result<MovieId, ContractTestFailure> {
    // Include UUID for parallel test execution against shared database
    let raw = format!("contract::{scenario}::{label}::{}", Uuid::now_v7());

    MovieId::try_new(raw.clone()).map_err(|error| {
        ContractTestFailure::assertion(
            scenario,
            format!("unable to construct movie id `{raw}`: {error}"),
        )
    })
}

fn contract_user_rating(
    scenario: &'static str,
    user: &str,
    value: i32,
) -> Result<UserRating, ContractTestFailure> {
    let user_id = UserId::try_new(user).map_err(|error| {
        ContractTestFailure::assertion(scenario, format!("unable to construct user id: {error}"))
    })?;
    Ok(UserRating::new(user_id, RatingValue::new(value)))
}

fn contract_movie(id: &MovieId, title: &str) -> MovieWrite {
    MovieWrite::new(MovieRecord::new(
        id.clone(),
        title,
        format!("{title} description"),
        format!("{title} director"),
    ))
}

async fn put_movie<S: MovieStore>(
    scenario: &'static str,
    store: &S,
    movie: &MovieWrite,
) -> ContractTestResult {
    store
        .put(movie)
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "put", &error))
}

async fn get_movie<S: MovieStore>(
    scenario: &'static str,
    store: &S,
    id: &MovieId,
) -> Result<MovieDetails, ContractTestFailure> {
    store
        .get(id)
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "get", &error))
}

async fn rating_row_count<S: MovieStore>(
    scenario: &'static str,
    store: &S,
    id: &MovieId,
) -> Result<usize, ContractTestFailure> {
    store
        .ratings(id, RecordType::Movie)
        .await
        .map(|ratings| ratings.len())
        .map_err(|error| ContractTestFailure::store_error(scenario, "ratings", &error))
}

fn expect_not_found<T: fmt::Debug>(
    scenario: &'static str,
    operation: &'static str,
    id: &MovieId,
    result: Result<T, StoreError>,
) -> ContractTestResult {
    match result {
        Err(StoreError::NotFound { movie_id }) if &movie_id == id => Ok(()),
        Err(error) => Err(ContractTestFailure::store_error(scenario, operation, &error)),
        Ok(value) => Err(ContractTestFailure::assertion(
            scenario,
            format!("expected {operation} to report not found but it returned {value:?}"),
        )),
    }
}

fn expect_rating(
    scenario: &'static str,
    details: &MovieDetails,
    expected: AggregateRating,
) -> ContractTestResult {
    if details.rating == expected {
        Ok(())
    } else {
        Err(ContractTestFailure::assertion(
            scenario,
            format!(
                "expected rating {expected:?} for {} but observed {:?}",
                details.id(),
                details.rating
            ),
        ))
    }
}

/// A stored movie reads back unchanged, with no rating.
pub async fn test_put_then_get_round_trip<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "put_then_get_round_trip";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "movie")?;
    let movie = contract_movie(&id, "Round Trip");

    put_movie(SCENARIO, &store, &movie).await?;
    let details = get_movie(SCENARIO, &store, &id).await?;

    if details.metadata != movie.record {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!(
                "expected metadata {:?} but observed {:?}",
                movie.record, details.metadata
            ),
        ));
    }

    expect_rating(SCENARIO, &details, AggregateRating::Absent)
}

/// Putting an existing id leaves the stored movie untouched.
pub async fn test_put_is_insert_if_absent<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "put_is_insert_if_absent";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "movie")?;
    let original = contract_movie(&id, "Original");

    put_movie(SCENARIO, &store, &original).await?;
    put_movie(SCENARIO, &store, &contract_movie(&id, "Replacement")).await?;

    let details = get_movie(SCENARIO, &store, &id).await?;
    if details.metadata == original.record {
        Ok(())
    } else {
        Err(ContractTestFailure::assertion(
            SCENARIO,
            format!(
                "second put overwrote the movie; observed title `{}`",
                details.metadata.title
            ),
        ))
    }
}

/// A put carrying a rating stores both in one step.
pub async fn test_put_with_initial_rating<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "put_with_initial_rating";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "movie")?;
    let movie = contract_movie(&id, "Rated").with_rating(contract_user_rating(SCENARIO, "u1", 4)?);

    put_movie(SCENARIO, &store, &movie).await?;

    let details = get_movie(SCENARIO, &store, &id).await?;
    expect_rating(SCENARIO, &details, AggregateRating::Present(4.0))?;

    let rows = rating_row_count(SCENARIO, &store, &id).await?;
    if rows == 1 {
        Ok(())
    } else {
        Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected exactly one rating row but observed {rows}"),
        ))
    }
}

/// Ratings averaging zero report `Present(0.0)`, not `Absent`.
pub async fn test_zero_average_is_not_absent<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "zero_average_is_not_absent";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "movie")?;

    put_movie(SCENARIO, &store, &contract_movie(&id, "Balanced")).await?;
    for (user, value) in [("u1", -2), ("u2", 2)] {
        store
            .put_rating(&id, RecordType::Movie, contract_user_rating(SCENARIO, user, value)?)
            .await
            .map_err(|error| ContractTestFailure::store_error(SCENARIO, "put_rating", &error))?;
    }

    let details = get_movie(SCENARIO, &store, &id).await?;
    expect_rating(SCENARIO, &details, AggregateRating::Present(0.0))
}

/// Rating twice as the same user replaces the first value.
pub async fn test_rating_upsert_overwrites<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "rating_upsert_overwrites";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "movie")?;
    put_movie(SCENARIO, &store, &contract_movie(&id, "Upsert")).await?;

    for value in [1, 3] {
        store
            .put_rating(&id, RecordType::Movie, contract_user_rating(SCENARIO, "u1", value)?)
            .await
            .map_err(|error| ContractTestFailure::store_error(SCENARIO, "put_rating", &error))?;
    }

    let rows = rating_row_count(SCENARIO, &store, &id).await?;
    if rows != 1 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("repeated rating by one user should keep one row but observed {rows}"),
        ));
    }

    let details = get_movie(SCENARIO, &store, &id).await?;
    expect_rating(SCENARIO, &details, AggregateRating::Present(3.0))
}

/// A rating for an unknown movie is rejected and not stored.
pub async fn test_put_rating_for_missing_movie<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "put_rating_for_missing_movie";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "ghost")?;

    let result = store
        .put_rating(&id, RecordType::Movie, contract_user_rating(SCENARIO, "u1", 5)?)
        .await;
    expect_not_found(SCENARIO, "put_rating", &id, result)?;

    let rows = rating_row_count(SCENARIO, &store, &id).await?;
    if rows == 0 {
        Ok(())
    } else {
        Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("rejected rating left {rows} orphan rows behind"),
        ))
    }
}

/// Update rewrites metadata and an existing rating.
pub async fn test_update_changes_fields_and_rating<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "update_changes_fields_and_rating";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "movie")?;
    put_movie(
        SCENARIO,
        &store,
        &contract_movie(&id, "Before").with_rating(contract_user_rating(SCENARIO, "u1", 1)?),
    )
    .await?;

    let updated = contract_movie(&id, "After").with_rating(contract_user_rating(SCENARIO, "u1", 5)?);
    store
        .update(&updated)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "update", &error))?;

    let details = get_movie(SCENARIO, &store, &id).await?;
    if details.metadata != updated.record {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!(
                "expected updated metadata {:?} but observed {:?}",
                updated.record, details.metadata
            ),
        ));
    }

    expect_rating(SCENARIO, &details, AggregateRating::Present(5.0))
}

/// Updating an unknown movie is `NotFound`.
pub async fn test_update_missing_movie<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "update_missing_movie";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "ghost")?;
    let movie = contract_movie(&id, "Ghost").with_rating(contract_user_rating(SCENARIO, "u1", 3)?);

    let result = store.update(&movie).await;
    expect_not_found(SCENARIO, "update", &id, result)?;

    // The failed update must not have created the movie.
    expect_not_found(SCENARIO, "get", &id, store.get(&id).await)
}

/// Delete removes the movie together with every rating of it.
pub async fn test_delete_removes_movie_and_ratings<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "delete_removes_movie_and_ratings";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "movie")?;
    let sibling = contract_movie_id(SCENARIO, "sibling")?;

    put_movie(
        SCENARIO,
        &store,
        &contract_movie(&id, "Doomed").with_rating(contract_user_rating(SCENARIO, "u1", 2)?),
    )
    .await?;
    store
        .put_rating(&id, RecordType::Movie, contract_user_rating(SCENARIO, "u2", 4)?)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "put_rating", &error))?;
    put_movie(
        SCENARIO,
        &store,
        &contract_movie(&sibling, "Survivor").with_rating(contract_user_rating(SCENARIO, "u1", 5)?),
    )
    .await?;

    store
        .delete(&id)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "delete", &error))?;

    expect_not_found(SCENARIO, "get", &id, store.get(&id).await)?;

    let orphan_rows = rating_row_count(SCENARIO, &store, &id).await?;
    if orphan_rows != 0 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("delete left {orphan_rows} orphan rating rows"),
        ));
    }

    let sibling_rows = rating_row_count(SCENARIO, &store, &sibling).await?;
    if sibling_rows == 1 {
        Ok(())
    } else {
        Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("delete touched another movie's ratings; sibling has {sibling_rows} rows"),
        ))
    }
}

/// Deleting an unknown movie is `NotFound`.
pub async fn test_delete_missing_movie<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "delete_missing_movie";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "ghost")?;

    let result = store.delete(&id).await;
    expect_not_found(SCENARIO, "delete", &id, result)
}

/// List pages through movies in identifier order.
pub async fn test_list_pagination<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "list_pagination";

    let store = make_store();
    let mut ids = Vec::new();
    for label in ["c", "a", "b"] {
        let id = contract_movie_id(SCENARIO, label)?;
        put_movie(SCENARIO, &store, &contract_movie(&id, label)).await?;
        ids.push(id);
    }
    store
        .put_rating(&ids[0], RecordType::Movie, contract_user_rating(SCENARIO, "u1", 5)?)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "put_rating", &error))?;

    let empty = store
        .list(0, 0)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "list", &error))?;
    if !empty.is_empty() {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("take=0 should yield no entries but observed {}", empty.len()),
        ));
    }

    let bounded = store
        .list(0, 2)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "list", &error))?;
    if bounded.len() > 2 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("take=2 returned {} entries", bounded.len()),
        ));
    }

    let everything = store
        .list(0, i64::from(i32::MAX))
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "list", &error))?;
    if everything
        .windows(2)
        .any(|pair| pair[0].id() >= pair[1].id())
    {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "list entries are not strictly ordered by identifier",
        ));
    }

    let mut expected = ids.clone();
    expected.sort();
    let observed: Vec<&MovieDetails> = everything
        .iter()
        .filter(|details| ids.contains(details.id()))
        .collect();
    let observed_ids: Vec<&MovieId> = observed.iter().map(|details| details.id()).collect();
    if observed_ids != expected.iter().collect::<Vec<_>>() {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected inserted movies in order {expected:?} but observed {observed_ids:?}"),
        ));
    }

    for details in observed {
        let single = get_movie(SCENARIO, &store, details.id()).await?;
        expect_rating(SCENARIO, details, single.rating)?;
    }

    match store.list(-1, 2).await {
        Err(StoreError::InvalidPage { .. }) => Ok(()),
        Err(error) => Err(ContractTestFailure::store_error(SCENARIO, "list", &error)),
        Ok(page) => Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("negative skip should be rejected but returned {} entries", page.len()),
        )),
    }
}

/// Put, rate, read, delete: the full life of one movie.
pub async fn test_movie_lifecycle<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: MovieStore + Send + Sync + 'static,
{
    const SCENARIO: &str = "movie_lifecycle";

    let store = make_store();
    let id = contract_movie_id(SCENARIO, "m1")?;
    let movie = MovieWrite::new(MovieRecord::new(id.clone(), "A", "d", "x"));

    put_movie(SCENARIO, &store, &movie).await?;
    let details = get_movie(SCENARIO, &store, &id).await?;
    expect_rating(SCENARIO, &details, AggregateRating::Absent)?;

    store
        .put_rating(&id, RecordType::Movie, contract_user_rating(SCENARIO, "u1", 5)?)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "put_rating", &error))?;
    let details = get_movie(SCENARIO, &store, &id).await?;
    expect_rating(SCENARIO, &details, AggregateRating::Present(5.0))?;

    store
        .delete(&id)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "delete", &error))?;
    expect_not_found(SCENARIO, "get", &id, store.get(&id).await)
}

#[macro_export]
macro_rules! movie_store_contract_tests {
    (suite = $suite:ident, make_store = $make_store:expr $(,)?) => {
        #[allow(non_snake_case)]
        mod $suite {
            use $crate::contract::{
                test_delete_missing_movie, test_delete_removes_movie_and_ratings,
                test_list_pagination, test_movie_lifecycle, test_put_is_insert_if_absent,
                test_put_rating_for_missing_movie, test_put_then_get_round_trip,
                test_put_with_initial_rating, test_rating_upsert_overwrites,
                test_update_changes_fields_and_rating, test_update_missing_movie,
                test_zero_average_is_not_absent,
            };

            #[tokio::test(flavor = "multi_thread")]
            async fn put_then_get_round_trip_contract() {
                test_put_then_get_round_trip($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn put_is_insert_if_absent_contract() {
                test_put_is_insert_if_absent($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn put_with_initial_rating_contract() {
                test_put_with_initial_rating($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn zero_average_is_not_absent_contract() {
                test_zero_average_is_not_absent($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn rating_upsert_overwrites_contract() {
                test_rating_upsert_overwrites($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn put_rating_for_missing_movie_contract() {
                test_put_rating_for_missing_movie($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn update_changes_fields_and_rating_contract() {
                test_update_changes_fields_and_rating($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn update_missing_movie_contract() {
                test_update_missing_movie($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn delete_removes_movie_and_ratings_contract() {
                test_delete_removes_movie_and_ratings($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn delete_missing_movie_contract() {
                test_delete_missing_movie($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn list_pagination_contract() {
                test_list_pagination($make_store)
                    .await
                    .expect("movie store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn movie_lifecycle_contract() {
                test_movie_lifecycle($make_store)
                    .await
                    .expect("movie store contract failed");
            }
        }
    };
}

pub use movie_store_contract_tests;
