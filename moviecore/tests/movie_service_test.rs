use moviecore::{
    AggregateRating, InMemoryMetadataRepository, InMemoryMovieStore, InMemoryRatingRepository,
    MovieError, MovieId, MovieRecord, MovieService, MovieStore, MovieWrite, RatingValue,
    RecordType, UserId, UserRating,
};
use moviecore_testing::{ChaosConfig, ChaosStoreExt};

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
async fn single_store_movie_lifecycle() {
    let service = MovieService::single_store(InMemoryMovieStore::new());
    let store = service.metadata().store();
    let id = movie_id("m1");

    store
        .put(&MovieWrite::new(MovieRecord::new(id.clone(), "A", "d", "x")))
        .await
        .expect("put succeeds");

    let details = service.get_details(&id).await.expect("movie exists");
    assert_eq!(details.rating, AggregateRating::Absent);
    assert_eq!(details.metadata.title, "A");

    service
        .put_rating(&id, RecordType::Movie, user_rating("u1", 5))
        .await
        .expect("rating accepted");

    let details = service.get_details(&id).await.expect("movie exists");
    assert_eq!(details.rating, AggregateRating::Present(5.0));

    store.delete(&id).await.expect("delete succeeds");

    assert_eq!(
        service.get_details(&id).await,
        Err(MovieError::NotFound { movie_id: id.clone() })
    );
    assert!(store
        .ratings(&id, RecordType::Movie)
        .await
        .expect("ratings readable")
        .is_empty());
}

#[tokio::test]
async fn single_store_rejects_rating_for_unknown_movie() {
    let service = MovieService::single_store(InMemoryMovieStore::new());

    let result = service
        .put_rating(&movie_id("ghost"), RecordType::Movie, user_rating("u1", 3))
        .await;

    assert_eq!(
        result,
        Err(MovieError::NotFound {
            movie_id: movie_id("ghost")
        })
    );
    assert_eq!(service.metadata().store().rating_count(), 0);
}

#[tokio::test]
async fn single_store_outage_is_internal() {
    let store = InMemoryMovieStore::new()
        .with_chaos(ChaosConfig::deterministic().with_failure_probability(1.0));
    let service = MovieService::single_store(store);

    let result = service.get_details(&movie_id("m1")).await;

    assert!(matches!(result, Err(MovieError::Internal { .. })));
}

#[tokio::test]
async fn two_source_mode_combines_independent_subsystems() {
    let metadata = InMemoryMetadataRepository::new();
    let ratings = InMemoryRatingRepository::new();
    let service = MovieService::new(metadata.clone(), ratings.clone());
    let id = movie_id("m1");
    metadata.put(MovieRecord::new(id.clone(), "A", "d", "x"));

    for (user, value) in [("u1", 2), ("u2", 3)] {
        service
            .put_rating(&id, RecordType::Movie, user_rating(user, value))
            .await
            .expect("rating accepted");
    }

    let details = service.get_details(&id).await.expect("movie exists");
    assert_eq!(details.rating, AggregateRating::Present(2.5));
    assert_eq!(
        ratings
            .ratings(&id, RecordType::Movie)
            .expect("ratings recorded")
            .len(),
        2
    );
}

#[tokio::test]
async fn rating_outage_is_not_masked_as_absent() {
    let metadata = InMemoryMetadataRepository::new();
    let id = movie_id("m1");
    metadata.put(MovieRecord::new(id.clone(), "A", "d", "x"));
    let ratings = InMemoryRatingRepository::new()
        .with_chaos(ChaosConfig::deterministic().with_failure_probability(1.0));
    let service = MovieService::new(metadata, ratings);

    let result = service.get_details(&id).await;

    assert!(matches!(result, Err(MovieError::Internal { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn service_serves_concurrent_requests() {
    let service = std::sync::Arc::new(MovieService::single_store(InMemoryMovieStore::new()));
    let id = movie_id("m1");
    service
        .metadata()
        .store()
        .put(&MovieWrite::new(MovieRecord::new(id.clone(), "A", "d", "x")))
        .await
        .expect("put succeeds");

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let service = std::sync::Arc::clone(&service);
            let id = id.clone();
            tokio::spawn(async move {
                service
                    .put_rating(&id, RecordType::Movie, user_rating(&format!("u{n}"), 4))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle
            .await
            .expect("task completes")
            .expect("rating accepted");
    }

    let details = service.get_details(&id).await.expect("movie exists");
    assert_eq!(details.rating, AggregateRating::Present(4.0));
    assert_eq!(service.metadata().store().rating_count(), 16);
}
