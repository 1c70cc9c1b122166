//! Walks one movie through its life against the in-memory store.
//!
//! Run with `RUST_LOG=debug cargo run -p moviecore --example movie_details`.

use moviecore::{
    InMemoryMovieStore, MovieError, MovieId, MovieRecord, MovieService, MovieStore, MovieWrite,
    RatingValue, RecordType, UserId, UserRating,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let service = MovieService::single_store(InMemoryMovieStore::new());
    let store = service.metadata().store();
    let id = MovieId::try_new("m1")?;

    store
        .put(&MovieWrite::new(MovieRecord::new(
            id.clone(),
            "Alien",
            "In space no one can hear you scream.",
            "Ridley Scott",
        )))
        .await?;
    println!("{}", serde_json::to_string_pretty(&service.get_details(&id).await?)?);

    service
        .put_rating(
            &id,
            RecordType::Movie,
            UserRating::new(UserId::try_new("u1")?, RatingValue::new(5)),
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&service.get_details(&id).await?)?);

    store.delete(&id).await?;
    match service.get_details(&id).await {
        Err(MovieError::NotFound { movie_id }) => println!("{movie_id} is gone"),
        other => println!("unexpected: {other:?}"),
    }

    Ok(())
}
