//! Serves movie details from PostgreSQL.
//!
//! Connection settings come from `DB_HOST`, `DB_PORT`, `DB_USER`,
//! `DB_PASSWORD` and `DB_NAME`. Pass a movie id as the first argument.

use moviecore::{MovieId, MovieService};
use moviecore_postgres::{
    DatabaseSettings, PostgresConfig, PostgresMetadataRepository, PostgresMovieStore,
    PostgresRatingRepository,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = DatabaseSettings::from_env()?;
    tracing::info!(?settings, "connecting");

    let store =
        PostgresMovieStore::connect_with(settings.connect_options(), PostgresConfig::default())
            .await?;
    store.migrate().await?;

    let service = MovieService::new(
        PostgresMetadataRepository::from_pool(store.pool().clone()),
        PostgresRatingRepository::from_pool(store.pool().clone()),
    );

    let id = MovieId::try_new(std::env::args().nth(1).unwrap_or_else(|| "m1".to_string()))?;
    let details = service.get_details(&id).await?;
    println!("{}", serde_json::to_string_pretty(&details)?);

    Ok(())
}
