use moviecore_types::{MetadataSource, MovieId, MovieRecord, Operation, SourceError};
use sqlx::postgres::PgConnectOptions;
use sqlx::{query, PgPool, Row};
use tracing::{debug, info, instrument};

use crate::{connect, connect_with, map_sqlx_source_error, PostgresConfig, PostgresStoreError};

/// The metadata subsystem: movie records in the `movies` table.
#[derive(Debug, Clone)]
pub struct PostgresMetadataRepository {
    pool: PgPool,
}

impl PostgresMetadataRepository {
    /// Connect with the default pool configuration.
    pub async fn new<S: Into<String>>(connection_string: S) -> Result<Self, PostgresStoreError> {
        Self::with_config(connection_string, PostgresConfig::default()).await
    }

    /// Connect with a custom pool configuration.
    pub async fn with_config<S: Into<String>>(
        connection_string: S,
        config: PostgresConfig,
    ) -> Result<Self, PostgresStoreError> {
        let pool = connect(&connection_string.into(), &config).await?;
        Ok(Self { pool })
    }

    /// Connect from structured connect options.
    pub async fn connect_with(
        options: PgConnectOptions,
        config: PostgresConfig,
    ) -> Result<Self, PostgresStoreError> {
        let pool = connect_with(options, &config).await?;
        Ok(Self { pool })
    }

    /// Reuse an existing pool, typically [`PostgresMovieStore::pool`](crate::PostgresMovieStore::pool).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or replace a movie record.
    #[instrument(name = "postgres.put_metadata", skip(self, record), fields(movie_id = %record.id))]
    pub async fn put(&self, record: &MovieRecord) -> Result<(), SourceError> {
        let _ = query(
            "INSERT INTO movies (id, title, description, director)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE
             SET title = EXCLUDED.title,
                 description = EXCLUDED.description,
                 director = EXCLUDED.director",
        )
        .bind(record.id.as_ref())
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.director)
        .execute(&self.pool)
        .await
        .map_err(|error| map_sqlx_source_error(error, Operation::PutMetadata))?;

        info!("[postgres.put_metadata] metadata stored");
        Ok(())
    }
}

impl MetadataSource for PostgresMetadataRepository {
    #[instrument(name = "postgres.get_metadata", skip(self), fields(movie_id = %id))]
    async fn get(&self, id: &MovieId) -> Result<MovieRecord, SourceError> {
        let row = query("SELECT title, description, director FROM movies WHERE id = $1")
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_sqlx_source_error(error, Operation::GetMetadata))?;

        let Some(row) = row else {
            debug!("[postgres.get_metadata] metadata not found");
            return Err(SourceError::NotFound);
        };

        let decode = |error| map_sqlx_source_error(error, Operation::DecodeRow);
        Ok(MovieRecord::new(
            id.clone(),
            row.try_get::<String, _>("title").map_err(decode)?,
            row.try_get::<String, _>("description").map_err(decode)?,
            row.try_get::<String, _>("director").map_err(decode)?,
        ))
    }
}
