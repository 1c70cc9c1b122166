//! PostgreSQL adapter for the MovieCore movie details library.
//!
//! - [`PostgresMovieStore`]: the transactional `MovieStore`
//! - [`PostgresMetadataRepository`] and [`PostgresRatingRepository`]: the
//!   metadata and rating subsystems as standalone `MetadataSource` /
//!   `RatingSource` implementations
//!
//! All three share the schema in `migrations/` and can share one pool.

mod config;
mod metadata;
mod movie_store;
mod rating;
mod transaction;

use moviecore_types::{Operation, SourceError, StoreError};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, error};

pub use config::{ConfigError, DatabaseSettings, MaxConnections, PostgresConfig};
pub use metadata::PostgresMetadataRepository;
pub use movie_store::PostgresMovieStore;
pub use rating::PostgresRatingRepository;

/// SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Failures setting up or maintaining the PostgreSQL backend itself, as
/// opposed to failures of individual store operations.
#[derive(Debug, Error)]
pub enum PostgresStoreError {
    /// The pool could not open its first connection.
    #[error("failed to create postgres connection pool")]
    ConnectionFailed(#[source] sqlx::Error),

    /// `SELECT 1` did not succeed.
    #[error("postgres health check failed")]
    PingFailed(#[source] sqlx::Error),

    /// Applying the embedded migrations failed.
    #[error("postgres migration failed")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),
}

fn pool_options(config: &PostgresConfig) -> PgPoolOptions {
    let max_connections: std::num::NonZeroU32 = config.max_connections.into();
    PgPoolOptions::new()
        .max_connections(max_connections.get())
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
}

async fn connect(
    connection_string: &str,
    config: &PostgresConfig,
) -> Result<PgPool, PostgresStoreError> {
    pool_options(config)
        .connect(connection_string)
        .await
        .map_err(PostgresStoreError::ConnectionFailed)
}

async fn connect_with(
    options: PgConnectOptions,
    config: &PostgresConfig,
) -> Result<PgPool, PostgresStoreError> {
    pool_options(config)
        .connect_with(options)
        .await
        .map_err(PostgresStoreError::ConnectionFailed)
}

fn map_sqlx_error(error: sqlx::Error, operation: Operation) -> StoreError {
    error!(
        error = %error,
        operation = %operation,
        "[postgres.database_error] database operation failed"
    );
    StoreError::StoreFailure { operation }
}

fn map_sqlx_source_error(error: sqlx::Error, operation: Operation) -> SourceError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            debug!(
                error = %db_error,
                "[postgres.foreign_key] referenced record does not exist"
            );
            return SourceError::NotFound;
        }
    }

    error!(
        error = %error,
        operation = %operation,
        "[postgres.database_error] database operation failed"
    );
    SourceError::unavailable(operation, error)
}

fn decode_error(error: impl std::fmt::Display) -> StoreError {
    error!(
        error = %error,
        "[postgres.decode_row] stored row does not satisfy domain validation"
    );
    StoreError::StoreFailure {
        operation: Operation::DecodeRow,
    }
}
