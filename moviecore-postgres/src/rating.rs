use moviecore_types::{
    Operation, Rating, RatingSource, RatingValue, RecordId, RecordType, SourceError, UserId,
    UserRating,
};
use sqlx::postgres::PgConnectOptions;
use sqlx::{query, PgPool, Row};
use tracing::{debug, info, instrument};

use crate::{connect, connect_with, map_sqlx_source_error, PostgresConfig, PostgresStoreError};

/// The rating subsystem: per-user ratings in the `ratings` table.
///
/// The aggregate is the arithmetic mean of every value recorded for a
/// `(record, type)` pair. Ratings reference `movies`, so a rating for an
/// unknown record is rejected with `SourceError::NotFound`.
#[derive(Debug, Clone)]
pub struct PostgresRatingRepository {
    pool: PgPool,
}

impl PostgresRatingRepository {
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

    /// All ratings of a record, ordered by user.
    ///
    /// Returns `Err(SourceError::NotFound)` when the record has none.
    #[instrument(name = "postgres.read_ratings", skip(self), fields(record_id = %record_id))]
    pub async fn ratings(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<Vec<Rating>, SourceError> {
        let rows = query(
            "SELECT user_id, value FROM ratings
             WHERE record_id = $1 AND record_type = $2
             ORDER BY user_id",
        )
        .bind(record_id.as_ref())
        .bind(record_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_source_error(error, Operation::ReadRatings))?;

        if rows.is_empty() {
            debug!("[postgres.read_ratings] record has no ratings");
            return Err(SourceError::NotFound);
        }

        let decode = |error| map_sqlx_source_error(error, Operation::DecodeRow);
        rows.iter()
            .map(|row| {
                let user_id: String = row.try_get("user_id").map_err(decode)?;
                let value: i32 = row.try_get("value").map_err(decode)?;
                let user_id = UserId::try_new(user_id)
                    .map_err(|error| SourceError::unavailable(Operation::DecodeRow, error))?;
                Ok(Rating::new(
                    record_id.clone(),
                    record_type,
                    user_id,
                    RatingValue::new(value),
                ))
            })
            .collect()
    }
}

impl RatingSource for PostgresRatingRepository {
    #[instrument(name = "postgres.get_aggregate_rating", skip(self), fields(record_id = %record_id))]
    async fn aggregate(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<f64, SourceError> {
        let mean: Option<f64> = query(
            "SELECT AVG(value)::DOUBLE PRECISION AS mean FROM ratings
             WHERE record_id = $1 AND record_type = $2",
        )
        .bind(record_id.as_ref())
        .bind(record_type.as_str())
        .fetch_one(&self.pool)
        .await
        .and_then(|row| row.try_get("mean"))
        .map_err(|error| map_sqlx_source_error(error, Operation::GetAggregateRating))?;

        mean.ok_or_else(|| {
            debug!("[postgres.get_aggregate_rating] record has no ratings");
            SourceError::NotFound
        })
    }

    #[instrument(name = "postgres.put_rating", skip(self, rating), fields(record_id = %record_id))]
    async fn put(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), SourceError> {
        let _ = query(
            "INSERT INTO ratings (record_id, record_type, user_id, value)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (record_id, record_type, user_id) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(record_id.as_ref())
        .bind(record_type.as_str())
        .bind(rating.user_id.as_ref())
        .bind(rating.value.into_inner())
        .execute(&self.pool)
        .await
        .map_err(|error| map_sqlx_source_error(error, Operation::PutRating))?;

        info!("[postgres.put_rating] rating stored");
        Ok(())
    }
}
