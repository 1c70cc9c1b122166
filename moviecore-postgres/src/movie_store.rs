use moviecore_types::{
    AggregateRating, MovieDetails, MovieId, MovieRecord, MovieStore, MovieWrite, Operation, Page,
    Rating, RatingValue, RecordId, RecordType, StoreError, UserId, UserRating,
};
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{query, PgConnection, PgPool, Row};
use tracing::{debug, info, instrument};

use crate::transaction::ScopedTransaction;
use crate::{connect, connect_with, decode_error, map_sqlx_error, PostgresConfig, PostgresStoreError};

const SELECT_DETAILS: &str = r#"
    SELECT m.id, m.title, m.description, m.director,
           AVG(r.value)::DOUBLE PRECISION AS rating
    FROM movies m
    LEFT JOIN ratings r ON r.record_id = m.id AND r.record_type = 'movie'
"#;

/// `MovieStore` backed by PostgreSQL.
///
/// Every multi-statement operation runs in one transaction. Ratings are
/// guarded by a foreign key to `movies`, and writers lock the movie row
/// (`FOR SHARE` to add a rating, `FOR UPDATE` to delete) so a rating can never
/// be committed against a movie that is being deleted.
#[derive(Debug, Clone)]
pub struct PostgresMovieStore {
    pool: PgPool,
}

impl PostgresMovieStore {
    /// Create a new PostgresMovieStore with default configuration.
    pub async fn new<S: Into<String>>(connection_string: S) -> Result<Self, PostgresStoreError> {
        Self::with_config(connection_string, PostgresConfig::default()).await
    }

    /// Create a new PostgresMovieStore with custom configuration.
    pub async fn with_config<S: Into<String>>(
        connection_string: S,
        config: PostgresConfig,
    ) -> Result<Self, PostgresStoreError> {
        let pool = connect(&connection_string.into(), &config).await?;
        Ok(Self { pool })
    }

    /// Create a new PostgresMovieStore from structured connect options.
    ///
    /// Prefer this over a URL when credentials may contain characters that
    /// are reserved in URLs; see [`DatabaseSettings::connect_options`].
    ///
    /// [`DatabaseSettings::connect_options`]: crate::DatabaseSettings::connect_options
    pub async fn connect_with(
        options: PgConnectOptions,
        config: PostgresConfig,
    ) -> Result<Self, PostgresStoreError> {
        let pool = connect_with(options, &config).await?;
        Ok(Self { pool })
    }

    /// Create a PostgresMovieStore from an existing connection pool.
    ///
    /// Use this to share one pool with the metadata and rating repositories.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for sharing with the standalone repositories.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check that the database answers a trivial query.
    pub async fn ping(&self) -> Result<(), PostgresStoreError> {
        let _ = query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(PostgresStoreError::PingFailed)?;
        Ok(())
    }

    /// Apply the embedded schema migrations. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<(), PostgresStoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(PostgresStoreError::MigrationFailed)
    }
}

fn details_from_row(row: &PgRow) -> Result<MovieDetails, StoreError> {
    let decode = |error| map_sqlx_error(error, Operation::DecodeRow);

    let id: String = row.try_get("id").map_err(decode)?;
    let title: String = row.try_get("title").map_err(decode)?;
    let description: String = row.try_get("description").map_err(decode)?;
    let director: String = row.try_get("director").map_err(decode)?;
    let rating: Option<f64> = row.try_get("rating").map_err(decode)?;

    let id = MovieId::try_new(id).map_err(decode_error)?;
    Ok(MovieDetails::new(
        MovieRecord::new(id, title, description, director),
        AggregateRating::from(rating),
    ))
}

fn page_bound(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

async fn upsert_rating(
    conn: &mut PgConnection,
    record_id: &RecordId,
    record_type: RecordType,
    rating: &UserRating,
) -> Result<(), StoreError> {
    let _ = query(
        "INSERT INTO ratings (record_id, record_type, user_id, value)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (record_id, record_type, user_id) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(record_id.as_ref())
    .bind(record_type.as_str())
    .bind(rating.user_id.as_ref())
    .bind(rating.value.into_inner())
    .execute(conn)
    .await
    .map_err(|error| map_sqlx_error(error, Operation::UpsertRating))?;
    Ok(())
}

async fn lock_movie(
    conn: &mut PgConnection,
    id: &MovieId,
    lock: &str,
) -> Result<bool, StoreError> {
    let row = query(&format!("SELECT 1 FROM movies WHERE id = $1 {lock}"))
        .bind(id.as_ref())
        .fetch_optional(conn)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::LockMovie))?;
    Ok(row.is_some())
}

impl MovieStore for PostgresMovieStore {
    #[instrument(name = "postgres.get_movie", skip(self), fields(movie_id = %id))]
    async fn get(&self, id: &MovieId) -> Result<MovieDetails, StoreError> {
        let row = query(&format!("{SELECT_DETAILS} WHERE m.id = $1 GROUP BY m.id"))
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::GetMovie))?;

        match row {
            Some(row) => details_from_row(&row),
            None => {
                debug!("[postgres.get_movie] movie not found");
                Err(StoreError::NotFound {
                    movie_id: id.clone(),
                })
            }
        }
    }

    #[instrument(name = "postgres.put_movie", skip(self, movie), fields(movie_id = %movie.id()))]
    async fn put(&self, movie: &MovieWrite) -> Result<(), StoreError> {
        let mut tx = ScopedTransaction::begin(&self.pool, Operation::InsertMovie).await?;

        let inserted = query(
            "INSERT INTO movies (id, title, description, director)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(movie.id().as_ref())
        .bind(&movie.record.title)
        .bind(&movie.record.description)
        .bind(&movie.record.director)
        .execute(tx.conn())
        .await
        .map_err(|error| map_sqlx_error(error, Operation::InsertMovie))?
        .rows_affected();

        if inserted == 0 {
            debug!("[postgres.put_movie] movie already exists, row left untouched");
        }

        if let Some(rating) = &movie.rating {
            upsert_rating(tx.conn(), movie.id(), RecordType::Movie, rating).await?;
        }

        tx.commit().await?;
        info!("[postgres.put_movie] movie stored");
        Ok(())
    }

    #[instrument(name = "postgres.update_movie", skip(self, movie), fields(movie_id = %movie.id()))]
    async fn update(&self, movie: &MovieWrite) -> Result<(), StoreError> {
        let mut tx = ScopedTransaction::begin(&self.pool, Operation::UpdateMovie).await?;

        let updated = query(
            "UPDATE movies SET title = $2, description = $3, director = $4 WHERE id = $1",
        )
        .bind(movie.id().as_ref())
        .bind(&movie.record.title)
        .bind(&movie.record.description)
        .bind(&movie.record.director)
        .execute(tx.conn())
        .await
        .map_err(|error| map_sqlx_error(error, Operation::UpdateMovie))?
        .rows_affected();

        if updated == 0 {
            debug!("[postgres.update_movie] movie not found, nothing updated");
            return Err(StoreError::NotFound {
                movie_id: movie.id().clone(),
            });
        }

        if let Some(rating) = &movie.rating {
            let _ = query(
                "UPDATE ratings SET value = $4
                 WHERE record_id = $1 AND record_type = $2 AND user_id = $3",
            )
            .bind(movie.id().as_ref())
            .bind(RecordType::Movie.as_str())
            .bind(rating.user_id.as_ref())
            .bind(rating.value.into_inner())
            .execute(tx.conn())
            .await
            .map_err(|error| map_sqlx_error(error, Operation::UpdateRating))?;
        }

        tx.commit().await?;
        info!("[postgres.update_movie] movie updated");
        Ok(())
    }

    #[instrument(name = "postgres.delete_movie", skip(self), fields(movie_id = %id))]
    async fn delete(&self, id: &MovieId) -> Result<(), StoreError> {
        let mut tx = ScopedTransaction::begin(&self.pool, Operation::DeleteMovie).await?;

        if !lock_movie(tx.conn(), id, "FOR UPDATE").await? {
            debug!("[postgres.delete_movie] movie not found, nothing deleted");
            return Err(StoreError::NotFound {
                movie_id: id.clone(),
            });
        }

        let removed_ratings = query("DELETE FROM ratings WHERE record_id = $1 AND record_type = $2")
            .bind(id.as_ref())
            .bind(RecordType::Movie.as_str())
            .execute(tx.conn())
            .await
            .map_err(|error| map_sqlx_error(error, Operation::DeleteRatings))?
            .rows_affected();

        let _ = query("DELETE FROM movies WHERE id = $1")
            .bind(id.as_ref())
            .execute(tx.conn())
            .await
            .map_err(|error| map_sqlx_error(error, Operation::DeleteMovie))?;

        tx.commit().await?;
        info!(
            removed_ratings,
            "[postgres.delete_movie] movie and its ratings deleted"
        );
        Ok(())
    }

    #[instrument(name = "postgres.list_movies", skip(self))]
    async fn list(&self, skip: i64, take: i64) -> Result<Vec<MovieDetails>, StoreError> {
        let page = Page::try_new(skip, take)?;
        if page.take() == 0 {
            return Ok(Vec::new());
        }

        let rows = query(&format!(
            "{SELECT_DETAILS} GROUP BY m.id ORDER BY m.id LIMIT $1 OFFSET $2"
        ))
        .bind(page_bound(page.take()))
        .bind(page_bound(page.skip()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::ListMovies))?;

        rows.iter().map(details_from_row).collect()
    }

    #[instrument(name = "postgres.put_rating", skip(self, rating), fields(record_id = %record_id))]
    async fn put_rating(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
        rating: UserRating,
    ) -> Result<(), StoreError> {
        let mut tx = ScopedTransaction::begin(&self.pool, Operation::UpsertRating).await?;

        if !lock_movie(tx.conn(), record_id, "FOR SHARE").await? {
            debug!("[postgres.put_rating] owning movie not found, rating rejected");
            return Err(StoreError::NotFound {
                movie_id: record_id.clone(),
            });
        }

        upsert_rating(tx.conn(), record_id, record_type, &rating).await?;

        tx.commit().await?;
        info!("[postgres.put_rating] rating stored");
        Ok(())
    }

    #[instrument(name = "postgres.read_ratings", skip(self), fields(record_id = %record_id))]
    async fn ratings(
        &self,
        record_id: &RecordId,
        record_type: RecordType,
    ) -> Result<Vec<Rating>, StoreError> {
        let rows = query(
            "SELECT user_id, value FROM ratings
             WHERE record_id = $1 AND record_type = $2
             ORDER BY user_id",
        )
        .bind(record_id.as_ref())
        .bind(record_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::ReadRatings))?;

        rows.iter()
            .map(|row| {
                let user_id: String = row
                    .try_get("user_id")
                    .map_err(|error| map_sqlx_error(error, Operation::DecodeRow))?;
                let value: i32 = row
                    .try_get("value")
                    .map_err(|error| map_sqlx_error(error, Operation::DecodeRow))?;
                Ok(Rating::new(
                    record_id.clone(),
                    record_type,
                    UserId::try_new(user_id).map_err(decode_error)?,
                    RatingValue::new(value),
                ))
            })
            .collect()
    }
}
