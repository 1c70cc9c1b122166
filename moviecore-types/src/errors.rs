use crate::model::MovieId;
use std::fmt;

/// Identifies the operation that encountered an infrastructure failure.
///
/// Used by [`StoreError::StoreFailure`] and [`SourceError::Unavailable`] so
/// failures carry strongly-typed context instead of formatted strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Reading a single movie with its aggregate rating.
    GetMovie,
    /// Reading a page of movies.
    ListMovies,
    /// Inserting a movie row.
    InsertMovie,
    /// Updating a movie row.
    UpdateMovie,
    /// Deleting a movie row.
    DeleteMovie,
    /// Checking that a movie exists before attaching a rating to it.
    LockMovie,
    /// Inserting or replacing a rating row.
    UpsertRating,
    /// Updating an existing rating row.
    UpdateRating,
    /// Deleting the rating rows of a record.
    DeleteRatings,
    /// Reading the rating rows of a record.
    ReadRatings,
    /// Converting a stored row into a domain value.
    DecodeRow,
    /// Beginning a database transaction.
    BeginTransaction,
    /// Committing a database transaction.
    CommitTransaction,
    /// Fetching metadata from the metadata subsystem.
    GetMetadata,
    /// Writing metadata to the metadata subsystem.
    PutMetadata,
    /// Fetching an aggregate rating from the rating subsystem.
    GetAggregateRating,
    /// Submitting a rating to the rating subsystem.
    PutRating,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetMovie => "get_movie",
            Self::ListMovies => "list_movies",
            Self::InsertMovie => "insert_movie",
            Self::UpdateMovie => "update_movie",
            Self::DeleteMovie => "delete_movie",
            Self::LockMovie => "lock_movie",
            Self::UpsertRating => "upsert_rating",
            Self::UpdateRating => "update_rating",
            Self::DeleteRatings => "delete_ratings",
            Self::ReadRatings => "read_ratings",
            Self::DecodeRow => "decode_row",
            Self::BeginTransaction => "begin_transaction",
            Self::CommitTransaction => "commit_transaction",
            Self::GetMetadata => "get_metadata",
            Self::PutMetadata => "put_metadata",
            Self::GetAggregateRating => "get_aggregate_rating",
            Self::PutRating => "put_rating",
        };
        f.write_str(name)
    }
}

/// Error type returned by `MovieStore` operations.
///
/// `NotFound` is an expected outcome and is never logged as a fault.
/// Everything else means the operation rolled back without committing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The movie does not exist.
    #[error("movie {movie_id} not found")]
    NotFound { movie_id: MovieId },

    /// Returned when a caller passes a negative offset or limit to `list`.
    #[error("invalid page: skip={skip}, take={take}")]
    InvalidPage { skip: i64, take: i64 },

    /// Represents infrastructure failures surfaced by the backing store (e.g., connection drops).
    #[error("{operation} operation failed")]
    StoreFailure { operation: Operation },
}

impl StoreError {
    /// Whether the targeted movie does not exist.
    /// Whether the requested movie does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Error type returned by the external metadata and rating collaborators.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The collaborator has nothing for the requested record.
    ///
    /// For a rating source this means "no ratings yet".
    #[error("record not found")]
    NotFound,

    /// The collaborator failed (timeout, transport fault, storage fault).
    #[error("{operation} operation failed: {detail}")]
    Unavailable { operation: Operation, detail: String },
}

impl SourceError {
    pub fn unavailable(operation: Operation, detail: impl fmt::Display) -> Self {
        Self::Unavailable {
            operation,
            detail: detail.to_string(),
        }
    }
}

/// Error type surfaced to the transport layer.
///
/// The two-kind taxonomy every repository and collaborator failure is
/// re-classified into: absence of the movie, or an internal fault with a
/// diagnostic message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MovieError {
    /// The movie does not exist.
    #[error("movie {movie_id} not found")]
    NotFound { movie_id: MovieId },

    /// Infrastructure, storage or collaborator fault.
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl MovieError {
    pub fn internal(detail: impl fmt::Display) -> Self {
        Self::Internal {
            detail: detail.to_string(),
        }
    }

    /// Whether the requested movie does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for MovieError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { movie_id } => Self::NotFound { movie_id },
            other => Self::internal(other),
        }
    }
}
