//! `MovieCore` - movie details aggregation
//!
//! [`MovieService`] answers "what do we know about this movie" by combining
//! the metadata subsystem's record with the rating subsystem's aggregate, and
//! forwards rating submissions to the rating subsystem.
//!
//! Two deployment shapes are supported:
//!
//! - Two sources: any [`MetadataSource`] plus any [`RatingSource`], via
//!   [`MovieService::new`].
//! - One store: a single [`MovieStore`] that owns both movies and ratings, via
//!   [`MovieService::single_store`]. Deleting a movie there removes its
//!   ratings in the same unit of work.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod service;
mod single_store;

pub use service::MovieService;
pub use single_store::StoreBackedSources;

pub use moviecore_memory::{InMemoryMetadataRepository, InMemoryMovieStore, InMemoryRatingRepository};
pub use moviecore_types::{
    AggregateRating, MetadataSource, MovieDetails, MovieError, MovieId, MovieRecord, MovieStore,
    MovieWrite, Operation, Page, Rating, RatingSource, RatingValue, RecordId, RecordIdError,
    RecordType, SourceError, StoreError, UnknownRecordType, UserId, UserIdError, UserRating,
};
