#![forbid(invalid_value, overflowing_literals, unconditional_recursion, unsafe_code)]
#![deny(
    bad_style,
    deprecated,
    non_ascii_idents,
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    rust_2018_idioms,
    unused_must_use
)]

//! Shared vocabulary types and traits for the MovieCore library.
//!
//! This crate provides the types shared between the `moviecore` facade and the
//! storage adapters (`moviecore-postgres`, `moviecore-memory`). Keeping them in a
//! separate crate lets adapters implement the seam traits without depending on
//! the controller.
//!
//! # Overview
//!
//! This crate contains:
//! - Seam traits: `MetadataSource`, `RatingSource`, `MovieStore`
//! - Domain types: `RecordId`, `UserId`, `RatingValue`, `RecordType`, `MovieRecord`,
//!   `Rating`, `UserRating`, `AggregateRating`, `MovieDetails`, `MovieWrite`, `Page`
//! - Errors: `StoreError`, `SourceError`, `MovieError`, `Operation`

mod errors;
mod model;
mod source;
mod store;
mod validation;

pub use errors::{MovieError, Operation, SourceError, StoreError};
pub use model::{
    AggregateRating, MovieDetails, MovieId, MovieRecord, MovieWrite, Rating, RatingValue,
    RecordId, RecordIdError, RecordType, UnknownRecordType, UserId, UserIdError, UserRating,
};
pub use source::{MetadataSource, RatingSource};
pub use store::{MovieStore, Page};
