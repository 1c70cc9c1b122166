use crate::validation::no_control_characters;
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record identifier domain type.
///
/// RecordId identifies a rated record (together with [`RecordType`]) and, for
/// movies, the movie itself. Uses nutype for construction-time validation
/// ensuring all identifiers are:
/// - Non-empty (trimmed strings with at least 1 character)
/// - Within reasonable length (max 255 characters)
/// - Sanitized (leading/trailing whitespace removed)
/// - Free of control characters
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255, predicate = no_control_characters),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct RecordId(String);

/// Movies are records of type [`RecordType::Movie`]; their identifier is the record id.
pub type MovieId = RecordId;

/// User identifier domain type, validated like [`RecordId`].
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255, predicate = no_control_characters),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct UserId(String);

/// Value of an individual rating. A small signed integer; range policy belongs
/// to the rating subsystem.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Serialize,
    Deserialize,
    From,
    Into
))]
pub struct RatingValue(i32);

/// Kind of entity a rating targets.
///
/// Ratings are stored per `(record id, record type)`, so a new variant needs
/// no change to the rating tables themselves. Backends that enforce
/// referential integrity only do so for [`RecordType::Movie`], whose record
/// id must name an existing movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// A movie record.
    Movie,
}

impl RecordType {
    /// Wire and storage representation of the record type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a record type string does not name a known [`RecordType`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown record type `{0}`")]
pub struct UnknownRecordType(pub String);

impl FromStr for RecordType {
    type Err = UnknownRecordType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            other => Err(UnknownRecordType(other.to_string())),
        }
    }
}

/// Descriptive movie metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Unique, immutable identifier.
    pub id: MovieId,
    /// Movie title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Director, free text.
    pub director: String,
}

impl MovieRecord {
    pub fn new(
        id: MovieId,
        title: impl Into<String>,
        description: impl Into<String>,
        director: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            director: director.into(),
        }
    }
}

/// A single user's rating of a record.
///
/// `(record_id, record_type, user_id)` is the rating key; a second rating by
/// the same user for the same record replaces the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub record_id: RecordId,
    pub record_type: RecordType,
    pub user_id: UserId,
    pub value: RatingValue,
}

impl Rating {
    pub const fn new(
        record_id: RecordId,
        record_type: RecordType,
        user_id: UserId,
        value: RatingValue,
    ) -> Self {
        Self {
            record_id,
            record_type,
            user_id,
            value,
        }
    }
}

/// The user-scoped half of a [`Rating`], as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRating {
    pub user_id: UserId,
    pub value: RatingValue,
}

impl UserRating {
    pub const fn new(user_id: UserId, value: RatingValue) -> Self {
        Self { user_id, value }
    }
}

/// Aggregate rating of a record.
///
/// `Absent` means no rating exists yet. It is never represented as zero:
/// `Present(0.0)` is a legitimate average of real ratings.
///
/// Serializes as `null` or a number.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum AggregateRating {
    /// No rating rows exist for the record.
    #[default]
    Absent,
    /// Mean of at least one rating value.
    Present(f64),
}

impl AggregateRating {
    /// Arithmetic mean of `values`, or `Absent` when there are none.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = RatingValue>,
    {
        let mut count = 0.0_f64;
        let mut mean = 0.0_f64;
        for value in values {
            count += 1.0;
            mean += (f64::from(value.into_inner()) - mean) / count;
        }

        if count > 0.0 {
            Self::Present(mean)
        } else {
            Self::Absent
        }
    }

    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Absent => None,
            Self::Present(value) => Some(value),
        }
    }

    pub const fn is_present(self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl From<Option<f64>> for AggregateRating {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

impl From<AggregateRating> for Option<f64> {
    fn from(rating: AggregateRating) -> Self {
        rating.value()
    }
}

/// Read-side composite of movie metadata and its aggregate rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub rating: AggregateRating,
    pub metadata: MovieRecord,
}

impl MovieDetails {
    pub const fn new(metadata: MovieRecord, rating: AggregateRating) -> Self {
        Self { rating, metadata }
    }

    pub const fn id(&self) -> &MovieId {
        &self.metadata.id
    }
}

/// Write payload for `MovieStore::put` and `MovieStore::update`.
///
/// The optional rating is the submitting user's rating of the movie; it is
/// always stored with [`RecordType::Movie`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieWrite {
    pub record: MovieRecord,
    pub rating: Option<UserRating>,
}

impl MovieWrite {
    pub const fn new(record: MovieRecord) -> Self {
        Self {
            record,
            rating: None,
        }
    }

    #[must_use]
    pub fn with_rating(mut self, rating: UserRating) -> Self {
        self.rating = Some(rating);
        self
    }

    pub const fn id(&self) -> &MovieId {
        &self.record.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie_id(raw: &str) -> MovieId {
        MovieId::try_new(raw).expect("valid movie id")
    }

    #[test]
    fn record_ids_are_trimmed() {
        assert_eq!(movie_id("  m1  ").as_ref(), "m1");
    }

    #[test]
    fn empty_record_ids_are_rejected() {
        assert!(RecordId::try_new("").is_err());
        assert!(RecordId::try_new("   ").is_err());
        assert!(UserId::try_new("").is_err());
    }

    #[test]
    fn overlong_record_ids_are_rejected() {
        assert!(RecordId::try_new("x".repeat(256)).is_err());
        assert!(RecordId::try_new("x".repeat(255)).is_ok());
    }

    #[test]
    fn record_type_round_trips_through_its_wire_name() {
        assert_eq!(RecordType::Movie.as_str(), "movie");
        assert_eq!("movie".parse::<RecordType>(), Ok(RecordType::Movie));
        assert_eq!(
            "series".parse::<RecordType>(),
            Err(UnknownRecordType("series".to_string()))
        );
    }

    #[test]
    fn aggregate_of_no_values_is_absent_not_zero() {
        let rating = AggregateRating::from_values(Vec::new());

        assert_eq!(rating, AggregateRating::Absent);
        assert_eq!(rating.value(), None);
        assert!(!rating.is_present());
    }

    #[test]
    fn aggregate_of_zero_values_is_present_zero() {
        let rating = AggregateRating::from_values([RatingValue::new(0), RatingValue::new(0)]);

        assert_eq!(rating, AggregateRating::Present(0.0));
    }

    #[test]
    fn aggregate_is_the_arithmetic_mean() {
        let rating = AggregateRating::from_values(
            [1, 2, 3, 4].into_iter().map(RatingValue::new),
        );

        assert_eq!(rating, AggregateRating::Present(2.5));
    }

    #[test]
    fn aggregate_handles_negative_values() {
        let rating = AggregateRating::from_values([RatingValue::new(-3), RatingValue::new(5)]);

        assert_eq!(rating, AggregateRating::Present(1.0));
    }

    #[test]
    fn movie_details_serialize_with_null_rating_when_absent() {
        let details = MovieDetails::new(
            MovieRecord::new(movie_id("m1"), "A", "d", "x"),
            AggregateRating::Absent,
        );

        let json = serde_json::to_value(&details).expect("details serialize");

        assert_eq!(
            json,
            serde_json::json!({
                "rating": null,
                "metadata": {"id": "m1", "title": "A", "description": "d", "director": "x"}
            })
        );
    }

    #[test]
    fn movie_details_deserialize_present_rating() {
        let details: MovieDetails = serde_json::from_value(serde_json::json!({
            "rating": 4.5,
            "metadata": {"id": "m1", "title": "A", "description": "d", "director": "x"}
        }))
        .expect("details deserialize");

        assert_eq!(details.rating, AggregateRating::Present(4.5));
        assert_eq!(details.id(), &movie_id("m1"));
    }

    #[test]
    fn movie_write_carries_optional_rating() {
        let record = MovieRecord::new(movie_id("m1"), "A", "d", "x");
        let rating = UserRating::new(
            UserId::try_new("u1").expect("valid user id"),
            RatingValue::new(5),
        );

        let write = MovieWrite::new(record.clone()).with_rating(rating.clone());

        assert_eq!(write.id(), &record.id);
        assert_eq!(write.rating, Some(rating));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn aggregate_stays_within_value_bounds(values in proptest::collection::vec(-100_i32..=100, 1..50)) {
                let min = f64::from(*values.iter().min().expect("non-empty"));
                let max = f64::from(*values.iter().max().expect("non-empty"));

                let rating = AggregateRating::from_values(values.into_iter().map(RatingValue::new));
                let mean = rating.value().expect("non-empty input yields a rating");

                prop_assert!(mean >= min - 1e-9);
                prop_assert!(mean <= max + 1e-9);
            }
        }
    }
}
