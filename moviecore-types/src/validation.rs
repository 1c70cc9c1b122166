//! Shared validation predicates for domain types.

/// Validation predicate: reject control characters.
///
/// Identifiers end up in log fields and SQL parameters; control characters
/// (newlines, NUL) in them are always a caller bug.
pub(crate) fn no_control_characters(s: &str) -> bool {
    !s.chars().any(char::is_control)
}
