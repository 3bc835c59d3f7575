//! Shared types for the postcode search engine

/// Similarity score in `[0, 100]`
pub type Score = f64;

/// Canonical form of a postcode: uppercase, alphanumeric characters only.
///
/// Total function; an empty or fully non-alphanumeric input yields an
/// empty string.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
