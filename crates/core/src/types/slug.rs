//! URL-safe slug type for category addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The input string is empty.
    #[error("slug cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9_-]`.
    #[error("slug may only contain letters, numbers, underscores or hyphens (found {0:?})")]
    InvalidChar(char),
}

/// A URL-safe identifier.
///
/// ## Constraints
///
/// - Length: 1-50 characters
/// - ASCII letters, digits, `_` and `-` only
///
/// ## Examples
///
/// ```
/// use tshop_core::Slug;
///
/// assert!(Slug::parse("wood-stains").is_ok());
/// assert!(Slug::parse("wood stains").is_err());
/// assert_eq!(Slug::from_name("Wood Stains & Oils").unwrap().as_str(), "wood-stains-oils");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Maximum length of a slug.
    pub const MAX_LENGTH: usize = 50;

    /// Parse a `Slug` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or contains
    /// characters that are not URL-safe.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(SlugError::InvalidChar(c));
        }

        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a display name.
    ///
    /// ASCII letters and digits are lowercased and kept; every run of other
    /// characters becomes a single hyphen. Leading and trailing hyphens are
    /// removed and the result is cut to [`Self::MAX_LENGTH`].
    ///
    /// # Errors
    ///
    /// Returns `SlugError::Empty` if the name has no ASCII letters or digits.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(name.len());
        let mut pending_hyphen = false;

        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_hyphen = true;
            }
        }

        slug.truncate(Self::MAX_LENGTH);
        let trimmed = slug.trim_end_matches('-');
        Self::parse(trimmed)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(Slug::parse("enamels").is_ok());
        assert!(Slug::parse("primer_2").is_ok());
        assert!(Slug::parse("A-Z").is_ok());
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("a/b"), Err(SlugError::InvalidChar('/')));
        assert!(matches!(
            Slug::parse(&"a".repeat(51)),
            Err(SlugError::TooLong { .. })
        ));
    }

    #[test]
    fn test_from_name_collapses_separators() {
        assert_eq!(
            Slug::from_name("  Floor -- Lacquers!  ").unwrap().as_str(),
            "floor-lacquers"
        );
    }

    #[test]
    fn test_from_name_without_ascii() {
        assert_eq!(Slug::from_name("Лаки"), Err(SlugError::Empty));
    }

    #[test]
    fn test_from_name_truncates() {
        let slug = Slug::from_name(&"ab ".repeat(40)).unwrap();
        assert!(slug.as_str().len() <= Slug::MAX_LENGTH);
        assert!(!slug.as_str().ends_with('-'));
    }
}
