//! Sequence numbers of the form `{PREFIX}-{YEAR}-{SEQ}`.
//!
//! Used for inventory asset tags (`LAP-2026-001`) and assignment batch
//! numbers (`ASN-2026-001`).

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::error::AppError;

pub const ASSIGNMENT_PREFIX: &str = "ASN";
pub const SEQUENCE_WIDTH: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("sequence {prefix}-{year} is exhausted")]
    Exhausted { prefix: String, year: i32 },

    #[error("invalid tag pattern: {0}")]
    Pattern(String),
}

impl From<TagError> for AppError {
    fn from(err: TagError) -> Self {
        match err {
            TagError::Exhausted { .. } => AppError::Conflict(err.to_string()),
            TagError::Pattern(msg) => AppError::Internal(msg),
        }
    }
}

/// Any well-formed tag; the sequence digits are ASCII only.
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]+)-([0-9]{4})-([0-9]{3})$").expect("valid tag pattern"));

#[derive(Debug, Clone)]
pub struct TagSequence {
    prefix: String,
    year: i32,
    matcher: Regex,
}

impl TagSequence {
    pub fn new(prefix: impl Into<String>, year: i32) -> Result<Self, TagError> {
        let prefix = prefix.into();
        let pattern = format!(
            r"^{}-{}-([0-9]{{{}}})$",
            regex::escape(&prefix),
            year,
            SEQUENCE_WIDTH
        );
        let matcher = Regex::new(&pattern).map_err(|e| TagError::Pattern(e.to_string()))?;
        Ok(Self {
            prefix,
            year,
            matcher,
        })
    }

    /// SQL `LIKE` pattern selecting candidate tags for this prefix and year.
    pub fn like_pattern(&self) -> String {
        format!("{}-{}-%", self.prefix, self.year)
    }

    pub fn format(&self, seq: u32) -> String {
        format!("{}-{}-{:0width$}", self.prefix, self.year, seq, width = SEQUENCE_WIDTH)
    }

    /// Highest well-formed sequence in `existing`, 0 when there is none.
    /// Malformed tags are ignored.
    pub fn max<I, S>(&self, existing: I) -> u32
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        existing
            .into_iter()
            .filter_map(|tag| {
                self.matcher
                    .captures(tag.as_ref())
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse::<u32>().ok())
            })
            .max()
            .unwrap_or(0)
    }

    /// Next tag after the highest well-formed sequence in `existing`.
    /// Gaps are not refilled.
    pub fn next<I, S>(&self, existing: I) -> Result<String, TagError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next = self.max(existing) + 1;
        if next >= 10u32.pow(SEQUENCE_WIDTH as u32) {
            return Err(TagError::Exhausted {
                prefix: self.prefix.clone(),
                year: self.year,
            });
        }
        Ok(self.format(next))
    }
}

/// Year and sequence of `tag` when it is `{prefix}-{YYYY}-{SEQ}`.
pub fn parse_tag(prefix: &str, tag: &str) -> Option<(i32, u32)> {
    let caps = TAG_PATTERN.captures(tag)?;
    if &caps[1] != prefix {
        return None;
    }
    Some((caps[2].parse().ok()?, caps[3].parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_is_max_plus_one() {
        let seq = TagSequence::new("LAP", 2025).unwrap();
        let next = seq.next(["LAP-2025-001", "LAP-2025-003"]).unwrap();
        assert_eq!(next, "LAP-2025-004");
    }

    #[test]
    fn test_first_tag_of_year() {
        let seq = TagSequence::new("MON", 2026).unwrap();
        assert_eq!(seq.next(Vec::<String>::new()).unwrap(), "MON-2026-001");
    }

    #[test]
    fn test_ignores_malformed_and_foreign_tags() {
        let seq = TagSequence::new("DES", 2026).unwrap();
        let existing = [
            "DES-2026-002",
            "DES-2026-0099",
            "DES-2026-9x9",
            "DES-2025-050",
            "LAP-2026-070",
            "xDES-2026-040",
        ];
        assert_eq!(seq.next(existing).unwrap(), "DES-2026-003");
    }

    #[test]
    fn test_exhausted_sequence() {
        let seq = TagSequence::new("LAP", 2026).unwrap();
        let err = seq.next(["LAP-2026-999"]).unwrap_err();
        assert_eq!(
            err,
            TagError::Exhausted {
                prefix: "LAP".into(),
                year: 2026
            }
        );
    }

    #[test]
    fn test_well_formed_tags() {
        assert!(parse_tag("LAP", "LAP-2024-017").is_some());
        assert!(parse_tag("LAP", "MON-2024-017").is_none());
        assert!(parse_tag("LAP", "LAP-24-017").is_none());
        assert!(parse_tag("LAP", "LAP-2024-17").is_none());
    }

    #[test]
    fn test_non_ascii_digits_are_rejected() {
        assert!(parse_tag("LAP", "LAP-\u{662}\u{660}\u{662}\u{666}-\u{660}\u{660}\u{661}").is_none());
        assert!(parse_tag("LAP", "LAP-2026-\u{661}\u{662}\u{663}").is_none());

        let seq = TagSequence::new("LAP", 2026).unwrap();
        assert_eq!(seq.max(["LAP-2026-\u{669}\u{669}\u{669}", "LAP-2026-004"]), 4);
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag("MON", "MON-2025-042"), Some((2025, 42)));
        assert_eq!(parse_tag("LAP", "MON-2025-042"), None);
        assert_eq!(parse_tag("MON", "MON-2025-042 "), None);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(TagSequence::new("ASN", 2026).unwrap().like_pattern(), "ASN-2026-%");
    }
}
