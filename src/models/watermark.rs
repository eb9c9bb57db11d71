//! Watermark model.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp of the latest punch a run has fully processed.
///
/// Passed into and returned from each incremental run. An empty watermark
/// means "fetch everything".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(pub Option<NaiveDateTime>);

impl Watermark {
    /// A watermark that has never advanced.
    pub const EMPTY: Watermark = Watermark(None);

    /// A watermark at `at`.
    pub fn at(at: NaiveDateTime) -> Self {
        Self(Some(at))
    }

    /// The underlying timestamp.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.0
    }

    /// Returns the later of this watermark and `candidate`.
    ///
    /// A watermark never moves backwards.
    pub fn advanced_to(self, candidate: Option<NaiveDateTime>) -> Self {
        match (self.0, candidate) {
            (Some(current), Some(next)) => Self(Some(current.max(next))),
            (None, next) => Self(next),
            (current, None) => Self(current),
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(at) => write!(f, "{}", at),
            None => write!(f, "<none>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_advance_from_empty() {
        let next = Watermark::EMPTY.advanced_to(Some(datetime("2026-01-15 09:00:00")));
        assert_eq!(next.timestamp(), Some(datetime("2026-01-15 09:00:00")));
    }

    #[test]
    fn test_never_moves_backwards() {
        let current = Watermark::at(datetime("2026-01-15 09:00:00"));
        let next = current.advanced_to(Some(datetime("2026-01-14 09:00:00")));
        assert_eq!(next, current);
        assert_eq!(current.advanced_to(None), current);
    }

    #[test]
    fn test_serializes_as_plain_timestamp() {
        let json = serde_json::to_string(&Watermark::at(datetime("2026-01-15 09:00:00"))).unwrap();
        assert_eq!(json, "\"2026-01-15T09:00:00\"");
        assert_eq!(serde_json::to_string(&Watermark::EMPTY).unwrap(), "null");
    }
}
