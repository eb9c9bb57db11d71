//! Punch models.
//!
//! A [`RawPunch`] is what the upstream device log hands over: loosely typed
//! strings. A [`Punch`] is the validated, immutable fact the rest of the
//! engine reasons about.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Timestamp layouts accepted from the punch source.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Direction texts the device uses for break punches, which share the log.
const BREAK_DIRECTIONS: [&str; 6] = [
    "breakin",
    "break_in",
    "break-in",
    "breakout",
    "break_out",
    "break-out",
];

/// Whether a punch records arrival or departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// A check-in.
    In,
    /// A check-out.
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "checkin" | "check_in" | "check-in" => Ok(Direction::In),
            "out" | "checkout" | "check_out" | "check-out" => Ok(Direction::Out),
            other => Err(format!("unknown punch direction '{}'", other)),
        }
    }
}

/// A punch exactly as delivered by the punch source.
///
/// # Example
///
/// ```
/// use attendance_reconciler::models::{Direction, RawPunch};
///
/// let raw = RawPunch::new("rec-1", "E1", "checkin", "2026-01-15 09:00:00");
/// let punch = raw.parse().unwrap();
/// assert_eq!(punch.direction, Direction::In);
/// assert_eq!(punch.timestamp.to_string(), "2026-01-15 09:00:00");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPunch {
    /// Upstream identifier of the physical punch event.
    pub source_record_id: String,
    /// The employee identifier as recorded by the device.
    pub employee_id: String,
    /// Direction text such as "checkin" or "OUT".
    pub direction: String,
    /// Timestamp text in device local time.
    pub timestamp: String,
}

impl RawPunch {
    /// Creates a raw punch from its parts.
    pub fn new(
        source_record_id: impl Into<String>,
        employee_id: impl Into<String>,
        direction: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            source_record_id: source_record_id.into(),
            employee_id: employee_id.into(),
            direction: direction.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Returns true for a break-in or break-out record.
    ///
    /// Break punches are not shift events; the normalizer skips them.
    pub fn is_break(&self) -> bool {
        let direction = self.direction.trim().to_ascii_lowercase();
        BREAK_DIRECTIONS.contains(&direction.as_str())
    }

    /// The timestamp, if it matches one of the accepted layouts.
    ///
    /// Readable even when the rest of the record is not.
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }

    /// Validates the raw record into a [`Punch`].
    ///
    /// Returns [`EngineError::MalformedPunch`] when the id or employee is
    /// blank, the direction is unknown, or the timestamp matches none of the
    /// accepted layouts.
    pub fn parse(&self) -> EngineResult<Punch> {
        let malformed = |message: String| EngineError::MalformedPunch {
            source_record_id: self.source_record_id.clone(),
            message,
        };

        if self.source_record_id.trim().is_empty() {
            return Err(malformed("missing source record id".to_string()));
        }
        let employee_id = self.employee_id.trim();
        if employee_id.is_empty() {
            return Err(malformed("missing employee id".to_string()));
        }

        let direction = self.direction.parse::<Direction>().map_err(malformed)?;
        let timestamp = parse_timestamp(&self.timestamp).ok_or_else(|| {
            malformed(format!("unparseable timestamp '{}'", self.timestamp))
        })?;

        Ok(Punch {
            employee_id: employee_id.to_string(),
            direction,
            timestamp,
            source_record_id: self.source_record_id.trim().to_string(),
        })
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// A validated punch: one biometric check-in or check-out event.
///
/// Identity is `source_record_id`; two punches with the same id are the same
/// physical event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Punch {
    /// The employee who punched.
    pub employee_id: String,
    /// Check-in or check-out.
    pub direction: Direction,
    /// When the punch happened, in device local time.
    pub timestamp: NaiveDateTime,
    /// Upstream identifier of the physical event.
    pub source_record_id: String,
}

impl Punch {
    /// The calendar date of the punch.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Returns true for check-ins.
    pub fn is_in(&self) -> bool {
        self.direction == Direction::In
    }

    /// The canonical ordering key: employee, time, IN before OUT, then id.
    pub fn sort_key(&self) -> (&str, NaiveDateTime, Direction, &str) {
        (
            self.employee_id.as_str(),
            self.timestamp,
            self.direction,
            self.source_record_id.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_space_separated_timestamp() {
        let punch = RawPunch::new("r1", "E1", "in", "2026-01-15 09:00:00")
            .parse()
            .unwrap();
        assert_eq!(punch.date(), NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert!(punch.is_in());
    }

    #[test]
    fn test_parse_iso_timestamp_with_fraction() {
        let punch = RawPunch::new("r1", "E1", "OUT", "2026-01-15T17:30:12.250")
            .parse()
            .unwrap();
        assert_eq!(punch.direction, Direction::Out);
        assert_eq!(punch.timestamp.format("%H:%M:%S").to_string(), "17:30:12");
    }

    #[test]
    fn test_parse_minute_precision_timestamp() {
        let punch = RawPunch::new("r1", "E1", "checkout", "2026-01-15 17:30")
            .parse()
            .unwrap();
        assert_eq!(punch.timestamp.format("%H:%M:%S").to_string(), "17:30:00");
    }

    #[test]
    fn test_parse_trims_employee_and_record_ids() {
        let punch = RawPunch::new(" r1 ", " E1 ", "Check-In", "2026-01-15 09:00:00")
            .parse()
            .unwrap();
        assert_eq!(punch.employee_id, "E1");
        assert_eq!(punch.source_record_id, "r1");
    }

    #[test]
    fn test_unparseable_timestamp_is_malformed() {
        let result = RawPunch::new("r1", "E1", "in", "yesterday-ish").parse();
        match result {
            Err(EngineError::MalformedPunch {
                source_record_id,
                message,
            }) => {
                assert_eq!(source_record_id, "r1");
                assert!(message.contains("unparseable timestamp"));
            }
            other => panic!("Expected MalformedPunch, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_direction_is_malformed() {
        let result = RawPunch::new("r1", "E1", "break", "2026-01-15 09:00:00").parse();
        assert!(matches!(result, Err(EngineError::MalformedPunch { .. })));
    }

    #[test]
    fn test_break_directions_are_recognised() {
        for direction in ["breakin", "BREAK_OUT", " break-in "] {
            let raw = RawPunch::new("r1", "E1", direction, "2026-01-15 13:00:00");
            assert!(raw.is_break(), "{}", direction);
            assert!(raw.parse().is_err());
        }
        assert!(!RawPunch::new("r1", "E1", "checkin", "2026-01-15 13:00:00").is_break());
    }

    #[test]
    fn test_recorded_at_ignores_bad_direction() {
        let raw = RawPunch::new("r1", "E1", "sideways", "2026-01-15 13:00:00");
        assert!(raw.parse().is_err());
        assert_eq!(raw.recorded_at().unwrap().to_string(), "2026-01-15 13:00:00");
        assert!(RawPunch::new("r2", "E1", "in", "yesterday").recorded_at().is_none());
    }

    #[test]
    fn test_blank_employee_is_malformed() {
        let result = RawPunch::new("r1", "  ", "in", "2026-01-15 09:00:00").parse();
        assert!(matches!(result, Err(EngineError::MalformedPunch { .. })));
    }

    #[test]
    fn test_sort_key_puts_in_before_out_at_same_instant() {
        let check_in = RawPunch::new("b", "E1", "in", "2026-01-15 09:00:00")
            .parse()
            .unwrap();
        let check_out = RawPunch::new("a", "E1", "out", "2026-01-15 09:00:00")
            .parse()
            .unwrap();
        assert!(check_in.sort_key() < check_out.sort_key());
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(serde_json::to_string(&Direction::In).unwrap(), "\"in\"");
        let out: Direction = serde_json::from_str("\"out\"").unwrap();
        assert_eq!(out, Direction::Out);
    }
}
