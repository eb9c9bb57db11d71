//! Date window model.
//!
//! This module contains the [`DateWindow`] type: the inclusive range of shift
//! dates a run reassembles.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// An inclusive range of shift dates.
///
/// # Example
///
/// ```
/// use attendance_reconciler::models::DateWindow;
/// use chrono::NaiveDate;
///
/// let window = DateWindow::new(
///     NaiveDate::from_ymd_opt(2026, 1, 13).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
/// )
/// .unwrap();
///
/// assert!(window.contains_date(NaiveDate::from_ymd_opt(2026, 1, 14).unwrap()));
/// assert_eq!(window.dates().count(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// The first shift date (inclusive).
    pub from: NaiveDate,
    /// The last shift date (inclusive).
    pub to: NaiveDate,
}

impl DateWindow {
    /// Creates a window, rejecting an inverted range with
    /// [`EngineError::InvalidRange`].
    pub fn new(from: NaiveDate, to: NaiveDate) -> EngineResult<Self> {
        if from > to {
            return Err(EngineError::InvalidRange {
                from,
                to,
                message: "start date is after end date".to_string(),
            });
        }
        Ok(Self { from, to })
    }

    /// Checks if a given date falls within this window.
    ///
    /// The check is inclusive of both ends.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Iterates every date in the window in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let to = self.to;
        self.from.iter_days().take_while(move |date| *date <= to)
    }

    /// The day before `from`, for fetching prior-day context.
    pub fn context_start(&self) -> NaiveDate {
        self.from.pred_opt().unwrap_or(self.from)
    }

    /// The day after `to`, where a night shift dated `to` checks out.
    pub fn context_end(&self) -> NaiveDate {
        self.to.succ_opt().unwrap_or(self.to)
    }

    /// Number of dates in the window.
    pub fn len_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_contains_date_inclusive() {
        let window = DateWindow::new(date("2026-01-13"), date("2026-01-26")).unwrap();

        assert!(window.contains_date(date("2026-01-13")));
        assert!(window.contains_date(date("2026-01-20")));
        assert!(window.contains_date(date("2026-01-26")));
        assert!(!window.contains_date(date("2026-01-12")));
        assert!(!window.contains_date(date("2026-01-27")));
    }

    #[test]
    fn test_single_day_window() {
        let window = DateWindow::new(date("2026-01-15"), date("2026-01-15")).unwrap();
        assert_eq!(window.len_days(), 1);
        assert_eq!(window.dates().collect::<Vec<_>>(), vec![date("2026-01-15")]);
    }

    #[test]
    fn test_dates_cross_month_boundary() {
        let window = DateWindow::new(date("2026-01-30"), date("2026-02-02")).unwrap();
        let dates: Vec<_> = window.dates().collect();
        assert_eq!(
            dates,
            vec![
                date("2026-01-30"),
                date("2026-01-31"),
                date("2026-02-01"),
                date("2026-02-02"),
            ]
        );
    }

    #[test]
    fn test_inverted_window_rejected() {
        let result = DateWindow::new(date("2026-01-15"), date("2026-01-14"));
        match result {
            Err(EngineError::InvalidRange { from, to, .. }) => {
                assert_eq!(from, date("2026-01-15"));
                assert_eq!(to, date("2026-01-14"));
            }
            other => panic!("Expected InvalidRange, got {:?}", other),
        }
    }

    #[test]
    fn test_context_start_is_previous_day() {
        let window = DateWindow::new(date("2026-03-01"), date("2026-03-02")).unwrap();
        assert_eq!(window.context_start(), date("2026-02-28"));
    }

    #[test]
    fn test_context_end_is_next_day() {
        let window = DateWindow::new(date("2026-02-27"), date("2026-02-28")).unwrap();
        assert_eq!(window.context_end(), date("2026-03-01"));
    }

    #[test]
    fn test_window_serialization() {
        let window = DateWindow::new(date("2026-01-13"), date("2026-01-26")).unwrap();
        let json = serde_json::to_string(&window).unwrap();
        assert_eq!(json, r#"{"from":"2026-01-13","to":"2026-01-26"}"#);
    }
}
