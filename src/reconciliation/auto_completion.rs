//! Auto-completion of shifts that never received a checkout.
//!
//! An OPEN shift becomes eligible for a synthetic checkout at its *cutoff*:
//! the day-start boundary on the calendar day after its shift date. A shift
//! dated today is never eligible, whatever the boundary.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::EngineResult;
use crate::models::{Completion, ShiftRecord};

/// Returns the moment an OPEN shift dated `shift_date` becomes due.
///
/// # Example
///
/// ```
/// use attendance_reconciler::reconciliation::cutoff;
/// use chrono::{NaiveDate, NaiveTime};
///
/// let at = cutoff(
///     NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
///     NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
/// );
/// assert_eq!(at.to_string(), "2026-01-16 05:00:00");
/// ```
pub fn cutoff(shift_date: NaiveDate, day_start_boundary: NaiveTime) -> NaiveDateTime {
    shift_date
        .succ_opt()
        .unwrap_or(shift_date)
        .and_time(day_start_boundary)
}

/// Decides when an incomplete shift gets a synthetic checkout, and computes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoCompletionPolicy {
    day_start_boundary: NaiveTime,
}

impl AutoCompletionPolicy {
    /// Creates a policy for the given day-start boundary.
    pub fn new(day_start_boundary: NaiveTime) -> Self {
        Self { day_start_boundary }
    }

    /// The configured day-start boundary.
    pub fn day_start_boundary(&self) -> NaiveTime {
        self.day_start_boundary
    }

    /// The cutoff for a shift dated `shift_date`.
    pub fn cutoff(&self, shift_date: NaiveDate) -> NaiveDateTime {
        cutoff(shift_date, self.day_start_boundary)
    }

    /// Returns true if `shift` should be auto-completed as of `now`.
    pub fn is_due(&self, shift: &ShiftRecord, now: NaiveDateTime) -> bool {
        shift.completion == Completion::Open
            && shift.shift_date != now.date()
            && now >= self.cutoff(shift.shift_date)
    }

    /// Returns a copy of `shift` closed with a synthetic checkout at its cutoff.
    ///
    /// Fails with [`crate::error::EngineError::InvalidTransition`] if the shift
    /// is already terminal.
    pub fn complete(&self, shift: &ShiftRecord) -> EngineResult<ShiftRecord> {
        let mut completed = shift.clone();
        let at = self.cutoff(shift.shift_date);
        completed.close_auto(at)?;

        debug!(
            employee_id = %shift.employee_id,
            shift_date = %shift.shift_date,
            checkout_time = %at,
            "Auto-completed open shift"
        );
        Ok(completed)
    }
}
