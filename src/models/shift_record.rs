//! Shift record model and its lifecycle.
//!
//! A [`ShiftRecord`] is the derived, one-row-per-shift unit written to the
//! ledger. Its `completion` field doubles as the lifecycle state:
//!
//! ```text
//! NONE --open--> OPEN --close_manual--> MANUAL
//!                     \--close_auto----> AUTO_CLOSED
//! ```
//!
//! Transitions are guarded; asking a terminal shift to close again is an
//! [`EngineError::InvalidTransition`].

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::Punch;

/// Arrival classification against the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckinStatus {
    /// Arrived within the grace period.
    OnTime,
    /// Arrived after the grace period.
    Late,
}

/// Departure classification against the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Left before the scheduled end.
    Early,
    /// Left at the scheduled end, within tolerance.
    OnTime,
    /// Left materially after the scheduled end.
    Overtime,
    /// Checkout synthesized by auto-completion.
    Auto,
}

/// Lifecycle state of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Checked in, no accepted checkout yet.
    Open,
    /// Closed by a real checkout punch.
    Manual,
    /// Closed by a synthetic auto-checkout.
    AutoClosed,
}

impl Completion {
    /// Returns true for MANUAL and AUTO_CLOSED.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Completion::Open)
    }

    /// Preference used when two records compete for the same ledger key.
    pub fn rank(self) -> u8 {
        match self {
            Completion::Open => 0,
            Completion::AutoClosed => 1,
            Completion::Manual => 2,
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Open => write!(f, "OPEN"),
            Completion::Manual => write!(f, "MANUAL"),
            Completion::AutoClosed => write!(f, "AUTO_CLOSED"),
        }
    }
}

/// Whether a record has been written to the ledger as final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Not yet persisted as final.
    Pending,
    /// Persisted as a terminal record.
    Synced,
}

/// One shift for one employee, keyed by `(employee_id, shift_date)`.
///
/// `shift_date` is the calendar date of the check-in, even when the checkout
/// lands on the following day.
///
/// # Example
///
/// ```
/// use attendance_reconciler::models::{Completion, RawPunch, ShiftRecord};
///
/// let check_in = RawPunch::new("r1", "E1", "in", "2026-01-15 22:30:00").parse().unwrap();
/// let check_out = RawPunch::new("r2", "E1", "out", "2026-01-16 03:45:00").parse().unwrap();
///
/// let mut shift = ShiftRecord::open(&check_in);
/// shift.close_manual(&check_out).unwrap();
///
/// assert_eq!(shift.shift_date.to_string(), "2026-01-15");
/// assert_eq!(shift.completion, Completion::Manual);
/// assert!(shift.is_cross_day());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRecord {
    /// The employee who worked the shift.
    pub employee_id: String,
    /// The logical shift date (check-in calendar date).
    pub shift_date: NaiveDate,
    /// When the employee checked in.
    pub checkin_time: NaiveDateTime,
    /// Source record id of the check-in punch.
    pub checkin_punch_id: String,
    /// Arrival classification, set once classified.
    pub checkin_status: Option<CheckinStatus>,
    /// When the employee checked out, real or synthetic.
    pub checkout_time: Option<NaiveDateTime>,
    /// Source record id of the checkout punch; `None` for auto-checkouts.
    pub checkout_punch_id: Option<String>,
    /// Departure classification, set once classified.
    pub checkout_status: Option<CheckoutStatus>,
    /// Lifecycle state.
    pub completion: Completion,
    /// Ledger persistence state.
    pub migration_status: MigrationStatus,
}

impl ShiftRecord {
    /// Opens a shift from an accepted check-in punch.
    pub fn open(check_in: &Punch) -> Self {
        Self {
            employee_id: check_in.employee_id.clone(),
            shift_date: check_in.date(),
            checkin_time: check_in.timestamp,
            checkin_punch_id: check_in.source_record_id.clone(),
            checkin_status: None,
            checkout_time: None,
            checkout_punch_id: None,
            checkout_status: None,
            completion: Completion::Open,
            migration_status: MigrationStatus::Pending,
        }
    }

    /// Closes the shift with a real checkout punch.
    ///
    /// Fails with [`EngineError::InvalidTransition`] unless the shift is OPEN,
    /// and with [`EngineError::OrderingViolation`] unless the checkout comes
    /// strictly after the check-in. The shift is unchanged on failure.
    pub fn close_manual(&mut self, check_out: &Punch) -> EngineResult<()> {
        self.guard_open(Completion::Manual)?;
        if check_out.timestamp <= self.checkin_time {
            return Err(EngineError::OrderingViolation {
                employee_id: self.employee_id.clone(),
                checkin_time: self.checkin_time,
                checkout_time: check_out.timestamp,
            });
        }

        self.checkout_time = Some(check_out.timestamp);
        self.checkout_punch_id = Some(check_out.source_record_id.clone());
        self.checkout_status = None;
        self.completion = Completion::Manual;
        Ok(())
    }

    /// Closes the shift with a synthetic checkout at `at`.
    pub fn close_auto(&mut self, at: NaiveDateTime) -> EngineResult<()> {
        self.guard_open(Completion::AutoClosed)?;
        if at <= self.checkin_time {
            return Err(EngineError::OrderingViolation {
                employee_id: self.employee_id.clone(),
                checkin_time: self.checkin_time,
                checkout_time: at,
            });
        }

        self.checkout_time = Some(at);
        self.checkout_punch_id = None;
        self.checkout_status = Some(CheckoutStatus::Auto);
        self.completion = Completion::AutoClosed;
        Ok(())
    }

    fn guard_open(&self, to: Completion) -> EngineResult<()> {
        if self.completion == Completion::Open {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                employee_id: self.employee_id.clone(),
                shift_date: self.shift_date,
                from: self.completion.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// The ledger key.
    pub fn key(&self) -> (String, NaiveDate) {
        (self.employee_id.clone(), self.shift_date)
    }

    /// Returns true once the shift is MANUAL or AUTO_CLOSED.
    pub fn is_terminal(&self) -> bool {
        self.completion.is_terminal()
    }

    /// Returns true when the checkout lands on a later calendar date.
    pub fn is_cross_day(&self) -> bool {
        self.checkout_time
            .is_some_and(|checkout| checkout.date() > self.shift_date)
    }

    /// Returns true when check-in and checkout match `other`.
    pub fn same_times_as(&self, other: &ShiftRecord) -> bool {
        self.checkin_time == other.checkin_time && self.checkout_time == other.checkout_time
    }

    /// Calculates the elapsed hours between check-in and checkout.
    ///
    /// Returns zero for a shift that is still open.
    ///
    /// # Examples
    ///
    /// ```
    /// use attendance_reconciler::models::{RawPunch, ShiftRecord};
    /// use rust_decimal::Decimal;
    ///
    /// let check_in = RawPunch::new("r1", "E1", "in", "2026-01-15 09:00:00").parse().unwrap();
    /// let check_out = RawPunch::new("r2", "E1", "out", "2026-01-15 17:30:00").parse().unwrap();
    ///
    /// let mut shift = ShiftRecord::open(&check_in);
    /// assert_eq!(shift.worked_hours(), Decimal::ZERO);
    ///
    /// shift.close_manual(&check_out).unwrap();
    /// assert_eq!(shift.worked_hours(), Decimal::new(85, 1)); // 8.5 hours
    /// ```
    pub fn worked_hours(&self) -> Decimal {
        match self.checkout_time {
            Some(checkout) => {
                let minutes = (checkout - self.checkin_time).num_minutes();
                Decimal::new(minutes, 0) / Decimal::new(60, 0)
            }
            None => Decimal::ZERO,
        }
    }
}
