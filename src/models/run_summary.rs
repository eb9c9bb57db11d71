//! Run summary models for the attendance reconciler.
//!
//! This module contains the [`RunSummary`] type and its associated structures
//! that capture everything a reconciliation run did: counts per decision,
//! the discrepancies it recovered from, and the records it wrote.

use std::ops::AddAssign;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

use super::{DateWindow, ShiftRecord, Watermark};

/// How a run was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Punches since the watermark; advances the watermark.
    Incremental,
    /// An explicit date range; recomputes classifications, never touches the watermark.
    Reprocess,
}

/// How much attention a discrepancy deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A routine repair.
    Info,
    /// Input was dropped or a pairing was refused.
    Warning,
    /// Something failed that an operator should look at.
    Error,
}

/// A recovered anomaly, reported instead of failing the run.
///
/// # Example
///
/// ```
/// use attendance_reconciler::models::{Discrepancy, Severity};
///
/// let discrepancy = Discrepancy::new("ORPHAN_CHECKOUT", "checkout without a check-in", Severity::Info)
///     .for_employee("E1")
///     .with_record("rec-7");
///
/// assert_eq!(discrepancy.employee_id.as_deref(), Some("E1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// A code identifying the kind of discrepancy.
    pub code: String,
    /// The affected employee, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    /// The punch that triggered it, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_record_id: Option<String>,
    /// The affected shift date, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift_date: Option<NaiveDate>,
    /// A human-readable description.
    pub message: String,
    /// The severity level.
    pub severity: Severity,
}

impl Discrepancy {
    /// Creates a discrepancy with no subject attached.
    pub fn new(code: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            code: code.into(),
            employee_id: None,
            source_record_id: None,
            shift_date: None,
            message: message.into(),
            severity,
        }
    }

    /// Attaches the affected employee.
    pub fn for_employee(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    /// Attaches the triggering punch.
    pub fn with_record(mut self, source_record_id: impl Into<String>) -> Self {
        self.source_record_id = Some(source_record_id.into());
        self
    }

    /// Attaches the affected shift date.
    pub fn on_date(mut self, shift_date: NaiveDate) -> Self {
        self.shift_date = Some(shift_date);
        self
    }

    /// Builds a discrepancy from a recovered engine error.
    ///
    /// The code is the error's code; employee and shift date are lifted from
    /// the error where it carries them.
    pub fn from_error(error: &EngineError) -> Self {
        let severity = if error.is_fatal() {
            Severity::Error
        } else {
            Severity::Warning
        };
        let discrepancy = Self::new(error.code(), error.to_string(), severity);

        match error {
            EngineError::MalformedPunch {
                source_record_id, ..
            } => discrepancy.with_record(source_record_id.clone()),
            EngineError::OrderingViolation {
                employee_id,
                checkin_time,
                ..
            } => discrepancy
                .for_employee(employee_id.clone())
                .on_date(checkin_time.date()),
            EngineError::DurationGuardExceeded {
                employee_id,
                shift_date,
                ..
            }
            | EngineError::ShiftTooShort {
                employee_id,
                shift_date,
                ..
            }
            | EngineError::InvalidTransition {
                employee_id,
                shift_date,
                ..
            }
            | EngineError::SinkWriteFailure {
                employee_id,
                shift_date,
                ..
            } => discrepancy
                .for_employee(employee_id.clone())
                .on_date(*shift_date),
            _ => discrepancy,
        }
    }
}

/// Per-decision tallies for a run.
///
/// Each pipeline stage fills in its own fields; the engine adds them up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    /// Raw punches returned by the source.
    pub punches_fetched: u64,
    /// Punches dropped because they could not be parsed or attributed.
    pub malformed_dropped: u64,
    /// Break-in and break-out punches, which are not shift events.
    pub break_punches_skipped: u64,
    /// Punches stamped after the run's `now`, left for a later run.
    pub future_punches_held: u64,
    /// Punches collapsed because their source record id repeated.
    pub duplicate_events: u64,
    /// Checkouts dropped for lack of a check-in.
    pub orphan_checkouts: u64,
    /// Checkouts set aside because they did not follow their check-in.
    pub ordering_deferred: u64,
    /// Early-morning check-ins turned into the previous shift's checkout.
    pub reclassified_checkouts: u64,
    /// Repeated check-ins collapsed into the earliest.
    pub duplicate_checkins: u64,
    /// Shifts opened by a check-in.
    pub shifts_opened: u64,
    /// Shifts closed by a real checkout.
    pub shifts_closed: u64,
    /// Shifts closed by auto-completion.
    pub shifts_auto_closed: u64,
    /// Written shifts whose checkout fell on a later calendar date.
    pub cross_day_shifts: u64,
    /// Pairings refused by the shift-length guards.
    pub duration_guard_rejections: u64,
    /// Competing records removed by dedup.
    pub dedup_removed: u64,
    /// Records written to the ledger.
    pub upserted: u64,
    /// Records skipped because the ledger already matched.
    pub unchanged: u64,
    /// Errors recorded during the run.
    pub errors: u64,
}

impl AddAssign for RunCounts {
    fn add_assign(&mut self, other: Self) {
        self.punches_fetched += other.punches_fetched;
        self.malformed_dropped += other.malformed_dropped;
        self.break_punches_skipped += other.break_punches_skipped;
        self.future_punches_held += other.future_punches_held;
        self.duplicate_events += other.duplicate_events;
        self.orphan_checkouts += other.orphan_checkouts;
        self.ordering_deferred += other.ordering_deferred;
        self.reclassified_checkouts += other.reclassified_checkouts;
        self.duplicate_checkins += other.duplicate_checkins;
        self.shifts_opened += other.shifts_opened;
        self.shifts_closed += other.shifts_closed;
        self.shifts_auto_closed += other.shifts_auto_closed;
        self.cross_day_shifts += other.cross_day_shifts;
        self.duration_guard_rejections += other.duration_guard_rejections;
        self.dedup_removed += other.dedup_removed;
        self.upserted += other.upserted;
        self.unchanged += other.unchanged;
        self.errors += other.errors;
    }
}

/// The complete result of a reconciliation run.
///
/// # Example
///
/// ```
/// use attendance_reconciler::models::{RunCounts, RunMode, RunSummary, Watermark};
/// use chrono::Utc;
/// use rust_decimal::Decimal;
/// use uuid::Uuid;
///
/// let summary = RunSummary {
///     run_id: Uuid::new_v4(),
///     tenant_id: "acme".to_string(),
///     mode: RunMode::Incremental,
///     started_at: Utc::now(),
///     window: None,
///     watermark_before: Watermark::EMPTY,
///     watermark_after: Watermark::EMPTY,
///     counts: RunCounts::default(),
///     discrepancies: vec![],
///     shifts: vec![],
///     worked_hours: Decimal::ZERO,
///     duration_us: 0,
/// };
/// assert!(!summary.has_errors());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique identifier for this run.
    pub run_id: Uuid,
    /// The tenant the run reconciled.
    pub tenant_id: String,
    /// Incremental or reprocess.
    pub mode: RunMode,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// The shift dates reassembled; `None` when there was nothing to do.
    pub window: Option<DateWindow>,
    /// The watermark the run started from.
    pub watermark_before: Watermark,
    /// The watermark to persist for the next run.
    pub watermark_after: Watermark,
    /// Per-decision tallies.
    pub counts: RunCounts,
    /// Everything the run recovered from.
    pub discrepancies: Vec<Discrepancy>,
    /// The records written to the ledger, in write order.
    pub shifts: Vec<ShiftRecord>,
    /// Hours worked across the closed shifts written by this run.
    pub worked_hours: Decimal,
    /// The total run duration in microseconds.
    pub duration_us: u64,
}

impl RunSummary {
    /// Returns true if any discrepancy has [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.discrepancies
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_counts_add_up() {
        let mut total = RunCounts {
            punches_fetched: 4,
            orphan_checkouts: 1,
            ..RunCounts::default()
        };
        total += RunCounts {
            shifts_opened: 2,
            orphan_checkouts: 1,
            ..RunCounts::default()
        };

        assert_eq!(total.punches_fetched, 4);
        assert_eq!(total.orphan_checkouts, 2);
        assert_eq!(total.shifts_opened, 2);
    }

    #[test]
    fn test_worked_hours_serializes_as_string() {
        let summary = RunSummary {
            run_id: Uuid::nil(),
            tenant_id: "acme".to_string(),
            mode: RunMode::Reprocess,
            started_at: Utc::now(),
            window: None,
            watermark_before: Watermark::EMPTY,
            watermark_after: Watermark::EMPTY,
            counts: RunCounts::default(),
            discrepancies: vec![],
            shifts: vec![],
            worked_hours: Decimal::new(1325, 2),
            duration_us: 0,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"worked_hours\":\"13.25\""));
    }

    #[test]
    fn test_discrepancy_from_duration_guard_lifts_subject() {
        let error = EngineError::DurationGuardExceeded {
            employee_id: "E1".to_string(),
            shift_date: date("2026-01-15"),
            elapsed_minutes: 1500,
            limit_minutes: 1440,
        };
        let discrepancy = Discrepancy::from_error(&error);

        assert_eq!(discrepancy.code, "DURATION_GUARD_EXCEEDED");
        assert_eq!(discrepancy.employee_id.as_deref(), Some("E1"));
        assert_eq!(discrepancy.shift_date, Some(date("2026-01-15")));
        assert_eq!(discrepancy.severity, Severity::Warning);
    }

    #[test]
    fn test_discrepancy_from_ordering_violation_uses_checkin_date() {
        let error = EngineError::OrderingViolation {
            employee_id: "E1".to_string(),
            checkin_time: NaiveDateTime::parse_from_str("2026-01-15 22:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            checkout_time: NaiveDateTime::parse_from_str(
                "2026-01-15 21:00:00",
                "%Y-%m-%d %H:%M:%S",
            )
            .unwrap(),
        };
        let discrepancy = Discrepancy::from_error(&error);
        assert_eq!(discrepancy.shift_date, Some(date("2026-01-15")));
    }

    #[test]
    fn test_sink_failure_is_error_severity() {
        let error = EngineError::SinkWriteFailure {
            employee_id: "E1".to_string(),
            shift_date: date("2026-01-15"),
            attempts: 3,
            message: "timeout".to_string(),
        };
        assert_eq!(Discrepancy::from_error(&error).severity, Severity::Error);
    }

    #[test]
    fn test_discrepancy_serialization_skips_missing_subject() {
        let discrepancy = Discrepancy::new("ORPHAN_CHECKOUT", "no check-in", Severity::Info);
        let json = serde_json::to_string(&discrepancy).unwrap();

        assert!(json.contains("\"code\":\"ORPHAN_CHECKOUT\""));
        assert!(json.contains("\"severity\":\"info\""));
        assert!(!json.contains("employee_id"));
        assert!(!json.contains("shift_date"));
    }

    #[test]
    fn test_run_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&RunMode::Incremental).unwrap(),
            "\"incremental\""
        );
        assert_eq!(
            serde_json::to_string(&RunMode::Reprocess).unwrap(),
            "\"reprocess\""
        );
    }
}
