//! Shift assembly.
//!
//! This module folds normalized punches into [`ShiftRecord`]s. A check-in
//! opens a shift keyed by its own calendar date; the next accepted checkout
//! closes it whatever date it falls on, so a night shift keeps the date it
//! started on.

use std::collections::BTreeMap;

use chrono::Duration;
use tracing::{debug, warn};

use crate::config::ReconConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{Direction, Discrepancy, Punch, RunCounts, ShiftRecord};

use super::auto_completion::AutoCompletionPolicy;

/// Open shifts keyed by employee id. At most one per employee.
pub type OpenShifts = BTreeMap<String, ShiftRecord>;

/// Plausibility limits on the length of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationGuard {
    /// Longest acceptable shift.
    pub max: Duration,
    /// Shortest acceptable shift whose checkout falls on the check-in date.
    pub min_same_day: Option<Duration>,
}

impl DurationGuard {
    /// Builds the guard from configuration.
    pub fn from_config(config: &ReconConfig) -> Self {
        Self {
            max: config.max_shift_duration(),
            min_same_day: config.min_shift_duration(),
        }
    }

    /// Checks whether `check_out` may close `shift`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::OrderingViolation`] if the checkout is not after the check-in
    /// - [`EngineError::DurationGuardExceeded`] if the shift would be too long
    /// - [`EngineError::ShiftTooShort`] if a same-day shift would be too short
    pub fn check(&self, shift: &ShiftRecord, check_out: &Punch) -> EngineResult<()> {
        let elapsed = check_out.timestamp - shift.checkin_time;

        if elapsed <= Duration::zero() {
            return Err(EngineError::OrderingViolation {
                employee_id: shift.employee_id.clone(),
                checkin_time: shift.checkin_time,
                checkout_time: check_out.timestamp,
            });
        }
        if elapsed > self.max {
            return Err(EngineError::DurationGuardExceeded {
                employee_id: shift.employee_id.clone(),
                shift_date: shift.shift_date,
                elapsed_minutes: elapsed.num_minutes(),
                limit_minutes: self.max.num_minutes(),
            });
        }
        if let Some(min) = self.min_same_day {
            if check_out.date() == shift.shift_date && elapsed < min {
                return Err(EngineError::ShiftTooShort {
                    employee_id: shift.employee_id.clone(),
                    shift_date: shift.shift_date,
                    elapsed_minutes: elapsed.num_minutes(),
                    limit_minutes: min.num_minutes(),
                });
            }
        }
        Ok(())
    }
}

/// The output of [`assemble`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    /// Shifts that reached a terminal state, in the order they closed.
    pub shifts: Vec<ShiftRecord>,
    /// Shifts still open afterwards.
    pub open_shifts: OpenShifts,
    /// Pairings that were refused.
    pub discrepancies: Vec<Discrepancy>,
    /// Tallies for the assembly counters.
    pub counts: RunCounts,
}

impl Assembly {
    /// Starts an assembly from shifts already open.
    pub fn carrying(open_shifts: OpenShifts) -> Self {
        Self {
            open_shifts,
            ..Self::default()
        }
    }

    /// Every shift touched so far: closed ones, then the still-open ones.
    pub fn all_shifts(&self) -> impl Iterator<Item = &ShiftRecord> {
        self.shifts.iter().chain(self.open_shifts.values())
    }
}

/// Groups normalized punches into shifts.
///
/// `punches` must be ordered by employee then time, as
/// [`super::normalize`] returns them. Shifts in `open_shifts` are continued.
///
/// # Example
///
/// ```
/// use attendance_reconciler::config::ReconConfig;
/// use attendance_reconciler::models::{Completion, RawPunch};
/// use attendance_reconciler::reconciliation::{
///     assemble, AutoCompletionPolicy, DurationGuard, OpenShifts,
/// };
///
/// let config = ReconConfig::default();
/// let punches = vec![
///     RawPunch::new("r1", "E1", "in", "2026-01-15 22:30:00").parse().unwrap(),
///     RawPunch::new("r2", "E1", "out", "2026-01-16 03:45:00").parse().unwrap(),
/// ];
///
/// let assembly = assemble(
///     &punches,
///     OpenShifts::new(),
///     &DurationGuard::from_config(&config),
///     &AutoCompletionPolicy::new(config.day_start_boundary),
/// );
///
/// assert_eq!(assembly.shifts.len(), 1);
/// assert_eq!(assembly.shifts[0].shift_date.to_string(), "2026-01-15");
/// assert_eq!(assembly.shifts[0].completion, Completion::Manual);
/// ```
pub fn assemble(
    punches: &[Punch],
    open_shifts: OpenShifts,
    guard: &DurationGuard,
    policy: &AutoCompletionPolicy,
) -> Assembly {
    let mut assembly = Assembly::carrying(open_shifts);
    for punch in punches {
        assemble_punch(&mut assembly, punch, guard, policy);
    }
    assembly
}

/// Applies one punch to an assembly in progress.
pub fn assemble_punch(
    assembly: &mut Assembly,
    punch: &Punch,
    guard: &DurationGuard,
    policy: &AutoCompletionPolicy,
) {
    match punch.direction {
        Direction::In => check_in(assembly, punch, policy),
        Direction::Out => check_out(assembly, punch, guard),
    }
}

fn check_in(assembly: &mut Assembly, punch: &Punch, policy: &AutoCompletionPolicy) {
    if let Some(open) = assembly.open_shifts.get(&punch.employee_id) {
        if !policy.is_due(open, punch.timestamp) {
            debug!(
                employee_id = %punch.employee_id,
                source_record_id = %punch.source_record_id,
                "Ignoring check-in while a shift is open"
            );
            assembly.counts.duplicate_checkins += 1;
            return;
        }

        // The stale shift closes at its cutoff before the new one opens.
        match policy.complete(open) {
            Ok(completed) => {
                assembly.counts.shifts_auto_closed += 1;
                assembly.shifts.push(completed);
            }
            Err(error) => {
                warn!(error = %error, "Could not auto-complete superseded shift");
                assembly.discrepancies.push(Discrepancy::from_error(&error));
                return;
            }
        }
    }

    debug!(
        employee_id = %punch.employee_id,
        shift_date = %punch.date(),
        source_record_id = %punch.source_record_id,
        "Opening shift"
    );
    assembly
        .open_shifts
        .insert(punch.employee_id.clone(), ShiftRecord::open(punch));
    assembly.counts.shifts_opened += 1;
}

fn check_out(assembly: &mut Assembly, punch: &Punch, guard: &DurationGuard) {
    let Some(open) = assembly.open_shifts.get_mut(&punch.employee_id) else {
        debug!(
            employee_id = %punch.employee_id,
            source_record_id = %punch.source_record_id,
            "Ignoring checkout with no open shift"
        );
        assembly.counts.orphan_checkouts += 1;
        return;
    };

    if let Err(error) = guard.check(open, punch).and_then(|()| open.close_manual(punch)) {
        warn!(
            source_record_id = %punch.source_record_id,
            error = %error,
            "Refusing checkout; shift stays open"
        );
        if matches!(
            error,
            EngineError::DurationGuardExceeded { .. } | EngineError::ShiftTooShort { .. }
        ) {
            assembly.counts.duration_guard_rejections += 1;
        }
        assembly
            .discrepancies
            .push(Discrepancy::from_error(&error).with_record(punch.source_record_id.clone()));
        return;
    }

    if let Some(closed) = assembly.open_shifts.remove(&punch.employee_id) {
        debug!(
            employee_id = %closed.employee_id,
            shift_date = %closed.shift_date,
            source_record_id = %punch.source_record_id,
            "Closed shift"
        );
        assembly.counts.shifts_closed += 1;
        assembly.shifts.push(closed);
    }
}
