//! Punch normalization.
//!
//! This module validates and repairs a raw punch stream before the
//! assembler interprets it. Parsing and duplicate-event collapse run first,
//! then four repair rules run per employee, in this order of precedence,
//! while tracking the employee's unresolved check-in:
//!
//! 1. Orphan checkout removal
//! 2. Chronological repair (checkout not after its check-in is deferred)
//! 3. Early-morning check-in reclassified as the previous shift's checkout
//! 4. Duplicate check-in collapse
//!
//! Nothing here is fatal: every repair is counted and reported as a
//! [`Discrepancy`].

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{Direction, Discrepancy, EmployeeProfile, Punch, RawPunch, RunCounts, Severity};

use super::auto_completion::cutoff;

/// Inputs the normalizer needs besides the punches themselves.
#[derive(Debug, Clone)]
pub struct NormalizerContext<'a> {
    /// Time of day separating late last night from this morning.
    pub day_start_boundary: NaiveTime,
    /// Known employees. When present, punches from unknown or inactive
    /// employees are malformed; when absent, every employee is accepted.
    pub roster: Option<&'a HashMap<String, EmployeeProfile>>,
    /// Check-in times of shifts opened before this batch, per employee.
    pub open_checkins: HashMap<String, NaiveDateTime>,
}

impl<'a> NormalizerContext<'a> {
    /// A context with no roster and no carried check-ins.
    pub fn new(day_start_boundary: NaiveTime) -> Self {
        Self {
            day_start_boundary,
            roster: None,
            open_checkins: HashMap::new(),
        }
    }

    /// Restricts accepted punches to active employees in `roster`.
    pub fn with_roster(mut self, roster: &'a HashMap<String, EmployeeProfile>) -> Self {
        self.roster = Some(roster);
        self
    }

    /// Seeds an employee's unresolved check-in.
    pub fn with_open_checkin(mut self, employee_id: impl Into<String>, at: NaiveDateTime) -> Self {
        self.open_checkins.insert(employee_id.into(), at);
        self
    }

    fn attribute(&self, punch: Punch) -> EngineResult<Punch> {
        let Some(roster) = self.roster else {
            return Ok(punch);
        };
        let reason = match roster.get(&punch.employee_id) {
            Some(profile) if profile.active => return Ok(punch),
            Some(_) => "inactive employee",
            None => "unknown employee",
        };
        Err(EngineError::MalformedPunch {
            source_record_id: punch.source_record_id.clone(),
            message: format!("{} '{}'", reason, punch.employee_id),
        })
    }
}

/// The output of [`normalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    /// Cleaned punches ordered by employee, time, IN before OUT, then id.
    pub punches: Vec<Punch>,
    /// Checkouts set aside by chronological repair.
    ///
    /// Their check-in stays unresolved so a later checkout can close it.
    /// Each one is also reported as an ordering discrepancy.
    pub deferred: Vec<Punch>,
    /// Everything that was dropped or repaired.
    pub discrepancies: Vec<Discrepancy>,
    /// Tallies for the normalization counters.
    pub counts: RunCounts,
}

/// Validates and repairs a raw punch stream.
///
/// The result does not depend on the order of `raw`.
///
/// # Example
///
/// ```
/// use attendance_reconciler::models::{Direction, RawPunch};
/// use attendance_reconciler::reconciliation::{normalize, NormalizerContext};
/// use chrono::NaiveTime;
///
/// let raw = vec![
///     RawPunch::new("r1", "E1", "in", "2026-01-15 22:00:00"),
///     RawPunch::new("r2", "E1", "in", "2026-01-16 03:00:00"),
/// ];
/// let ctx = NormalizerContext::new(NaiveTime::from_hms_opt(5, 0, 0).unwrap());
///
/// let batch = normalize(&raw, &ctx);
/// assert_eq!(batch.punches[1].direction, Direction::Out);
/// assert_eq!(batch.counts.reclassified_checkouts, 1);
/// ```
pub fn normalize(raw: &[RawPunch], ctx: &NormalizerContext<'_>) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    // Step 0a: parse and attribute
    let mut parsed = Vec::with_capacity(raw.len());
    for record in raw {
        if record.is_break() {
            debug!(source_record_id = %record.source_record_id, "Skipping break punch");
            batch.counts.break_punches_skipped += 1;
            continue;
        }
        match record.parse().and_then(|punch| ctx.attribute(punch)) {
            Ok(punch) => parsed.push(punch),
            Err(error) => {
                warn!(
                    source_record_id = %record.source_record_id,
                    error = %error,
                    "Dropping malformed punch"
                );
                batch.counts.malformed_dropped += 1;
                batch.discrepancies.push(Discrepancy::from_error(&error));
            }
        }
    }

    // Step 0b: one punch per physical event
    parsed.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    let mut seen = HashSet::with_capacity(parsed.len());
    let mut duplicate_events = 0;
    parsed.retain(|punch| {
        let first = seen.insert(punch.source_record_id.clone());
        if !first {
            debug!(source_record_id = %punch.source_record_id, "Collapsing duplicate punch event");
            duplicate_events += 1;
        }
        first
    });
    batch.counts.duplicate_events = duplicate_events;

    // Steps 1-4, per employee
    for punches in parsed.chunk_by(|a, b| a.employee_id == b.employee_id) {
        let seed = punches
            .first()
            .and_then(|p| ctx.open_checkins.get(&p.employee_id).copied());
        normalize_employee(punches, seed, ctx.day_start_boundary, &mut batch);
    }

    batch.punches.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    batch
}

fn normalize_employee(
    punches: &[Punch],
    seed: Option<NaiveDateTime>,
    day_start_boundary: NaiveTime,
    batch: &mut NormalizedBatch,
) {
    let mut unresolved = seed;

    for (index, punch) in punches.iter().enumerate() {
        match (punch.direction, unresolved) {
            (Direction::Out, None) => {
                debug!(
                    employee_id = %punch.employee_id,
                    source_record_id = %punch.source_record_id,
                    "Removing orphan checkout"
                );
                batch.counts.orphan_checkouts += 1;
                batch.discrepancies.push(
                    Discrepancy::new(
                        "ORPHAN_CHECKOUT",
                        format!("Checkout at {} has no open check-in", punch.timestamp),
                        Severity::Info,
                    )
                    .for_employee(punch.employee_id.clone())
                    .with_record(punch.source_record_id.clone())
                    .on_date(punch.date()),
                );
            }
            (Direction::Out, Some(checkin)) if punch.timestamp <= checkin => {
                let error = EngineError::OrderingViolation {
                    employee_id: punch.employee_id.clone(),
                    checkin_time: checkin,
                    checkout_time: punch.timestamp,
                };
                warn!(source_record_id = %punch.source_record_id, error = %error, "Deferring checkout");
                batch.counts.ordering_deferred += 1;
                batch.discrepancies.push(
                    Discrepancy::from_error(&error).with_record(punch.source_record_id.clone()),
                );
                batch.deferred.push(punch.clone());
            }
            (Direction::Out, Some(_)) => {
                batch.punches.push(punch.clone());
                unresolved = None;
            }
            (Direction::In, None) => {
                batch.punches.push(punch.clone());
                unresolved = Some(punch.timestamp);
            }
            (Direction::In, Some(checkin)) => {
                if is_early_morning_checkout(punch, checkin, &punches[index + 1..], day_start_boundary)
                {
                    debug!(
                        employee_id = %punch.employee_id,
                        source_record_id = %punch.source_record_id,
                        "Reclassifying early-morning check-in as checkout"
                    );
                    batch.counts.reclassified_checkouts += 1;
                    batch.discrepancies.push(
                        Discrepancy::new(
                            "RECLASSIFIED_CHECKOUT",
                            format!(
                                "Check-in at {} closes the shift opened at {}",
                                punch.timestamp, checkin
                            ),
                            Severity::Info,
                        )
                        .for_employee(punch.employee_id.clone())
                        .with_record(punch.source_record_id.clone())
                        .on_date(checkin.date()),
                    );
                    batch.punches.push(Punch {
                        direction: Direction::Out,
                        ..punch.clone()
                    });
                    unresolved = None;
                } else if punch.timestamp >= cutoff(checkin.date(), day_start_boundary) {
                    // The earlier check-in can no longer be closed by a checkout.
                    batch.punches.push(punch.clone());
                    unresolved = Some(punch.timestamp);
                } else {
                    debug!(
                        employee_id = %punch.employee_id,
                        source_record_id = %punch.source_record_id,
                        "Collapsing duplicate check-in"
                    );
                    batch.counts.duplicate_checkins += 1;
                    batch.discrepancies.push(
                        Discrepancy::new(
                            "DUPLICATE_CHECKIN",
                            format!(
                                "Check-in at {} repeats the check-in at {}",
                                punch.timestamp, checkin
                            ),
                            Severity::Info,
                        )
                        .for_employee(punch.employee_id.clone())
                        .with_record(punch.source_record_id.clone())
                        .on_date(checkin.date()),
                    );
                }
            }
        }
    }
}

/// An IN before the boundary on day D, with an unresolved IN from D-1 and no
/// checkout later on D, is really the night shift's checkout.
fn is_early_morning_checkout(
    punch: &Punch,
    unresolved_checkin: NaiveDateTime,
    later: &[Punch],
    day_start_boundary: NaiveTime,
) -> bool {
    let date = punch.date();
    punch.timestamp.time() < day_start_boundary
        && unresolved_checkin.date().succ_opt() == Some(date)
        && !later
            .iter()
            .any(|p| p.direction == Direction::Out && p.date() == date)
}
