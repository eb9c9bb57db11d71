//! Punch status classification.
//!
//! This module classifies a shift's check-in as on time or late, and its
//! checkout as early, on time, overtime or automatic, against a
//! [`ShiftSchedule`].

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::config::ShiftSchedule;
use crate::models::{CheckinStatus, CheckoutStatus, Completion, EmployeeProfile, ShiftRecord};

/// Classifies a check-in against the schedule for `shift_date`.
///
/// On time means no later than the scheduled start plus the grace period.
///
/// # Example
///
/// ```
/// use attendance_reconciler::config::ShiftSchedule;
/// use attendance_reconciler::models::CheckinStatus;
/// use attendance_reconciler::reconciliation::classify_checkin;
/// use chrono::{NaiveDate, NaiveDateTime};
///
/// let schedule = ShiftSchedule::default(); // 09:00-17:00, 10 minute grace
/// let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
/// let at = NaiveDateTime::parse_from_str("2026-01-15 09:10:00", "%Y-%m-%d %H:%M:%S").unwrap();
///
/// assert_eq!(classify_checkin(at, date, &schedule), CheckinStatus::OnTime);
/// ```
pub fn classify_checkin(
    checkin_time: NaiveDateTime,
    shift_date: NaiveDate,
    schedule: &ShiftSchedule,
) -> CheckinStatus {
    if checkin_time <= schedule.scheduled_start(shift_date) + schedule.grace_period() {
        CheckinStatus::OnTime
    } else {
        CheckinStatus::Late
    }
}

/// Classifies a real checkout against the schedule for `shift_date`.
///
/// A checkout past the tolerance window is overtime only for employees
/// allowed to earn it; everyone else is recorded as on time.
pub fn classify_checkout(
    checkout_time: NaiveDateTime,
    shift_date: NaiveDate,
    schedule: &ShiftSchedule,
    overtime_allowed: bool,
) -> CheckoutStatus {
    let scheduled_end = schedule.scheduled_end(shift_date);

    if checkout_time < scheduled_end {
        CheckoutStatus::Early
    } else if checkout_time <= scheduled_end + schedule.checkout_tolerance() {
        CheckoutStatus::OnTime
    } else if overtime_allowed {
        CheckoutStatus::Overtime
    } else {
        CheckoutStatus::OnTime
    }
}

/// Fills in both statuses of `shift`.
///
/// The employee's own schedule applies when their profile has one, the
/// `default_schedule` otherwise. Without a profile the employee is treated
/// as overtime-eligible. An auto-closed shift always gets [`CheckoutStatus::Auto`].
pub fn classify_shift(
    shift: &mut ShiftRecord,
    profile: Option<&EmployeeProfile>,
    default_schedule: &ShiftSchedule,
) {
    let schedule = profile.map_or(default_schedule, |p| p.schedule_or(default_schedule));
    let overtime_allowed = profile.is_none_or(|p| p.overtime_allowed);

    shift.checkin_status = Some(classify_checkin(
        shift.checkin_time,
        shift.shift_date,
        schedule,
    ));

    shift.checkout_status = match (shift.completion, shift.checkout_time) {
        (Completion::AutoClosed, _) => Some(CheckoutStatus::Auto),
        (_, Some(checkout)) => Some(classify_checkout(
            checkout,
            shift.shift_date,
            schedule,
            overtime_allowed,
        )),
        (_, None) => None,
    };

    debug!(
        employee_id = %shift.employee_id,
        shift_date = %shift.shift_date,
        checkin_status = ?shift.checkin_status,
        checkout_status = ?shift.checkout_status,
        "Classified shift"
    );
}
