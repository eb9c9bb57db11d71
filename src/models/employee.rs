//! Employee profile model.
//!
//! This module defines the [`EmployeeProfile`] returned by the employee
//! directory: whether an employee's punches are accepted at all, whether
//! they can earn overtime, and an optional schedule override.

use serde::{Deserialize, Serialize};

use crate::config::ShiftSchedule;

/// Directory facts about one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    /// Unique identifier for the employee.
    pub employee_id: String,
    /// Punches from inactive employees are dropped as malformed.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Whether a late checkout may be classified as overtime.
    #[serde(default = "default_true")]
    pub overtime_allowed: bool,
    /// Per-employee schedule; the configured default applies when absent.
    #[serde(default)]
    pub schedule: Option<ShiftSchedule>,
}

fn default_true() -> bool {
    true
}

impl EmployeeProfile {
    /// Creates an active, overtime-eligible profile on the default schedule.
    pub fn new(employee_id: impl Into<String>) -> Self {
        Self {
            employee_id: employee_id.into(),
            active: true,
            overtime_allowed: true,
            schedule: None,
        }
    }

    /// Returns the employee's own schedule, or `default` if they have none.
    ///
    /// # Examples
    ///
    /// ```
    /// use attendance_reconciler::config::ShiftSchedule;
    /// use attendance_reconciler::models::EmployeeProfile;
    ///
    /// let default = ShiftSchedule::default();
    /// let profile = EmployeeProfile::new("E1");
    /// assert_eq!(profile.schedule_or(&default), &default);
    /// ```
    pub fn schedule_or<'a>(&'a self, default: &'a ShiftSchedule) -> &'a ShiftSchedule {
        self.schedule.as_ref().unwrap_or(default)
    }
}
