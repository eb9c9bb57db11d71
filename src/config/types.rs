//! Configuration types for attendance reconciliation.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from the YAML configuration file.

use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The reference schedule punches are classified against.
///
/// A schedule whose `end` is not after its `start` is an overnight schedule:
/// the scheduled end falls on the day after the shift date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftSchedule {
    /// Scheduled start of the shift.
    pub start: NaiveTime,
    /// Scheduled end of the shift.
    pub end: NaiveTime,
    /// Minutes after `start` a check-in still counts as on time.
    #[serde(default = "default_grace_period_minutes")]
    pub grace_period_minutes: u32,
    /// Minutes after `end` a checkout still counts as on time rather than overtime.
    #[serde(default)]
    pub checkout_tolerance_minutes: u32,
}

fn default_grace_period_minutes() -> u32 {
    10
}

impl ShiftSchedule {
    /// Returns true if the scheduled end falls on the next calendar day.
    pub fn is_overnight(&self) -> bool {
        self.end <= self.start
    }

    /// The scheduled start for a shift on `shift_date`.
    pub fn scheduled_start(&self, shift_date: NaiveDate) -> NaiveDateTime {
        shift_date.and_time(self.start)
    }

    /// The scheduled end for a shift on `shift_date`.
    pub fn scheduled_end(&self, shift_date: NaiveDate) -> NaiveDateTime {
        let end = shift_date.and_time(self.end);
        if self.is_overnight() {
            end + Duration::days(1)
        } else {
            end
        }
    }

    /// The grace period as a duration.
    pub fn grace_period(&self) -> Duration {
        Duration::minutes(i64::from(self.grace_period_minutes))
    }

    /// The checkout tolerance as a duration.
    pub fn checkout_tolerance(&self) -> Duration {
        Duration::minutes(i64::from(self.checkout_tolerance_minutes))
    }
}

impl Default for ShiftSchedule {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            grace_period_minutes: default_grace_period_minutes(),
            checkout_tolerance_minutes: 0,
        }
    }
}

/// Bounded exponential backoff for punch-source and ledger calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Growth factor per attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    2.0
}

impl RetryPolicy {
    /// A policy that retries without sleeping, for tests and benchmarks.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
        }
    }

    /// The delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// # Example
    ///
    /// ```
    /// use attendance_reconciler::config::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy {
    ///     max_attempts: 5,
    ///     initial_delay_ms: 100,
    ///     max_delay_ms: 300,
    ///     multiplier: 2.0,
    /// };
    /// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
    /// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
    /// assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300)); // capped
    /// ```
    pub fn delay_for_attempt(&self, attempt: u32) -> StdDuration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = delay_ms.min(self.max_delay_ms as f64);
        StdDuration::from_millis(capped as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            multiplier: default_multiplier(),
        }
    }
}

/// The complete reconciliation configuration.
///
/// Static for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Time of day that separates "late last night" from "this morning".
    ///
    /// Check-ins before it may be reclassified as a previous shift's
    /// checkout, and an open shift is auto-completed at this time on the
    /// day after its shift date.
    pub day_start_boundary: NaiveTime,
    /// Default schedule for classification.
    #[serde(default)]
    pub shift_schedule: ShiftSchedule,
    /// Longest plausible shift; longer pairings are rejected.
    #[serde(default = "default_max_shift_duration_hours")]
    pub max_shift_duration_hours: u32,
    /// Shortest plausible same-day shift; `None` disables the check.
    #[serde(default)]
    pub min_shift_duration_minutes: Option<u32>,
    /// Earliest shift date the engine will ever reprocess.
    #[serde(default)]
    pub processing_floor: Option<NaiveDate>,
    /// Backoff for source and sink calls.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_max_shift_duration_hours() -> u32 {
    24
}

impl ReconConfig {
    /// The maximum shift duration as a duration.
    pub fn max_shift_duration(&self) -> Duration {
        Duration::hours(i64::from(self.max_shift_duration_hours))
    }

    /// The minimum same-day shift duration, if configured.
    pub fn min_shift_duration(&self) -> Option<Duration> {
        self.min_shift_duration_minutes
            .map(|minutes| Duration::minutes(i64::from(minutes)))
    }

    /// Checks that the configuration can drive a run.
    ///
    /// Returns [`EngineError::ConfigurationError`] naming the first bad field.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |field: &str, message: &str| EngineError::ConfigurationError {
            field: field.to_string(),
            message: message.to_string(),
        };

        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
        if self.day_start_boundary >= noon {
            return Err(invalid("day_start_boundary", "must be before 12:00:00"));
        }
        if self.max_shift_duration_hours == 0 || self.max_shift_duration_hours > 48 {
            return Err(invalid(
                "max_shift_duration_hours",
                "must be between 1 and 48",
            ));
        }
        if let Some(min) = self.min_shift_duration() {
            if min >= self.max_shift_duration() {
                return Err(invalid(
                    "min_shift_duration_minutes",
                    "must be shorter than max_shift_duration_hours",
                ));
            }
        }
        if self.shift_schedule.start == self.shift_schedule.end {
            return Err(invalid("shift_schedule", "start and end must differ"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if !(self.retry.multiplier >= 1.0) {
            return Err(invalid("retry.multiplier", "must be at least 1.0"));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(invalid(
                "retry.initial_delay_ms",
                "must not exceed retry.max_delay_ms",
            ));
        }
        Ok(())
    }
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            day_start_boundary: NaiveTime::from_hms_opt(5, 0, 0).unwrap_or(NaiveTime::MIN),
            shift_schedule: ShiftSchedule::default(),
            max_shift_duration_hours: default_max_shift_duration_hours(),
            min_shift_duration_minutes: None,
            processing_floor: None,
            retry: RetryPolicy::default(),
        }
    }
}
