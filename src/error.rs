//! Error types for the attendance reconciler.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every error condition that can occur while reconciling punches.
//! Some variants are recovered locally and surface only as discrepancies in
//! the run summary; [`EngineError::is_fatal`] tells the two groups apart.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// The main error type for the attendance reconciler.
///
/// # Example
///
/// ```
/// use attendance_reconciler::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/reconciler.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/reconciler.yaml");
/// assert!(error.is_fatal());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Configuration parsed but holds a value the engine cannot run with.
    #[error("Invalid configuration field '{field}': {message}")]
    ConfigurationError {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// A raw punch could not be turned into a usable punch.
    #[error("Malformed punch '{source_record_id}': {message}")]
    MalformedPunch {
        /// The source record id of the rejected punch.
        source_record_id: String,
        /// Why the punch was rejected.
        message: String,
    },

    /// A checkout does not come strictly after the check-in it would close.
    #[error(
        "Checkout at {checkout_time} for employee '{employee_id}' does not follow check-in at {checkin_time}"
    )]
    OrderingViolation {
        /// The employee the punches belong to.
        employee_id: String,
        /// The check-in timestamp of the open shift.
        checkin_time: NaiveDateTime,
        /// The offending checkout timestamp.
        checkout_time: NaiveDateTime,
    },

    /// Pairing a checkout would produce a shift longer than the guard allows.
    #[error(
        "Shift for employee '{employee_id}' on {shift_date} would last {elapsed_minutes} minutes, over the {limit_minutes} minute limit"
    )]
    DurationGuardExceeded {
        /// The employee the shift belongs to.
        employee_id: String,
        /// The logical shift date.
        shift_date: NaiveDate,
        /// Minutes between check-in and the candidate checkout.
        elapsed_minutes: i64,
        /// The configured maximum.
        limit_minutes: i64,
    },

    /// Pairing a same-day checkout would produce an implausibly short shift.
    #[error(
        "Shift for employee '{employee_id}' on {shift_date} would last {elapsed_minutes} minutes, under the {limit_minutes} minute minimum"
    )]
    ShiftTooShort {
        /// The employee the shift belongs to.
        employee_id: String,
        /// The logical shift date.
        shift_date: NaiveDate,
        /// Minutes between check-in and the candidate checkout.
        elapsed_minutes: i64,
        /// The configured minimum.
        limit_minutes: i64,
    },

    /// A shift was asked to make a lifecycle transition its state forbids.
    #[error("Shift for employee '{employee_id}' on {shift_date} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The employee the shift belongs to.
        employee_id: String,
        /// The logical shift date.
        shift_date: NaiveDate,
        /// The current state.
        from: String,
        /// The requested state.
        to: String,
    },

    /// The ledger sink rejected a write and the retry budget is spent.
    #[error(
        "Ledger write failed for employee '{employee_id}' on {shift_date} after {attempts} attempt(s): {message}"
    )]
    SinkWriteFailure {
        /// The employee of the record being written.
        employee_id: String,
        /// The shift date of the record being written.
        shift_date: NaiveDate,
        /// How many attempts were made.
        attempts: u32,
        /// The last error reported by the sink.
        message: String,
    },

    /// A read from the punch source, ledger or directory failed for good.
    #[error("Failed to read from {port} after {attempts} attempt(s): {message}")]
    SourceFetchFailure {
        /// Which port failed ("punch source", "ledger", "employee directory").
        port: String,
        /// How many attempts were made.
        attempts: u32,
        /// The last error reported by the port.
        message: String,
    },

    /// Another run already holds the tenant's lock.
    #[error("A reconciliation run is already in progress for tenant '{tenant_id}'")]
    RunInProgress {
        /// The tenant whose run is in flight.
        tenant_id: String,
    },

    /// A reprocessing range was empty or inverted.
    #[error("Invalid date range {from} to {to}: {message}")]
    InvalidRange {
        /// The requested start date.
        from: NaiveDate,
        /// The requested end date.
        to: NaiveDate,
        /// Why the range was rejected.
        message: String,
    },
}

impl EngineError {
    /// Returns true if this error aborts a run.
    ///
    /// Punch-level and pairing-level errors are recovered by leaving the
    /// affected shift in its previous state; everything touching
    /// configuration, ports or locking escalates to the caller.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EngineError::MalformedPunch { .. }
                | EngineError::OrderingViolation { .. }
                | EngineError::DurationGuardExceeded { .. }
                | EngineError::ShiftTooShort { .. }
                | EngineError::InvalidTransition { .. }
        )
    }

    /// A stable machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            EngineError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            EngineError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            EngineError::MalformedPunch { .. } => "MALFORMED_PUNCH",
            EngineError::OrderingViolation { .. } => "ORDERING_VIOLATION",
            EngineError::DurationGuardExceeded { .. } => "DURATION_GUARD_EXCEEDED",
            EngineError::ShiftTooShort { .. } => "SHIFT_TOO_SHORT",
            EngineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EngineError::SinkWriteFailure { .. } => "SINK_WRITE_FAILURE",
            EngineError::SourceFetchFailure { .. } => "SOURCE_FETCH_FAILURE",
            EngineError::RunInProgress { .. } => "RUN_IN_PROGRESS",
            EngineError::InvalidRange { .. } => "INVALID_RANGE",
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
