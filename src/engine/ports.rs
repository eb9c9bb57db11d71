//! Interfaces to the engine's collaborators.
//!
//! The engine never talks to a database or device log directly; it calls
//! these async traits. Implementations decide what "transient" means for
//! their backend; only transient errors are retried.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{EmployeeProfile, RawPunch, ShiftRecord, Watermark};

/// Whether a failed port call is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortErrorKind {
    /// Timeouts, dropped connections, throttling.
    Transient,
    /// Rejected requests that will fail the same way again.
    Permanent,
}

/// A failed call to a punch source, ledger or directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PortError {
    /// Whether to retry.
    pub kind: PortErrorKind,
    /// What the backend reported.
    pub message: String,
}

impl PortError {
    /// A failure worth retrying.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: PortErrorKind::Transient,
            message: message.into(),
        }
    }

    /// A failure that will not go away on retry.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: PortErrorKind::Permanent,
            message: message.into(),
        }
    }

    /// Returns true for [`PortErrorKind::Transient`].
    pub fn is_transient(&self) -> bool {
        self.kind == PortErrorKind::Transient
    }
}

/// The append-only log of raw biometric punches.
#[async_trait]
pub trait PunchSource: Send + Sync {
    /// Punches whose timestamp is strictly after `watermark`, or every punch
    /// when the watermark is empty.
    async fn fetch_punches_since(&self, watermark: Watermark) -> Result<Vec<RawPunch>, PortError>;

    /// Punches whose timestamp falls on a date in `[from, to]`.
    async fn fetch_punches_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawPunch>, PortError>;
}

/// The derived attendance ledger.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    /// Inserts or replaces the record keyed by `(employee_id, shift_date)`.
    ///
    /// Writing the same record twice must leave the ledger unchanged.
    async fn upsert_shift(&self, record: ShiftRecord) -> Result<(), PortError>;

    /// Every record whose completion is OPEN.
    async fn open_shifts(&self) -> Result<Vec<ShiftRecord>, PortError>;

    /// Every record whose shift date falls in `[from, to]`.
    async fn shifts_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ShiftRecord>, PortError>;
}

/// Employee master data.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Profiles for the requested ids; unknown ids are simply absent.
    async fn profiles(
        &self,
        employee_ids: &[String],
    ) -> Result<HashMap<String, EmployeeProfile>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_kinds() {
        assert!(PortError::transient("timeout").is_transient());
        assert!(!PortError::permanent("bad request").is_transient());
    }

    #[test]
    fn test_port_error_displays_message() {
        assert_eq!(
            PortError::transient("connection reset").to_string(),
            "connection reset"
        );
    }

    #[test]
    fn test_ports_are_object_safe() {
        fn assert_object_safe(
            _: Option<&dyn PunchSource>,
            _: Option<&dyn LedgerSink>,
            _: Option<&dyn EmployeeDirectory>,
        ) {
        }
        assert_object_safe(None, None, None);
    }
}
