//! Core data models for the attendance reconciler.
//!
//! This module contains all the domain models used throughout the engine.

mod date_window;
mod employee;
mod punch;
mod run_summary;
mod shift_record;
mod watermark;

pub use date_window::DateWindow;
pub use employee::EmployeeProfile;
pub use punch::{Direction, Punch, RawPunch};
pub use run_summary::{Discrepancy, RunCounts, RunMode, RunSummary, Severity};
pub use shift_record::{CheckinStatus, CheckoutStatus, Completion, MigrationStatus, ShiftRecord};
pub use watermark::Watermark;
