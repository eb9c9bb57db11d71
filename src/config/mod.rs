//! Configuration loading and management for the attendance reconciler.
//!
//! This module loads the reconciliation configuration from a YAML file:
//! the day-start boundary, the default shift schedule, shift-length guards,
//! the processing floor and the retry policy for port calls.
//!
//! # Example
//!
//! ```no_run
//! use attendance_reconciler::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load("./config/reconciler.yaml").unwrap();
//! println!("Auto-checkout boundary: {}", loader.config().day_start_boundary);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{ReconConfig, RetryPolicy, ShiftSchedule};
