//! Orchestration of reconciliation runs.
//!
//! This module owns everything that touches the outside world: the port
//! traits the engine reads and writes through, retry of those calls,
//! per-tenant run locks, in-memory port implementations, and the
//! [`ReconciliationEngine`] that ties them to the pure steps in
//! [`crate::reconciliation`].

mod locks;
mod memory;
mod ports;
mod reconciler;
mod retry;

pub use locks::{TenantGuard, TenantLocks};
pub use memory::{FaultQueue, InMemoryDirectory, InMemoryLedger, InMemoryPunchSource};
pub use ports::{EmployeeDirectory, LedgerSink, PortError, PortErrorKind, PunchSource};
pub use reconciler::ReconciliationEngine;
pub use retry::{RetryFailure, retry};
