//! In-memory port implementations.
//!
//! These back the tests and benchmarks, and suit embedders that keep the
//! ledger in process. Each can be told to fail its next calls, for
//! exercising retry and watermark behavior.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, RwLock};

use crate::models::{Completion, EmployeeProfile, RawPunch, ShiftRecord, Watermark};

use super::ports::{EmployeeDirectory, LedgerSink, PortError, PunchSource};

/// A queue of errors to return from upcoming calls.
#[derive(Debug, Default)]
pub struct FaultQueue {
    pending: Mutex<VecDeque<PortError>>,
}

impl FaultQueue {
    /// Makes the next call fail with `error`.
    pub async fn push(&self, error: PortError) {
        self.pending.lock().await.push_back(error);
    }

    /// Makes the next `count` calls fail with `error`.
    pub async fn push_many(&self, error: PortError, count: usize) {
        let mut pending = self.pending.lock().await;
        pending.extend(std::iter::repeat_n(error, count));
    }

    async fn take(&self) -> Result<(), PortError> {
        match self.pending.lock().await.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// A punch log held in memory.
#[derive(Debug, Default)]
pub struct InMemoryPunchSource {
    punches: RwLock<Vec<RawPunch>>,
    faults: FaultQueue,
}

impl InMemoryPunchSource {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log holding `punches`.
    pub fn with_punches(punches: impl IntoIterator<Item = RawPunch>) -> Self {
        Self {
            punches: RwLock::new(punches.into_iter().collect()),
            faults: FaultQueue::default(),
        }
    }

    /// Appends punches to the log.
    pub async fn append(&self, punches: impl IntoIterator<Item = RawPunch>) {
        self.punches.write().await.extend(punches);
    }

    /// Failures to inject into upcoming fetches.
    pub fn faults(&self) -> &FaultQueue {
        &self.faults
    }
}

#[async_trait]
impl PunchSource for InMemoryPunchSource {
    async fn fetch_punches_since(&self, watermark: Watermark) -> Result<Vec<RawPunch>, PortError> {
        self.faults.take().await?;
        let punches = self.punches.read().await;

        // Records without a readable timestamp can only be served to a first run.
        Ok(match watermark.timestamp() {
            None => punches.clone(),
            Some(since) => punches
                .iter()
                .filter(|raw| raw.recorded_at().is_some_and(|at| at > since))
                .cloned()
                .collect(),
        })
    }

    async fn fetch_punches_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawPunch>, PortError> {
        self.faults.take().await?;
        let punches = self.punches.read().await;

        Ok(punches
            .iter()
            .filter(|raw| raw.recorded_at().is_some_and(|at| at.date() >= from && at.date() <= to))
            .cloned()
            .collect())
    }
}

/// A ledger held in memory, keyed by (employee, shift date).
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: RwLock<BTreeMap<(String, NaiveDate), ShiftRecord>>,
    write_faults: FaultQueue,
    writes: AtomicU64,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` directly, bypassing fault injection and the write count.
    pub async fn seed(&self, record: ShiftRecord) {
        self.records.write().await.insert(record.key(), record);
    }

    /// A snapshot of every record in key order.
    pub async fn records(&self) -> Vec<ShiftRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// The record for one key.
    pub async fn get(&self, employee_id: &str, shift_date: NaiveDate) -> Option<ShiftRecord> {
        self.records
            .read()
            .await
            .get(&(employee_id.to_string(), shift_date))
            .cloned()
    }

    /// Successful upserts so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Failures to inject into upcoming upserts.
    pub fn write_faults(&self) -> &FaultQueue {
        &self.write_faults
    }
}

#[async_trait]
impl LedgerSink for InMemoryLedger {
    async fn upsert_shift(&self, record: ShiftRecord) -> Result<(), PortError> {
        self.write_faults.take().await?;
        self.records.write().await.insert(record.key(), record);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn open_shifts(&self) -> Result<Vec<ShiftRecord>, PortError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.completion == Completion::Open)
            .cloned()
            .collect())
    }

    async fn shifts_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ShiftRecord>, PortError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.shift_date >= from && record.shift_date <= to)
            .cloned()
            .collect())
    }
}

/// An employee directory held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    profiles: RwLock<HashMap<String, EmployeeProfile>>,
}

impl InMemoryDirectory {
    /// Creates a directory holding `profiles`.
    pub fn with_profiles(profiles: impl IntoIterator<Item = EmployeeProfile>) -> Self {
        Self {
            profiles: RwLock::new(
                profiles
                    .into_iter()
                    .map(|profile| (profile.employee_id.clone(), profile))
                    .collect(),
            ),
        }
    }

    /// Adds or replaces a profile.
    pub async fn upsert(&self, profile: EmployeeProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.employee_id.clone(), profile);
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryDirectory {
    async fn profiles(
        &self,
        employee_ids: &[String],
    ) -> Result<HashMap<String, EmployeeProfile>, PortError> {
        let profiles = self.profiles.read().await;
        Ok(employee_ids
            .iter()
            .filter_map(|id| profiles.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }
}
