//! The reconciliation engine.
//!
//! [`ReconciliationEngine`] is the only component that performs I/O. For
//! each run it reads punches, open shifts and employee profiles through the
//! ports, drives the pure steps in [`crate::reconciliation`] over a window of
//! shift dates, and writes the records that changed back to the ledger.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::ReconConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    DateWindow, Direction, Discrepancy, MigrationStatus, Punch, RawPunch, RunCounts, RunMode,
    RunSummary, Severity, ShiftRecord, Watermark,
};
use crate::reconciliation::{
    Assembly, AutoCompletionPolicy, Candidate, DurationGuard, NormalizerContext, OpenShifts,
    assemble_punch, classify_shift, dedup, normalize,
};

use super::locks::TenantLocks;
use super::ports::{EmployeeDirectory, LedgerSink, PortError, PunchSource};
use super::retry::retry;

/// Reconciles one tenant's punch log into its attendance ledger.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use attendance_reconciler::config::ReconConfig;
/// use attendance_reconciler::engine::{
///     InMemoryDirectory, InMemoryLedger, InMemoryPunchSource, ReconciliationEngine,
/// };
/// use attendance_reconciler::models::{Completion, EmployeeProfile, RawPunch, Watermark};
/// use chrono::NaiveDateTime;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let source = Arc::new(InMemoryPunchSource::with_punches(vec![
///     RawPunch::new("r1", "E1", "in", "2026-01-15 22:30:00"),
///     RawPunch::new("r2", "E1", "out", "2026-01-16 03:45:00"),
/// ]));
/// let ledger = Arc::new(InMemoryLedger::new());
/// let directory = Arc::new(InMemoryDirectory::with_profiles(vec![EmployeeProfile::new("E1")]));
///
/// let engine =
///     ReconciliationEngine::new(ReconConfig::default(), source, ledger.clone(), directory).unwrap();
/// let now = NaiveDateTime::parse_from_str("2026-01-16 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
///
/// let summary = engine.run_incremental("acme", Watermark::EMPTY, now).await.unwrap();
/// assert_eq!(summary.counts.upserted, 1);
///
/// let records = ledger.records().await;
/// assert_eq!(records[0].shift_date.to_string(), "2026-01-15");
/// assert_eq!(records[0].completion, Completion::Manual);
/// # });
/// ```
pub struct ReconciliationEngine {
    config: ReconConfig,
    source: Arc<dyn PunchSource>,
    ledger: Arc<dyn LedgerSink>,
    directory: Arc<dyn EmployeeDirectory>,
    locks: TenantLocks,
}

impl ReconciliationEngine {
    /// Creates an engine over the given ports.
    ///
    /// Fails with [`EngineError::ConfigurationError`] if `config` is invalid.
    pub fn new(
        config: ReconConfig,
        source: Arc<dyn PunchSource>,
        ledger: Arc<dyn LedgerSink>,
        directory: Arc<dyn EmployeeDirectory>,
    ) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            ledger,
            directory,
            locks: TenantLocks::new(),
        })
    }

    /// Shares a lock registry with other engines.
    pub fn with_locks(mut self, locks: TenantLocks) -> Self {
        self.locks = locks;
        self
    }

    /// The engine's configuration.
    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// The engine's lock registry.
    pub fn locks(&self) -> &TenantLocks {
        &self.locks
    }

    /// Reconciles every punch recorded after `watermark`.
    ///
    /// The window reassembled runs from the earliest shift date the new
    /// punches or the ledger's open shifts touch, through `now`'s date. The
    /// returned summary carries the watermark to persist for the next run.
    ///
    /// # Errors
    ///
    /// - [`EngineError::RunInProgress`] if another run holds the tenant's lock
    /// - [`EngineError::SourceFetchFailure`] if a read exhausts its retries
    /// - [`EngineError::SinkWriteFailure`] if a write exhausts its retries; the
    ///   caller must keep its old watermark
    pub async fn run_incremental(
        &self,
        tenant_id: &str,
        watermark: Watermark,
        now: NaiveDateTime,
    ) -> EngineResult<RunSummary> {
        let _guard = self.locks.try_acquire(tenant_id).await?;
        let mut run = RunContext::new(tenant_id, RunMode::Incremental, now);
        info!(
            run_id = %run.run_id,
            tenant_id,
            watermark = %watermark,
            now = %now,
            "Starting incremental run"
        );

        // Step 1: punches since the watermark, up to `now`
        let fresh = self
            .fetch("punch source", || self.source.fetch_punches_since(watermark))
            .await?;
        run.counts.punches_fetched = fresh.len() as u64;

        let (fresh, held): (Vec<RawPunch>, Vec<RawPunch>) = fresh
            .into_iter()
            .partition(|raw| raw.recorded_at().is_none_or(|at| at <= now));
        if !held.is_empty() {
            debug!(run_id = %run.run_id, held = held.len(), "Holding punches stamped after now");
            run.counts.future_punches_held = held.len() as u64;
        }
        // Held punches stay above the watermark.
        let watermark_after =
            watermark.advanced_to(fresh.iter().filter_map(RawPunch::recorded_at).max());

        let (parsed, unparseable): (Vec<_>, Vec<_>) = fresh
            .into_iter()
            .map(|raw| (raw.parse(), raw))
            .partition(|(parsed, _)| parsed.is_ok());
        let parsed: Vec<Punch> = parsed
            .into_iter()
            .filter_map(|(parsed, _)| parsed.ok())
            .collect();
        let unparseable: Vec<RawPunch> = unparseable.into_iter().map(|(_, raw)| raw).collect();

        // Step 2: shifts the ledger still holds open
        let open = self.fetch("ledger", || self.ledger.open_shifts()).await?;

        // Step 3: the shift dates to reassemble
        let earliest = parsed
            .iter()
            .map(|punch| self.touched_date(punch))
            .chain(open.iter().map(|shift| shift.shift_date))
            .min();
        let Some(window) = earliest.and_then(|earliest| self.clamp_window(earliest, now.date()))
        else {
            let batch = normalize(
                &unparseable,
                &NormalizerContext::new(self.config.day_start_boundary),
            );
            run.absorb(batch.counts, batch.discrepancies);
            info!(run_id = %run.run_id, tenant_id, "Nothing to reconcile");
            return Ok(run.finish(None, watermark, watermark_after));
        };

        self.reconcile(&mut run, window, open, unparseable).await?;
        Ok(run.finish(Some(window), watermark, watermark_after))
    }

    /// Reassembles and reclassifies the shifts dated `from` through `to`.
    ///
    /// Statuses already in the ledger are recomputed. The watermark is not
    /// involved; the summary reports it as empty.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidRange`] if the range is inverted, ends after
    ///   `now`, or lies entirely before the processing floor
    /// - otherwise as [`Self::run_incremental`]
    pub async fn reprocess(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        now: NaiveDateTime,
    ) -> EngineResult<RunSummary> {
        let requested = DateWindow::new(from, to)?;
        if to > now.date() {
            return Err(EngineError::InvalidRange {
                from,
                to,
                message: format!("end date is after today ({})", now.date()),
            });
        }
        let from = self
            .config
            .processing_floor
            .map_or(requested.from, |floor| requested.from.max(floor));
        let window = DateWindow::new(from, to).map_err(|_| EngineError::InvalidRange {
            from: requested.from,
            to,
            message: "range ends before the processing floor".to_string(),
        })?;

        let _guard = self.locks.try_acquire(tenant_id).await?;
        let mut run = RunContext::new(tenant_id, RunMode::Reprocess, now);
        info!(
            run_id = %run.run_id,
            tenant_id,
            from = %window.from,
            to = %window.to,
            "Starting reprocess run"
        );

        let open = self.fetch("ledger", || self.ledger.open_shifts()).await?;
        self.reconcile(&mut run, window, open, Vec::new()).await?;
        Ok(run.finish(Some(window), Watermark::EMPTY, Watermark::EMPTY))
    }

    async fn reconcile(
        &self,
        run: &mut RunContext<'_>,
        window: DateWindow,
        open: Vec<ShiftRecord>,
        extra: Vec<RawPunch>,
    ) -> EngineResult<()> {
        let policy = AutoCompletionPolicy::new(self.config.day_start_boundary);
        let guard = DurationGuard::from_config(&self.config);
        let schedule = &self.config.shift_schedule;

        // Step 1: open shifts from before the window carry into it
        let mut open = open;
        open.sort_by_key(|shift| shift.checkin_time);
        let carried: OpenShifts = open
            .into_iter()
            .filter(|shift| shift.shift_date < window.from)
            .map(|shift| (shift.employee_id.clone(), shift))
            .collect();
        let carried_records: Vec<ShiftRecord> = carried.values().cloned().collect();
        let carried_keys: HashSet<(String, NaiveDate)> =
            carried_records.iter().map(ShiftRecord::key).collect();

        // Step 2: punches for the window plus a day of context either side
        let mut raw = self
            .fetch("punch source", || {
                self.source
                    .fetch_punches_between(window.context_start(), window.context_end())
            })
            .await?;
        let fetched = raw.len() as u64;
        let now = run.now;
        raw.retain(|record| record.recorded_at().is_none_or(|at| at <= now));
        if run.mode == RunMode::Reprocess {
            run.counts.punches_fetched = fetched;
            run.counts.future_punches_held = fetched - raw.len() as u64;
        }
        let refetched: HashSet<&str> = raw
            .iter()
            .map(|record| record.source_record_id.as_str())
            .collect();
        let extra: Vec<RawPunch> = extra
            .into_iter()
            .filter(|record| !refetched.contains(record.source_record_id.as_str()))
            .collect();
        raw.extend(extra);
        // Punches up to a carried shift's check-in are already accounted for.
        raw.retain(|record| match record.parse() {
            Ok(punch) => carried
                .get(&punch.employee_id)
                .is_none_or(|shift| punch.timestamp > shift.checkin_time),
            Err(_) => true,
        });

        // Step 3: employee profiles
        let employee_ids: Vec<String> = raw
            .iter()
            .map(|record| record.employee_id.trim().to_string())
            .chain(carried.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let roster = self
            .fetch("employee directory", || {
                self.directory.profiles(&employee_ids)
            })
            .await?;

        // Step 4: normalize
        let mut ctx = NormalizerContext::new(self.config.day_start_boundary).with_roster(&roster);
        for shift in carried.values() {
            ctx = ctx.with_open_checkin(shift.employee_id.clone(), shift.checkin_time);
        }
        let batch = normalize(&raw, &ctx);
        for punch in &batch.deferred {
            debug!(
                run_id = %run.run_id,
                employee_id = %punch.employee_id,
                source_record_id = %punch.source_record_id,
                "Checkout deferred; its check-in stays open"
            );
        }
        run.absorb(batch.counts, batch.discrepancies);

        // Step 5: assemble date by date, carrying open shifts forward
        let mut by_date: BTreeMap<NaiveDate, Vec<&Punch>> = BTreeMap::new();
        for punch in &batch.punches {
            by_date.entry(punch.date()).or_default().push(punch);
        }
        let mut assembly = Assembly::carrying(carried);
        for (date, punches) in &by_date {
            debug!(run_id = %run.run_id, date = %date, punches = punches.len(), "Assembling date");
            for punch in punches {
                assemble_punch(&mut assembly, punch, &guard, &policy);
            }
        }

        // Step 6: auto-complete shifts due at `now`
        let still_open = std::mem::take(&mut assembly.open_shifts);
        for (employee_id, shift) in still_open {
            if !policy.is_due(&shift, run.now) {
                assembly.open_shifts.insert(employee_id, shift);
                continue;
            }
            match policy.complete(&shift) {
                Ok(completed) => {
                    assembly.counts.shifts_auto_closed += 1;
                    assembly.shifts.push(completed);
                }
                Err(error) => {
                    assembly.discrepancies.push(Discrepancy::from_error(&error));
                    assembly.open_shifts.insert(employee_id, shift);
                }
            }
        }
        let Assembly {
            shifts,
            open_shifts,
            discrepancies,
            counts,
        } = assembly;
        run.absorb(counts, discrepancies);

        // Step 7: classify the records this window owns
        let mut derived: Vec<ShiftRecord> = shifts
            .into_iter()
            .chain(open_shifts.into_values())
            .filter(|shift| {
                window.contains_date(shift.shift_date) || carried_keys.contains(&shift.key())
            })
            .collect();
        for shift in &mut derived {
            let profile = roster.get(&shift.employee_id);
            classify_shift(shift, profile, schedule);
        }

        // Step 8: one record per key, against what the ledger holds
        let ledger_view: HashMap<(String, NaiveDate), ShiftRecord> = self
            .fetch("ledger", || self.ledger.shifts_between(window.from, window.to))
            .await?
            .into_iter()
            .chain(carried_records)
            .map(|shift| (shift.key(), shift))
            .collect();
        let outcome = dedup(derived, ledger_view.values().cloned().collect());
        run.counts.dedup_removed += outcome.removed;

        // Step 9: decide what to write
        let mut plan = Vec::new();
        for Candidate { mut record, origin } in outcome.winners {
            // Only a ledger record the punches no longer produce can still be due here.
            if policy.is_due(&record, run.now) {
                match policy.complete(&record) {
                    Ok(mut completed) => {
                        let profile = roster.get(&completed.employee_id);
                        classify_shift(&mut completed, profile, schedule);
                        run.counts.shifts_auto_closed += 1;
                        record = completed;
                    }
                    Err(error) => run.discrepancies.push(Discrepancy::from_error(&error)),
                }
            }

            let persisted = ledger_view.get(&record.key());
            if let Some(persisted) = persisted {
                if run.mode == RunMode::Incremental {
                    preserve_statuses(&mut record, persisted);
                }
            }
            record.migration_status = if record.is_terminal() {
                MigrationStatus::Synced
            } else {
                MigrationStatus::Pending
            };

            if persisted == Some(&record) {
                run.counts.unchanged += 1;
                continue;
            }
            debug!(
                run_id = %run.run_id,
                employee_id = %record.employee_id,
                shift_date = %record.shift_date,
                completion = %record.completion,
                origin = ?origin,
                "Planning ledger write"
            );
            plan.push(record);
        }

        // Step 10: write in (employee, shift date) order
        for record in plan {
            let written = retry(&self.config.retry, "ledger upsert", || {
                self.ledger.upsert_shift(record.clone())
            })
            .await;

            if let Err(failure) = written {
                run.counts.errors += 1;
                let error = EngineError::SinkWriteFailure {
                    employee_id: record.employee_id.clone(),
                    shift_date: record.shift_date,
                    attempts: failure.attempts,
                    message: failure.error.message,
                };
                error!(
                    run_id = %run.run_id,
                    tenant_id = run.tenant_id,
                    upserted = run.counts.upserted,
                    error = %error,
                    "Ledger write failed; watermark not advanced"
                );
                return Err(error);
            }
            run.counts.upserted += 1;
            if record.is_cross_day() {
                run.counts.cross_day_shifts += 1;
            }
            run.written.push(record);
        }
        Ok(())
    }

    /// The earliest shift date a new punch can affect.
    ///
    /// A checkout, or a check-in before the day-start boundary, may belong
    /// to the previous day's shift.
    fn touched_date(&self, punch: &Punch) -> NaiveDate {
        let date = punch.date();
        if punch.direction == Direction::Out
            || punch.timestamp.time() < self.config.day_start_boundary
        {
            date.pred_opt().unwrap_or(date)
        } else {
            date
        }
    }

    fn clamp_window(&self, earliest: NaiveDate, today: NaiveDate) -> Option<DateWindow> {
        let floor = self.config.processing_floor;
        if floor.is_some_and(|floor| floor > today) {
            return None;
        }
        let from = floor.map_or(earliest, |floor| earliest.max(floor));
        DateWindow::new(from.min(today), today).ok()
    }

    async fn fetch<T, F, Fut>(&self, port: &str, call: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PortError>>,
    {
        retry(&self.config.retry, port, call)
            .await
            .map_err(|failure| {
                error!(port, attempts = failure.attempts, error = %failure.error, "Port read failed");
                EngineError::SourceFetchFailure {
                    port: port.to_string(),
                    attempts: failure.attempts,
                    message: failure.error.message,
                }
            })
    }
}

/// Keeps statuses the ledger already holds for unchanged times.
fn preserve_statuses(record: &mut ShiftRecord, persisted: &ShiftRecord) {
    if record.checkin_time == persisted.checkin_time && persisted.checkin_status.is_some() {
        record.checkin_status = persisted.checkin_status;
    }
    if record.checkout_time == persisted.checkout_time
        && record.completion == persisted.completion
        && persisted.checkout_status.is_some()
    {
        record.checkout_status = persisted.checkout_status;
    }
}

/// Working state of one run.
struct RunContext<'a> {
    run_id: Uuid,
    tenant_id: &'a str,
    mode: RunMode,
    now: NaiveDateTime,
    started: Instant,
    started_at: chrono::DateTime<Utc>,
    counts: RunCounts,
    discrepancies: Vec<Discrepancy>,
    written: Vec<ShiftRecord>,
}

impl<'a> RunContext<'a> {
    fn new(tenant_id: &'a str, mode: RunMode, now: NaiveDateTime) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            tenant_id,
            mode,
            now,
            started: Instant::now(),
            started_at: Utc::now(),
            counts: RunCounts::default(),
            discrepancies: Vec::new(),
            written: Vec::new(),
        }
    }

    fn absorb(&mut self, counts: RunCounts, discrepancies: Vec<Discrepancy>) {
        self.counts += counts;
        self.counts.errors += discrepancies
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count() as u64;
        self.discrepancies.extend(discrepancies);
    }

    fn finish(
        self,
        window: Option<DateWindow>,
        watermark_before: Watermark,
        watermark_after: Watermark,
    ) -> RunSummary {
        let duration_us = self.started.elapsed().as_micros() as u64;
        let worked_hours: Decimal = self
            .written
            .iter()
            .filter(|shift| shift.is_terminal())
            .map(ShiftRecord::worked_hours)
            .sum();
        info!(
            run_id = %self.run_id,
            tenant_id = self.tenant_id,
            mode = ?self.mode,
            punches_fetched = self.counts.punches_fetched,
            shifts_closed = self.counts.shifts_closed,
            shifts_auto_closed = self.counts.shifts_auto_closed,
            upserted = self.counts.upserted,
            unchanged = self.counts.unchanged,
            worked_hours = %worked_hours,
            discrepancies = self.discrepancies.len(),
            watermark = %watermark_after,
            duration_us,
            "Run completed"
        );

        RunSummary {
            run_id: self.run_id,
            tenant_id: self.tenant_id.to_string(),
            mode: self.mode,
            started_at: self.started_at,
            window,
            watermark_before,
            watermark_after,
            counts: self.counts,
            discrepancies: self.discrepancies,
            shifts: self.written,
            worked_hours,
            duration_us,
        }
    }
}
