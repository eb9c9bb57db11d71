// Property-based tests for punch normalization, shift assembly and runs.
// CI: 128 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use proptest::prelude::*;

use attendance_reconciler::config::{ReconConfig, RetryPolicy};
use attendance_reconciler::engine::{
    InMemoryDirectory, InMemoryLedger, InMemoryPunchSource, ReconciliationEngine,
};
use attendance_reconciler::models::{Completion, EmployeeProfile, RawPunch, ShiftRecord, Watermark};
use attendance_reconciler::reconciliation::{
    AutoCompletionPolicy, DurationGuard, NormalizerContext, OpenShifts, assemble, cutoff,
    normalize,
};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_with_cases(default: u32) -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn recon_config() -> ReconConfig {
    ReconConfig {
        retry: RetryPolicy::immediate(1),
        ..ReconConfig::default()
    }
}

fn boundary() -> NaiveTime {
    NaiveTime::from_hms_opt(5, 0, 0).unwrap()
}

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 15)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Up to 24 punches for two employees over three days, with unique ids.
fn arb_punches() -> impl Strategy<Value = Vec<RawPunch>> {
    prop::collection::vec((0..2usize, any::<bool>(), 0..(3 * 24 * 60i64)), 0..24).prop_map(
        |events| {
            events
                .into_iter()
                .enumerate()
                .map(|(index, (employee, is_in, minute))| {
                    let timestamp = base() + Duration::minutes(minute);
                    RawPunch::new(
                        format!("r{}", index),
                        ["E1", "E2"][employee],
                        if is_in { "in" } else { "out" },
                        timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    )
                })
                .collect()
        },
    )
}

/// The same punches in two delivery orders.
fn arb_shuffled_pair() -> impl Strategy<Value = (Vec<RawPunch>, Vec<RawPunch>)> {
    arb_punches().prop_flat_map(|punches| (Just(punches.clone()), Just(punches).prop_shuffle()))
}

fn assert_well_formed(records: &[ShiftRecord]) {
    let mut open_per_employee: HashMap<&str, usize> = HashMap::new();
    for record in records {
        assert_eq!(record.shift_date, record.checkin_time.date());
        match record.checkout_time {
            Some(checkout) => assert!(checkout > record.checkin_time),
            None => assert_eq!(record.completion, Completion::Open),
        }
        if record.completion == Completion::Open {
            *open_per_employee.entry(&record.employee_id).or_default() += 1;
        }
    }
    assert!(open_per_employee.values().all(|&count| count <= 1));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_with_cases(128))]

    #[test]
    fn prop_normalize_ignores_delivery_order((forward, shuffled) in arb_shuffled_pair()) {
        let ctx = NormalizerContext::new(boundary());
        let a = normalize(&forward, &ctx);
        let b = normalize(&shuffled, &ctx);

        prop_assert_eq!(a.punches, b.punches);
        prop_assert_eq!(a.counts, b.counts);
    }

    #[test]
    fn prop_assembled_shifts_are_well_formed(punches in arb_punches()) {
        let config = recon_config();
        let batch = normalize(&punches, &NormalizerContext::new(config.day_start_boundary));
        let assembly = assemble(
            &batch.punches,
            OpenShifts::new(),
            &DurationGuard::from_config(&config),
            &AutoCompletionPolicy::new(config.day_start_boundary),
        );

        let records: Vec<ShiftRecord> = assembly.all_shifts().cloned().collect();
        assert_well_formed(&records);
        prop_assert!(assembly.shifts.iter().all(ShiftRecord::is_terminal));
    }

    #[test]
    fn prop_cutoff_is_the_first_due_minute(day_offset in 0..365i64, boundary_minute in 0..(12 * 60u32)) {
        let boundary = NaiveTime::from_hms_opt(boundary_minute / 60, boundary_minute % 60, 0).unwrap();
        let policy = AutoCompletionPolicy::new(boundary);
        let shift_date = base().date() + Duration::days(day_offset);
        let shift = ShiftRecord::open(
            &RawPunch::new("r1", "E1", "in", format!("{} 12:00:00", shift_date))
                .parse()
                .unwrap(),
        );

        let at = cutoff(shift_date, boundary);
        prop_assert!(!policy.is_due(&shift, at - Duration::minutes(1)));
        prop_assert!(policy.is_due(&shift, at));
    }

    #[test]
    fn prop_watermark_never_moves_backwards(a in 0..10_000i64, b in 0..10_000i64) {
        let first = base() + Duration::minutes(a);
        let second = base() + Duration::minutes(b);
        let advanced = Watermark::at(first).advanced_to(Some(second));

        prop_assert!(advanced >= Watermark::at(first));
        prop_assert_eq!(advanced.timestamp(), Some(first.max(second)));
    }
}

proptest! {
    #![proptest_config(config_with_cases(32))]

    #[test]
    fn prop_rerun_is_idempotent(punches in arb_punches()) {
        let source = Arc::new(InMemoryPunchSource::with_punches(punches));
        let ledger = Arc::new(InMemoryLedger::new());
        let directory = Arc::new(InMemoryDirectory::with_profiles(vec![
            EmployeeProfile::new("E1"),
            EmployeeProfile::new("E2"),
        ]));
        let engine =
            ReconciliationEngine::new(recon_config(), source, ledger.clone(), directory).unwrap();
        let now = base() + Duration::hours(2 * 24 + 12);

        let (replay, first_records, second_records) = block_on(async {
            engine.run_incremental("acme", Watermark::EMPTY, now).await.unwrap();
            let first_records = ledger.records().await;
            let replay = engine.run_incremental("acme", Watermark::EMPTY, now).await.unwrap();
            (replay, first_records, ledger.records().await)
        });

        prop_assert_eq!(replay.counts.upserted, 0);
        prop_assert_eq!(&first_records, &second_records);
        assert_well_formed(&second_records);
    }
}
