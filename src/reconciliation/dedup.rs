//! Selection of one record per (employee, shift date).
//!
//! Freshly derived records compete with the ledger's existing records for
//! the same key. The winner is the most complete record:
//!
//! 1. a record with a checkout beats one without
//! 2. MANUAL beats AUTO_CLOSED beats OPEN
//! 3. a derived record beats a ledger record
//! 4. the earliest check-in wins

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::ShiftRecord;

/// Where a candidate record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced by this run.
    Derived,
    /// Already in the ledger.
    Ledger,
}

/// A record competing for its ledger key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The record.
    pub record: ShiftRecord,
    /// Where it came from.
    pub origin: Origin,
}

/// The output of [`dedup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    /// One winner per key, in (employee, shift date) order.
    pub winners: Vec<Candidate>,
    /// Number of derived records that lost to another candidate.
    pub removed: u64,
}

/// Orders two candidates for the same key; `Less` means `a` is preferred.
pub fn preference(a: &Candidate, b: &Candidate) -> Ordering {
    let rank = |c: &Candidate| {
        (
            c.record.checkout_time.is_some(),
            c.record.completion.rank(),
            c.origin == Origin::Derived,
        )
    };
    rank(b)
        .cmp(&rank(a))
        .then_with(|| a.record.checkin_time.cmp(&b.record.checkin_time))
}

/// Picks one record per (employee, shift date) from `derived` and `existing`.
///
/// The result does not depend on the order of either input.
///
/// # Example
///
/// ```
/// use attendance_reconciler::models::{Completion, RawPunch, ShiftRecord};
/// use attendance_reconciler::reconciliation::{dedup, Origin};
///
/// let check_in = RawPunch::new("r1", "E1", "in", "2026-01-15 09:00:00").parse().unwrap();
/// let check_out = RawPunch::new("r2", "E1", "out", "2026-01-15 17:00:00").parse().unwrap();
///
/// let open = ShiftRecord::open(&check_in);
/// let mut closed = open.clone();
/// closed.close_manual(&check_out).unwrap();
///
/// let outcome = dedup(vec![closed], vec![open]);
/// assert_eq!(outcome.winners.len(), 1);
/// assert_eq!(outcome.winners[0].record.completion, Completion::Manual);
/// assert_eq!(outcome.winners[0].origin, Origin::Derived);
/// ```
pub fn dedup(derived: Vec<ShiftRecord>, existing: Vec<ShiftRecord>) -> DedupOutcome {
    let mut groups: BTreeMap<(String, NaiveDate), Vec<Candidate>> = BTreeMap::new();

    let candidates = derived
        .into_iter()
        .map(|record| Candidate {
            record,
            origin: Origin::Derived,
        })
        .chain(existing.into_iter().map(|record| Candidate {
            record,
            origin: Origin::Ledger,
        }));
    for candidate in candidates {
        groups
            .entry(candidate.record.key())
            .or_default()
            .push(candidate);
    }

    let mut outcome = DedupOutcome::default();
    for ((employee_id, shift_date), mut group) in groups {
        group.sort_by(preference);
        let mut group = group.into_iter();
        let Some(winner) = group.next() else {
            continue;
        };

        let removed = group.filter(|c| c.origin == Origin::Derived).count() as u64;
        if removed > 0 {
            debug!(
                employee_id = %employee_id,
                shift_date = %shift_date,
                removed,
                kept = %winner.record.checkin_punch_id,
                "Removed competing shift records"
            );
        }
        outcome.removed += removed;
        outcome.winners.push(winner);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Completion, RawPunch};
    use chrono::NaiveDateTime;

    fn open(id: &str, checkin: &str) -> ShiftRecord {
        ShiftRecord::open(&RawPunch::new(id, "E1", "in", checkin).parse().unwrap())
    }

    fn manual(id: &str, checkin: &str, checkout: &str) -> ShiftRecord {
        let mut shift = open(id, checkin);
        shift
            .close_manual(
                &RawPunch::new(format!("{id}-out"), "E1", "out", checkout)
                    .parse()
                    .unwrap(),
            )
            .unwrap();
        shift
    }

    fn auto(id: &str, checkin: &str, at: &str) -> ShiftRecord {
        let mut shift = open(id, checkin);
        shift
            .close_auto(NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M:%S").unwrap())
            .unwrap();
        shift
    }

    #[test]
    fn test_manual_beats_auto_closed() {
        let outcome = dedup(
            vec![manual("r1", "2026-01-15 22:00:00", "2026-01-16 07:00:00")],
            vec![auto("r1", "2026-01-15 22:00:00", "2026-01-16 05:00:00")],
        );

        assert_eq!(outcome.winners.len(), 1);
        assert_eq!(outcome.winners[0].record.completion, Completion::Manual);
        assert_eq!(outcome.removed, 0);
    }

    #[test]
    fn test_ledger_manual_beats_derived_open() {
        let outcome = dedup(
            vec![open("r1", "2026-01-15 09:00:00")],
            vec![manual("r1", "2026-01-15 09:00:00", "2026-01-15 17:00:00")],
        );

        assert_eq!(outcome.winners[0].origin, Origin::Ledger);
        assert_eq!(outcome.removed, 1);
    }

    #[test]
    fn test_tie_prefers_derived() {
        let outcome = dedup(
            vec![manual("r1", "2026-01-15 09:00:00", "2026-01-15 17:30:00")],
            vec![manual("r1", "2026-01-15 09:00:00", "2026-01-15 17:00:00")],
        );

        assert_eq!(outcome.winners[0].origin, Origin::Derived);
        assert_eq!(
            outcome.winners[0].record.checkout_time.unwrap().to_string(),
            "2026-01-15 17:30:00"
        );
    }

    #[test]
    fn test_split_shift_keeps_earliest_checkin() {
        let outcome = dedup(
            vec![
                manual("r3", "2026-01-15 13:00:00", "2026-01-15 17:00:00"),
                manual("r1", "2026-01-15 08:00:00", "2026-01-15 12:00:00"),
            ],
            vec![],
        );

        assert_eq!(outcome.winners.len(), 1);
        assert_eq!(outcome.winners[0].record.checkin_punch_id, "r1");
        assert_eq!(outcome.removed, 1);
    }

    #[test]
    fn test_distinct_keys_all_survive_in_key_order() {
        let outcome = dedup(
            vec![
                manual("r3", "2026-01-16 09:00:00", "2026-01-16 17:00:00"),
                manual("r1", "2026-01-15 09:00:00", "2026-01-15 17:00:00"),
            ],
            vec![],
        );

        let dates: Vec<String> = outcome
            .winners
            .iter()
            .map(|c| c.record.shift_date.to_string())
            .collect();
        assert_eq!(dates, vec!["2026-01-15", "2026-01-16"]);
    }

    #[test]
    fn test_converges_regardless_of_input_order() {
        let records = vec![
            open("r1", "2026-01-15 09:00:00"),
            auto("r1", "2026-01-15 09:00:00", "2026-01-16 05:00:00"),
            manual("r1", "2026-01-15 09:00:00", "2026-01-15 17:00:00"),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let a = dedup(records, vec![]);
        let b = dedup(reversed, vec![]);
        assert_eq!(a, b);
        assert_eq!(a.winners[0].record.completion, Completion::Manual);
    }
}
