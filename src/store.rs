//! Embedded payment store: in-flight markers plus the settlement ledger.
//!
//! Every logical operation (admit, record, release, purge) runs as a single
//! atomic transaction behind one mutex, which makes the two pipeline
//! invariants structural:
//!
//! - a submission id is in at most one of {unseen, in-flight, settled},
//! - at most one `SettlementRecord` exists per submission id across BOTH
//!   processor ledgers combined, no matter how often a job is retried.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AdmitOutcome, ProcessorSummary, ProcessorTag, SettlementRecord, cents_to_decimal,
};

#[derive(Default)]
struct StoreInner {
    /// Accepted but not yet settled or abandoned.
    in_flight: HashSet<Uuid>,
    /// Global settled-id index across both processors. Once here, an id never
    /// re-enters `in_flight`.
    settled: HashSet<Uuid>,
    /// Append-only per-processor ledgers, indexed by `ProcessorTag::index()`.
    records: [Vec<SettlementRecord>; 2],
}

/// Shared store for the admission gate, the worker pool and the
/// reconciliation query. Critical sections are short and never await.
#[derive(Default)]
pub struct PaymentStore {
    inner: Mutex<StoreInner>,
}

impl PaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic duplicate guard: insert the id into the in-flight set unless it
    /// is already in flight or already settled. Exactly one of N concurrent
    /// callers with the same id gets `Accepted`.
    pub fn admit(&self, submission_id: Uuid) -> AdmitOutcome {
        let mut inner = self.lock();
        if inner.settled.contains(&submission_id) || !inner.in_flight.insert(submission_id) {
            AdmitOutcome::Duplicate
        } else {
            AdmitOutcome::Accepted
        }
    }

    /// Record a settlement and clear the in-flight marker in one transaction.
    ///
    /// Returns `false` without any state change unless the id is currently
    /// in flight: an already-settled id (retried call that succeeded
    /// downstream twice) and a purged or abandoned id both refuse the write.
    pub fn record(
        &self,
        processor: ProcessorTag,
        submission_id: Uuid,
        amount_cents: i64,
        settled_at: DateTime<Utc>,
    ) -> bool {
        let mut inner = self.lock();
        if !inner.in_flight.remove(&submission_id) {
            return false;
        }
        inner.settled.insert(submission_id);
        inner.records[processor.index()].push(SettlementRecord {
            processor,
            submission_id,
            amount_cents,
            settled_at,
        });
        true
    }

    /// Clear the in-flight marker without settling (permanent abandonment).
    /// Returns whether the marker was present.
    pub fn release(&self, submission_id: Uuid) -> bool {
        self.lock().in_flight.remove(&submission_id)
    }

    /// Sum settlements for one processor over `[from, to]`; open-ended bounds
    /// when omitted. Amounts come back as an exact 2-decimal value, never -0.
    pub fn summarize(
        &self,
        processor: ProcessorTag,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ProcessorSummary {
        let inner = self.lock();
        let mut total_requests = 0u64;
        let mut total_cents = 0i64;
        for record in &inner.records[processor.index()] {
            if from.is_some_and(|f| record.settled_at < f) {
                continue;
            }
            if to.is_some_and(|t| record.settled_at > t) {
                continue;
            }
            total_requests += 1;
            total_cents += record.amount_cents;
        }
        ProcessorSummary {
            total_requests,
            total_amount: cents_to_decimal(total_cents),
        }
    }

    /// Drop all ledger and in-flight state (test/ops utility).
    pub fn purge(&self) {
        let mut inner = self.lock();
        inner.in_flight.clear();
        inner.settled.clear();
        inner.records[0].clear();
        inner.records[1].clear();
    }

    /// Whether the id is currently accepted and awaiting settlement. A job
    /// whose marker is gone (purged or abandoned) must not be settled.
    pub fn is_in_flight(&self, submission_id: Uuid) -> bool {
        self.lock().in_flight.contains(&submission_id)
    }

    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn settled_len(&self) -> usize {
        self.lock().settled.len()
    }

    /// Snapshot of one processor's ledger, for diagnostics and tests.
    pub fn records(&self, processor: ProcessorTag) -> Vec<SettlementRecord> {
        self.lock().records[processor.index()].clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        // Inner ops cannot panic while holding the guard, so poisoning only
        // occurs if a panic happens elsewhere; propagate it.
        self.inner.lock().expect("payment store mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_admit_then_duplicate() {
        let store = PaymentStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.admit(id), AdmitOutcome::Accepted);
        assert_eq!(store.admit(id), AdmitOutcome::Duplicate);
        assert_eq!(store.in_flight_len(), 1);
    }

    #[test]
    fn test_concurrent_admit_exactly_once() {
        let store = Arc::new(PaymentStore::new());
        let id = Uuid::new_v4();
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.admit(id))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| *o == AdmitOutcome::Accepted)
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(store.in_flight_len(), 1);
    }

    #[test]
    fn test_record_clears_in_flight_and_is_idempotent() {
        let store = PaymentStore::new();
        let id = Uuid::new_v4();
        store.admit(id);

        assert!(store.record(ProcessorTag::Default, id, 1990, ts(100)));
        assert_eq!(store.in_flight_len(), 0);

        // Second settlement of the same id, even on the other processor,
        // must be a no-op.
        assert!(!store.record(ProcessorTag::Fallback, id, 1990, ts(101)));
        assert_eq!(store.records(ProcessorTag::Default).len(), 1);
        assert_eq!(store.records(ProcessorTag::Fallback).len(), 0);
    }

    #[test]
    fn test_record_refused_when_not_in_flight() {
        let store = PaymentStore::new();
        let id = Uuid::new_v4();

        // Never admitted: no ledger write.
        assert!(!store.record(ProcessorTag::Default, id, 100, ts(1)));
        assert_eq!(store.records(ProcessorTag::Default).len(), 0);

        // Admitted then purged: the marker is gone, so a late settlement
        // of the wiped job is refused too.
        store.admit(id);
        assert!(store.is_in_flight(id));
        store.purge();
        assert!(!store.is_in_flight(id));
        assert!(!store.record(ProcessorTag::Default, id, 100, ts(2)));
        assert_eq!(store.settled_len(), 0);
    }

    #[test]
    fn test_settled_id_never_readmitted() {
        let store = PaymentStore::new();
        let id = Uuid::new_v4();
        store.admit(id);
        store.record(ProcessorTag::Default, id, 500, ts(1));
        assert_eq!(store.admit(id), AdmitOutcome::Duplicate);
    }

    #[test]
    fn test_release_unblocks_resubmission() {
        let store = PaymentStore::new();
        let id = Uuid::new_v4();
        store.admit(id);
        assert!(store.release(id));
        assert!(!store.release(id));
        // Abandoned, not settled: the id may be admitted again.
        assert_eq!(store.admit(id), AdmitOutcome::Accepted);
    }

    #[test]
    fn test_summarize_range_bounds_inclusive() {
        let store = PaymentStore::new();
        for (i, cents) in [(1i64, 1000i64), (2, 2000), (3, 3000)] {
            let id = Uuid::new_v4();
            store.admit(id);
            store.record(ProcessorTag::Default, id, cents, ts(i));
        }

        let all = store.summarize(ProcessorTag::Default, None, None);
        assert_eq!(all.total_requests, 3);
        assert_eq!(all.total_amount, Decimal::new(6000, 2));

        let mid = store.summarize(ProcessorTag::Default, Some(ts(2)), Some(ts(2)));
        assert_eq!(mid.total_requests, 1);
        assert_eq!(mid.total_amount, Decimal::new(2000, 2));

        let open_from = store.summarize(ProcessorTag::Default, None, Some(ts(1)));
        assert_eq!(open_from.total_requests, 1);
    }

    #[test]
    fn test_summarize_matches_brute_force() {
        let store = PaymentStore::new();
        for i in 0..50i64 {
            let id = Uuid::new_v4();
            store.admit(id);
            store.record(ProcessorTag::Fallback, id, 100 + i, ts(i));
        }
        let from = Some(ts(10));
        let to = Some(ts(39));
        let summary = store.summarize(ProcessorTag::Fallback, from, to);

        let records = store.records(ProcessorTag::Fallback);
        let expected: i64 = records
            .iter()
            .filter(|r| r.settled_at >= from.unwrap() && r.settled_at <= to.unwrap())
            .map(|r| r.amount_cents)
            .sum();
        assert_eq!(summary.total_requests, 30);
        assert_eq!(summary.total_amount, Decimal::new(expected, 2));
    }

    #[test]
    fn test_empty_summary_is_plain_zero() {
        let store = PaymentStore::new();
        let summary = store.summarize(ProcessorTag::Default, None, None);
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.total_amount, Decimal::ZERO);
        assert!(!summary.total_amount.is_sign_negative());
    }

    #[test]
    fn test_purge_resets_everything() {
        let store = PaymentStore::new();
        let settled = Uuid::new_v4();
        let pending = Uuid::new_v4();
        store.admit(settled);
        store.record(ProcessorTag::Default, settled, 100, ts(1));
        store.admit(pending);

        store.purge();
        assert_eq!(store.in_flight_len(), 0);
        assert_eq!(store.settled_len(), 0);
        assert_eq!(store.admit(settled), AdmitOutcome::Accepted);
    }
}
