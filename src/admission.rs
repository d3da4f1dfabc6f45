//! Admission gate: the atomic duplicate guard in front of the queue.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::models::{AdmitOutcome, PaymentJob};
use crate::queue::JobQueue;
use crate::store::PaymentStore;

/// Accepts submissions exactly once per id. The store's check-and-insert is
/// the linearization point: of N concurrent calls with the same id, exactly
/// one enqueues a job; duplicates cause no state change at all.
pub struct AdmissionGate {
    store: Arc<PaymentStore>,
    queue: Arc<JobQueue>,
}

impl AdmissionGate {
    pub fn new(store: Arc<PaymentStore>, queue: Arc<JobQueue>) -> Self {
        Self { store, queue }
    }

    pub fn admit(&self, submission_id: Uuid, amount_cents: i64) -> AdmitOutcome {
        match self.store.admit(submission_id) {
            AdmitOutcome::Accepted => {
                self.queue.push(PaymentJob::new(submission_id, amount_cents));
                AdmitOutcome::Accepted
            }
            AdmitOutcome::Duplicate => {
                debug!(%submission_id, "duplicate submission rejected");
                AdmitOutcome::Duplicate
            }
        }
    }
}
