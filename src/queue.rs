//! FIFO hand-off between the admission gate and the dispatch workers.
//!
//! The queue is purely an ordering mechanism; the store's in-flight set is
//! authoritative for duplicate detection, so the queue could be rebuilt from
//! it after a crash. Idle workers park on a `Notify` rather than spinning.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::models::PaymentJob;

#[derive(Default)]
pub struct JobQueue {
    inner: Mutex<VecDeque<PaymentJob>>,
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job and wake one parked worker.
    pub fn push(&self, job: PaymentJob) {
        self.lock().push_back(job);
        self.notify.notify_one();
    }

    /// Dequeue up to `max` jobs in acceptance order, waiting at most `wait`
    /// when the queue is empty. Returns an empty batch on timeout.
    ///
    /// A dequeued job is owned by the calling worker until it is settled,
    /// abandoned, or pushed back for retry.
    pub async fn pop_batch(&self, max: usize, wait: Duration) -> Vec<PaymentJob> {
        let deadline = Instant::now() + wait;
        loop {
            // Register interest before checking, so a push between the check
            // and the await still wakes us.
            let notified = self.notify.notified();
            {
                let mut queue = self.lock();
                if !queue.is_empty() {
                    let n = max.min(queue.len());
                    return queue.drain(..n).collect();
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Vec::new();
            }
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return Vec::new();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all queued jobs (test/ops utility, used by purge).
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PaymentJob>> {
        self.inner.lock().expect("job queue mutex poisoned")
    }
}
