//! Dispatch worker pool: consumes the queue, routes each job through the
//! circuit breaker to a processor, and settles it into the ledger.
//!
//! Failure path: bounded retry with exponential backoff, then observable
//! abandonment. Abandonment clears the in-flight marker so the submission id
//! is not blocked forever, and is counted and logged because it is lost work,
//! not a success.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::breaker::BreakerPair;
use crate::error::GatewayError;
use crate::models::{PaymentJob, ProcessorTag, cents_to_decimal};
use crate::processor::{Processors, SettlementRequest};
use crate::queue::JobQueue;
use crate::router::Router;
use crate::store::PaymentStore;

/// Worker pool tuning.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Max jobs drained per dequeue.
    pub batch_size: usize,
    /// Attempts per job before abandonment.
    pub max_attempts: u32,
    /// Deadline for one settlement call; expiry counts as a plain failure.
    pub call_timeout: Duration,
    /// Backoff before retry n is `backoff_base * 2^(n-1)`.
    pub backoff_base: Duration,
    /// How long an idle worker parks on the queue before re-checking.
    pub idle_wait: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            batch_size: 16,
            max_attempts: 3,
            call_timeout: Duration::from_millis(3000),
            backoff_base: Duration::from_millis(1000),
            idle_wait: Duration::from_millis(500),
        }
    }
}

pub struct Dispatcher {
    queue: Arc<JobQueue>,
    store: Arc<PaymentStore>,
    router: Router,
    processors: Processors,
    breakers: Arc<BreakerPair>,
    config: DispatchConfig,
    processed: AtomicU64,
    abandoned: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<JobQueue>,
        store: Arc<PaymentStore>,
        router: Router,
        processors: Processors,
        breakers: Arc<BreakerPair>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            queue,
            store,
            router,
            processors,
            breakers,
            config,
            processed: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
        }
    }

    /// Spawn the worker tasks. Workers run until the runtime shuts down.
    pub fn spawn(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        info!(
            workers = self.config.workers,
            batch_size = self.config.batch_size,
            "starting dispatch workers"
        );
        (0..self.config.workers)
            .map(|worker_id| {
                let dispatcher = Arc::clone(self);
                tokio::spawn(async move { dispatcher.worker_loop(worker_id).await })
            })
            .collect()
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        debug!(worker_id, "dispatch worker started");
        loop {
            let batch = self
                .queue
                .pop_batch(self.config.batch_size, self.config.idle_wait)
                .await;
            for job in batch {
                self.process_job(job).await;
            }
        }
    }

    /// Run one job to its next state: settled, re-enqueued, or abandoned.
    pub async fn process_job(&self, mut job: PaymentJob) {
        // A purge can race with a pending backoff re-push; a job whose
        // in-flight marker is gone was wiped and must not settle.
        if !self.store.is_in_flight(job.submission_id) {
            debug!(submission_id = %job.submission_id, "job no longer in flight, dropping");
            return;
        }
        let tag = self.router.select().await;
        match self.attempt(tag, &job).await {
            Ok(()) => {
                // The ledger write is the exactly-once accounting point: a
                // retried job whose earlier attempt already landed downstream,
                // or whose id was wiped mid-call, is silently dropped here.
                let recorded = self.store.record(
                    tag,
                    job.submission_id,
                    job.amount_cents,
                    job.accepted_at,
                );
                if recorded {
                    self.processed.fetch_add(1, Ordering::Relaxed);
                    debug!(submission_id = %job.submission_id, processor = %tag, "settled");
                } else {
                    debug!(
                        submission_id = %job.submission_id,
                        "settlement not recordable, dropping"
                    );
                }
            }
            Err(e) => {
                job.attempts += 1;
                if job.attempts >= self.config.max_attempts {
                    self.abandon(job, &e);
                } else {
                    self.schedule_retry(job, &e);
                }
            }
        }
    }

    /// One breaker-gated settlement attempt with a per-call deadline.
    async fn attempt(&self, tag: ProcessorTag, job: &PaymentJob) -> Result<(), GatewayError> {
        let breaker = self.breakers.get(tag);
        breaker.try_acquire()?;

        let request = SettlementRequest {
            submission_id: job.submission_id,
            amount: cents_to_decimal(job.amount_cents),
            requested_at: job.accepted_at,
        };
        let outcome = tokio::time::timeout(
            self.config.call_timeout,
            self.processors.get(tag).submit_settlement(&request),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {
                breaker.on_success();
                Ok(())
            }
            Ok(Err(e)) => {
                breaker.on_failure();
                Err(e)
            }
            Err(_) => {
                // Local attempt stops waiting; nothing is cancelled downstream.
                breaker.on_failure();
                Err(GatewayError::CallTimeout)
            }
        }
    }

    fn schedule_retry(&self, job: PaymentJob, cause: &GatewayError) {
        let delay = self.config.backoff_base * 2u32.pow(job.attempts.saturating_sub(1));
        debug!(
            submission_id = %job.submission_id,
            attempts = job.attempts,
            delay_ms = delay.as_millis() as u64,
            error = %cause,
            "settlement failed, re-enqueueing after backoff"
        );
        let queue = Arc::clone(&self.queue);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.push(job);
        });
    }

    fn abandon(&self, job: PaymentJob, cause: &GatewayError) {
        // Clear the marker so the id is not duplicate-blocked forever.
        self.store.release(job.submission_id);
        self.abandoned.fetch_add(1, Ordering::Relaxed);
        error!(
            submission_id = %job.submission_id,
            attempts = job.attempts,
            error = %cause,
            "payment abandoned after retry cap"
        );
    }

    /// Settlements recorded by this pool.
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Jobs dropped after exhausting the retry cap.
    pub fn abandoned_count(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }
}
