use std::sync::Arc;
use std::time::Instant;

use crate::admission::AdmissionGate;
use crate::dispatch::Dispatcher;
use crate::queue::JobQueue;
use crate::store::PaymentStore;

/// Shared gateway state: handles into the admission/dispatch/settlement
/// engine. Everything is explicitly constructed and injectable, so several
/// instances (e.g. in tests) never interfere.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdmissionGate>,
    pub store: Arc<PaymentStore>,
    pub queue: Arc<JobQueue>,
    pub dispatcher: Arc<Dispatcher>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        gate: Arc<AdmissionGate>,
        store: Arc<PaymentStore>,
        queue: Arc<JobQueue>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            gate,
            store,
            queue,
            dispatcher,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
