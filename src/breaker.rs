//! Per-processor circuit breaker for the settlement call.
//!
//! CLOSED counts consecutive failures; at the threshold the breaker opens and
//! rejects calls without network I/O until the cooldown elapses. The first
//! caller after the cooldown gets the single half-open trial, and that trial's
//! outcome alone decides whether the breaker closes or re-opens. The breaker
//! never wraps the health probe.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::models::ProcessorTag;

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    next_attempt: Option<Instant>,
    /// Set while the single half-open trial call is outstanding.
    trial_in_flight: bool,
}

pub struct CircuitBreaker {
    tag: ProcessorTag,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(tag: ProcessorTag, failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            tag,
            failure_threshold,
            cooldown,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                next_attempt: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn with_defaults(tag: ProcessorTag) -> Self {
        Self::new(tag, DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }

    /// Gate one settlement attempt. `Ok` hands the caller a pass-through (or
    /// the half-open trial); the caller must report the outcome via
    /// `on_success`/`on_failure`. `Err` means reject with no network attempt.
    pub fn try_acquire(&self) -> Result<(), GatewayError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let cooled_down = inner
                    .next_attempt
                    .is_none_or(|deadline| Instant::now() >= deadline);
                if cooled_down {
                    info!(processor = %self.tag, "circuit half-open, allowing trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(())
                } else {
                    Err(GatewayError::CircuitOpen(self.tag))
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(GatewayError::CircuitOpen(self.tag))
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    pub fn on_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(processor = %self.tag, "circuit closed");
        }
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.next_attempt = None;
        inner.trial_in_flight = false;
    }

    pub fn on_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                warn!(processor = %self.tag, "half-open trial failed, circuit re-opened");
                inner.state = CircuitState::Open;
                inner.next_attempt = Some(Instant::now() + self.cooldown);
                inner.trial_in_flight = false;
            }
            CircuitState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.failure_threshold {
                    warn!(
                        processor = %self.tag,
                        failures = inner.failures,
                        "failure threshold reached, circuit opened"
                    );
                    inner.state = CircuitState::Open;
                    inner.next_attempt = Some(Instant::now() + self.cooldown);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Whether a call made right now would be rejected. Used by the router;
    /// an open breaker whose cooldown has elapsed counts as usable (the next
    /// call becomes the half-open trial).
    pub fn would_reject(&self) -> bool {
        let inner = self.lock();
        match inner.state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => inner.trial_in_flight,
            CircuitState::Open => inner
                .next_attempt
                .is_some_and(|deadline| Instant::now() < deadline),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }
}

/// One breaker per downstream processor.
pub struct BreakerPair {
    default: CircuitBreaker,
    fallback: CircuitBreaker,
}

impl BreakerPair {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            default: CircuitBreaker::new(ProcessorTag::Default, failure_threshold, cooldown),
            fallback: CircuitBreaker::new(ProcessorTag::Fallback, failure_threshold, cooldown),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }

    pub fn get(&self, tag: ProcessorTag) -> &CircuitBreaker {
        match tag {
            ProcessorTag::Default => &self.default,
            ProcessorTag::Fallback => &self.fallback,
        }
    }
}
