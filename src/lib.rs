//! payrelay - Payment Intermediary Gateway
//!
//! Accepts payment submissions, tracks in-flight work, routes each job to the
//! cheaper of two downstream processors, and keeps a reconciliation ledger
//! with exactly-once settlement accounting.
//!
//! # Modules
//!
//! - [`models`] - Processor tags, payment jobs, settlement records
//! - [`store`] - Linearizable in-flight marker set + settlement ledger
//! - [`queue`] - FIFO hand-off between admission and workers
//! - [`admission`] - Atomic duplicate-submission guard
//! - [`processor`] - Downstream processor trait seam + HTTP client
//! - [`health`] - Rate-limited per-processor health cache
//! - [`breaker`] - Per-processor circuit breaker
//! - [`router`] - Cheapest-first processor selection
//! - [`dispatch`] - Concurrent settlement worker pool
//! - [`gateway`] - axum HTTP layer

pub mod admission;
pub mod breaker;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod models;
pub mod processor;
pub mod queue;
pub mod router;
pub mod store;

// Convenient re-exports at crate root
pub use admission::AdmissionGate;
pub use breaker::{BreakerPair, CircuitBreaker, CircuitState};
pub use dispatch::{DispatchConfig, Dispatcher};
pub use error::GatewayError;
pub use health::HealthMonitor;
pub use models::{AdmitOutcome, PaymentJob, ProcessorSummary, ProcessorTag, SettlementRecord};
pub use processor::{HttpProcessor, ProcessorApi, Processors};
pub use queue::JobQueue;
pub use router::Router;
pub use store::PaymentStore;
