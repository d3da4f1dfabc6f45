//! payrelay gateway entry point.
//!
//! ```text
//! ┌────────┐    ┌───────────┐    ┌───────┐    ┌────────────┐    ┌────────┐
//! │  HTTP  │───▶│ Admission │───▶│ Queue │───▶│  Dispatch  │───▶│ Ledger │
//! │ layer  │    │   gate    │    │ FIFO  │    │  workers   │    │        │
//! └────────┘    └───────────┘    └───────┘    └────────────┘    └────────┘
//!                                        Router = health monitor + breakers
//! ```

use std::sync::Arc;
use std::time::Duration;

use payrelay::admission::AdmissionGate;
use payrelay::breaker::BreakerPair;
use payrelay::config::AppConfig;
use payrelay::dispatch::{DispatchConfig, Dispatcher};
use payrelay::gateway::{self, AppState};
use payrelay::health::HealthMonitor;
use payrelay::processor::{HttpProcessor, Processors};
use payrelay::queue::JobQueue;
use payrelay::router::Router;
use payrelay::store::PaymentStore;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env);
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }

    let _log_guard = payrelay::logging::init_logging(&config);
    tracing::info!("starting payrelay gateway in {} mode", env);

    let connect_timeout = Duration::from_millis(config.processors.connect_timeout_ms);
    let probe_timeout = Duration::from_millis(config.health.probe_timeout_ms);
    let processors = Processors::new(
        Arc::new(HttpProcessor::new(
            config.processors.default_url.clone(),
            connect_timeout,
            probe_timeout,
        )?),
        Arc::new(HttpProcessor::new(
            config.processors.fallback_url.clone(),
            connect_timeout,
            probe_timeout,
        )?),
    );

    let store = Arc::new(PaymentStore::new());
    let queue = Arc::new(JobQueue::new());
    let gate = Arc::new(AdmissionGate::new(store.clone(), queue.clone()));

    let health = Arc::new(HealthMonitor::new(
        processors.clone(),
        Duration::from_millis(config.health.probe_interval_ms),
    ));
    let breakers = Arc::new(BreakerPair::new(
        config.breaker.failure_threshold,
        Duration::from_millis(config.breaker.cooldown_ms),
    ));
    let router = Router::new(health, breakers.clone());

    let dispatcher = Arc::new(Dispatcher::new(
        queue.clone(),
        store.clone(),
        router,
        processors,
        breakers,
        DispatchConfig {
            workers: config.dispatch.workers,
            batch_size: config.dispatch.batch_size,
            max_attempts: config.dispatch.max_attempts,
            call_timeout: Duration::from_millis(config.dispatch.call_timeout_ms),
            backoff_base: Duration::from_millis(config.dispatch.backoff_base_ms),
            ..DispatchConfig::default()
        },
    ));
    let _workers = dispatcher.spawn();

    let state = Arc::new(AppState::new(gate, store, queue, dispatcher));
    gateway::run_server(&config.gateway.host, config.gateway.port, state).await
}
