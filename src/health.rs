//! Processor health cache with a hard rate limit on probes.
//!
//! At most one probe per processor per interval, system-wide: the cache entry
//! sits behind an async mutex that is held across the probe, so concurrent
//! callers in a stale window wait for the in-flight probe and then reuse its
//! result instead of issuing their own.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::models::ProcessorTag;
use crate::processor::Processors;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(5000);

#[derive(Debug)]
struct HealthState {
    failing: bool,
    min_response_time_ms: u64,
    last_probed_at: Option<Instant>,
}

impl HealthState {
    fn fresh_within(&self, interval: Duration) -> bool {
        self.last_probed_at
            .is_some_and(|probed| probed.elapsed() < interval)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            failing: false,
            min_response_time_ms: 0,
            last_probed_at: None,
        }
    }
}

pub struct HealthMonitor {
    processors: Processors,
    probe_interval: Duration,
    states: [Mutex<HealthState>; 2],
}

impl HealthMonitor {
    pub fn new(processors: Processors, probe_interval: Duration) -> Self {
        Self {
            processors,
            probe_interval,
            states: [Mutex::default(), Mutex::default()],
        }
    }

    /// Cached health, probing at most once per interval. Probe failure
    /// (timeout, connect error, non-2xx) marks the processor failing: better
    /// to skip a live processor briefly than to keep sending into a dead one.
    pub async fn is_healthy(&self, tag: ProcessorTag) -> bool {
        let mut state = self.states[tag.index()].lock().await;
        if state.fresh_within(self.probe_interval) {
            return !state.failing;
        }

        match self.processors.get(tag).probe_health().await {
            Ok(probe) => {
                debug!(
                    processor = %tag,
                    failing = probe.failing,
                    min_response_time = probe.min_response_time,
                    "health probe"
                );
                state.failing = probe.failing;
                state.min_response_time_ms = probe.min_response_time;
            }
            Err(e) => {
                warn!(processor = %tag, error = %e, "health probe failed, marking failing");
                state.failing = true;
            }
        }
        state.last_probed_at = Some(Instant::now());
        !state.failing
    }

    /// Last observed minimum response time; 0 until the first probe lands.
    pub async fn min_response_time(&self, tag: ProcessorTag) -> u64 {
        self.states[tag.index()].lock().await.min_response_time_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::processor::{HealthProbe, ProcessorApi, SettlementRequest};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct ScriptedProbe {
        probes: AtomicUsize,
        failing: AtomicBool,
        error: AtomicBool,
    }

    impl ScriptedProbe {
        fn healthy() -> Arc<Self> {
            Arc::new(Self {
                probes: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                error: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl ProcessorApi for ScriptedProbe {
        async fn submit_settlement(&self, _: &SettlementRequest) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn probe_health(&self) -> Result<HealthProbe, GatewayError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.error.load(Ordering::SeqCst) {
                return Err(GatewayError::ProcessorStatus(500));
            }
            Ok(HealthProbe {
                failing: self.failing.load(Ordering::SeqCst),
                min_response_time: 42,
            })
        }
    }

    fn monitor(api: Arc<ScriptedProbe>, interval: Duration) -> HealthMonitor {
        let processors = Processors::new(api.clone(), api);
        HealthMonitor::new(processors, interval)
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_probe() {
        let api = ScriptedProbe::healthy();
        let monitor = Arc::new(monitor(api.clone(), Duration::from_secs(5)));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let monitor = monitor.clone();
            handles.push(tokio::spawn(async move {
                monitor.is_healthy(ProcessorTag::Default).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(api.probes.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.min_response_time(ProcessorTag::Default).await, 42);
    }

    #[tokio::test]
    async fn test_stale_cache_triggers_new_probe() {
        let api = ScriptedProbe::healthy();
        let monitor = monitor(api.clone(), Duration::from_millis(30));

        assert!(monitor.is_healthy(ProcessorTag::Default).await);
        // Within the interval: cached, no new probe.
        assert!(monitor.is_healthy(ProcessorTag::Default).await);
        assert_eq!(api.probes.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(40)).await;
        api.failing.store(true, Ordering::SeqCst);
        assert!(!monitor.is_healthy(ProcessorTag::Default).await);
        assert_eq!(api.probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_error_fails_closed() {
        let api = ScriptedProbe::healthy();
        api.error.store(true, Ordering::SeqCst);
        let monitor = monitor(api.clone(), Duration::from_secs(5));

        assert!(!monitor.is_healthy(ProcessorTag::Fallback).await);
        // Cached failing verdict, still only one probe.
        assert!(!monitor.is_healthy(ProcessorTag::Fallback).await);
        assert_eq!(api.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_processors_cached_independently() {
        let api = ScriptedProbe::healthy();
        let monitor = monitor(api.clone(), Duration::from_secs(5));

        monitor.is_healthy(ProcessorTag::Default).await;
        monitor.is_healthy(ProcessorTag::Fallback).await;
        // One probe per processor; both now cached.
        assert_eq!(api.probes.load(Ordering::SeqCst), 2);
        monitor.is_healthy(ProcessorTag::Default).await;
        monitor.is_healthy(ProcessorTag::Fallback).await;
        assert_eq!(api.probes.load(Ordering::SeqCst), 2);
    }
}
