//! Processor selection: health monitor plus circuit breaker, cheapest first.

use std::sync::Arc;

use tracing::debug;

use crate::breaker::BreakerPair;
use crate::health::HealthMonitor;
use crate::models::ProcessorTag;

/// Three-tier policy: prefer `default` when its breaker would pass and the
/// health monitor reports it healthy; else `fallback` under the same
/// condition; else `default` anyway. The forced last resort is deliberate:
/// default carries the lower settlement fee, so one more failed attempt there
/// beats settling expensively or giving up.
pub struct Router {
    health: Arc<HealthMonitor>,
    breakers: Arc<BreakerPair>,
}

impl Router {
    pub fn new(health: Arc<HealthMonitor>, breakers: Arc<BreakerPair>) -> Self {
        Self { health, breakers }
    }

    pub async fn select(&self) -> ProcessorTag {
        for tag in ProcessorTag::ALL {
            // Breaker first: no point probing a processor we would not call.
            if self.breakers.get(tag).would_reject() {
                continue;
            }
            if self.health.is_healthy(tag).await {
                return tag;
            }
        }
        debug!("both processors unusable, forcing default as last resort");
        ProcessorTag::Default
    }
}
