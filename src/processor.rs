//! Downstream processor seam: wire DTOs, the `ProcessorApi` trait, and the
//! reqwest-backed client for the real settlement and health endpoints.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::models::ProcessorTag;

/// Body of `POST /payments` on a downstream processor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub submission_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub requested_at: DateTime<Utc>,
}

/// Body of `GET /payments/service-health`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthProbe {
    pub failing: bool,
    pub min_response_time: u64,
}

/// What the pipeline needs from a processor. The HTTP client implements it
/// for production; tests inject scripted implementations.
#[async_trait]
pub trait ProcessorApi: Send + Sync {
    /// Attempt one settlement. `Ok` means the processor accepted (2xx).
    async fn submit_settlement(&self, request: &SettlementRequest) -> Result<(), GatewayError>;

    /// One health probe. Callers must respect the system-wide rate limit of
    /// one probe per 5 s per processor; that is enforced by `HealthMonitor`,
    /// not here.
    async fn probe_health(&self) -> Result<HealthProbe, GatewayError>;
}

/// HTTP client for one downstream processor.
pub struct HttpProcessor {
    base_url: String,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl HttpProcessor {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
            probe_timeout,
        })
    }
}

#[async_trait]
impl ProcessorApi for HttpProcessor {
    async fn submit_settlement(&self, request: &SettlementRequest) -> Result<(), GatewayError> {
        // The per-attempt deadline lives in the dispatcher; no request-level
        // timeout here so the two cannot disagree.
        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GatewayError::ProcessorStatus(status.as_u16()))
        }
    }

    async fn probe_health(&self) -> Result<HealthProbe, GatewayError> {
        let response = self
            .client
            .get(format!("{}/payments/service-health", self.base_url))
            .timeout(self.probe_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::ProcessorStatus(status.as_u16()));
        }
        Ok(response.json::<HealthProbe>().await?)
    }
}

/// The pair of downstream processors, addressable by tag.
#[derive(Clone)]
pub struct Processors {
    default: Arc<dyn ProcessorApi>,
    fallback: Arc<dyn ProcessorApi>,
}

impl Processors {
    pub fn new(default: Arc<dyn ProcessorApi>, fallback: Arc<dyn ProcessorApi>) -> Self {
        Self { default, fallback }
    }

    pub fn get(&self, tag: ProcessorTag) -> &dyn ProcessorApi {
        match tag {
            ProcessorTag::Default => self.default.as_ref(),
            ProcessorTag::Fallback => self.fallback.as_ref(),
        }
    }
}
