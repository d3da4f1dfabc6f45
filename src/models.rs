//! Core pipeline types: processor tags, payment jobs, settlement records.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GatewayError;

/// The two downstream processors. `Default` charges the lower settlement fee,
/// so routing always prefers it when usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorTag {
    Default,
    Fallback,
}

impl ProcessorTag {
    /// Routing preference order: cheapest first.
    pub const ALL: [ProcessorTag; 2] = [ProcessorTag::Default, ProcessorTag::Fallback];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorTag::Default => "default",
            ProcessorTag::Fallback => "fallback",
        }
    }

    /// Dense index for per-processor storage.
    pub(crate) fn index(&self) -> usize {
        match self {
            ProcessorTag::Default => 0,
            ProcessorTag::Fallback => 1,
        }
    }
}

impl std::fmt::Display for ProcessorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment accepted by the admission gate and awaiting settlement.
///
/// The amount is canonicalized to integer cents at admission so no float
/// arithmetic happens anywhere past the HTTP boundary.
#[derive(Debug, Clone)]
pub struct PaymentJob {
    pub submission_id: Uuid,
    pub amount_cents: i64,
    pub accepted_at: DateTime<Utc>,
    /// Settlement attempts performed so far.
    pub attempts: u32,
}

impl PaymentJob {
    pub fn new(submission_id: Uuid, amount_cents: i64) -> Self {
        Self {
            submission_id,
            amount_cents,
            accepted_at: Utc::now(),
            attempts: 0,
        }
    }
}

/// One settled payment. At most one of these exists per submission id across
/// both processor ledgers combined.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRecord {
    pub processor: ProcessorTag,
    pub submission_id: Uuid,
    pub amount_cents: i64,
    pub settled_at: DateTime<Utc>,
}

/// Outcome of the atomic admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    Accepted,
    Duplicate,
}

/// Aggregate over one processor's ledger for a time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorSummary {
    pub total_requests: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl Default for ProcessorSummary {
    fn default() -> Self {
        Self {
            total_requests: 0,
            total_amount: Decimal::ZERO,
        }
    }
}

/// Canonicalize a client-supplied amount to integer cents.
///
/// Rejects non-finite and non-positive values; sub-cent precision is resolved
/// with banker's rounding so repeated conversions never drift.
pub fn amount_to_cents(amount: f64) -> Result<i64, GatewayError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(GatewayError::InvalidAmount(amount.to_string()));
    }
    let decimal =
        Decimal::from_f64(amount).ok_or_else(|| GatewayError::InvalidAmount(amount.to_string()))?;
    let cents = (decimal * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    cents
        .to_i64()
        .filter(|c| *c > 0)
        .ok_or_else(|| GatewayError::InvalidAmount(amount.to_string()))
}

/// Integer cents back to a 2-decimal amount for reconciliation output.
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
