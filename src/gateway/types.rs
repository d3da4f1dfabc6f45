//! Request/response DTOs for the HTTP boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ProcessorSummary;

/// Body of `POST /payments`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub submission_id: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub status: &'static str,
}

impl QueuedResponse {
    pub fn queued() -> Self {
        Self { status: "queued" }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Query string of `GET /payments-summary`. Bounds that are missing or fail
/// to parse are treated as open-ended, never as an error.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl SummaryParams {
    pub fn from_bound(&self) -> Option<DateTime<Utc>> {
        parse_bound(self.from.as_deref())
    }

    pub fn to_bound(&self) -> Option<DateTime<Utc>> {
        parse_bound(self.to.as_deref())
    }
}

fn parse_bound(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Body of `GET /payments-summary`.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub default: ProcessorSummary,
    pub fallback: ProcessorSummary,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub queue_size: usize,
    pub processed_count: u64,
    pub uptime: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_summary_bounds_parse_rfc3339() {
        let params = SummaryParams {
            from: Some("2025-01-01T00:00:00Z".to_string()),
            to: Some("not-a-date".to_string()),
        };
        assert!(params.from_bound().is_some());
        // Unparsable bound is open-ended, not an error.
        assert!(params.to_bound().is_none());
        assert!(SummaryParams::default().from_bound().is_none());
    }

    #[test]
    fn test_summary_serializes_amount_as_number() {
        let response = SummaryResponse {
            default: ProcessorSummary {
                total_requests: 10,
                total_amount: Decimal::new(19900, 2),
            },
            fallback: ProcessorSummary::default(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["default"]["totalRequests"], 10);
        assert_eq!(json["default"]["totalAmount"].as_f64().unwrap(), 199.00);
        assert_eq!(json["fallback"]["totalAmount"].as_f64().unwrap(), 0.0);
    }

    #[test]
    fn test_payment_request_field_names() {
        let request: PaymentRequest = serde_json::from_str(
            r#"{"submissionId": "4a7901b8-7d0d-4d9d-8d5f-111111111111", "amount": 19.9}"#,
        )
        .unwrap();
        assert_eq!(request.amount, 19.9);
        assert!(request.submission_id.starts_with("4a7901b8"));
    }
}
