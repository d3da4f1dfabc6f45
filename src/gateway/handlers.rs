//! HTTP handlers: thin wrappers around the engine.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use uuid::Uuid;

use super::state::AppState;
use super::types::{
    ErrorResponse, HealthResponse, PaymentRequest, QueuedResponse, SummaryParams, SummaryResponse,
};
use crate::error::GatewayError;
use crate::models::{AdmitOutcome, ProcessorTag, amount_to_cents};

/// `POST /payments`: validate, then hand off to the admission gate.
/// Settlement happens asynchronously; a 201 only means "queued".
pub async fn submit_payment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QueuedResponse>), (StatusCode, Json<ErrorResponse>)> {
    // A body that fails to parse is the client's fault, same as a bad field.
    let Json(request) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(rejection.body_text())),
        )
    })?;
    let submission_id = Uuid::parse_str(&request.submission_id).map_err(|_| {
        let e = GatewayError::InvalidSubmissionId(request.submission_id.clone());
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string())))
    })?;
    let amount_cents = amount_to_cents(request.amount).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(e.to_string())),
        )
    })?;

    match state.gate.admit(submission_id, amount_cents) {
        AdmitOutcome::Accepted => Ok((StatusCode::CREATED, Json(QueuedResponse::queued()))),
        AdmitOutcome::Duplicate => Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(
                GatewayError::DuplicateSubmission.to_string(),
            )),
        )),
    }
}

/// `GET /payments-summary?from=..&to=..`
pub async fn payments_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryParams>,
) -> Json<SummaryResponse> {
    let from = params.from_bound();
    let to = params.to_bound();
    Json(SummaryResponse {
        default: state.store.summarize(ProcessorTag::Default, from, to),
        fallback: state.store.summarize(ProcessorTag::Fallback, from, to),
    })
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        queue_size: state.queue.len(),
        processed_count: state.dispatcher.processed_count(),
        uptime: state.uptime_secs(),
    })
}

/// `POST /purge-payments` (test/ops utility): drop ledger, in-flight markers
/// and any queued jobs.
pub async fn purge_payments(State(state): State<Arc<AppState>>) -> StatusCode {
    state.queue.clear();
    state.store.purge();
    tracing::info!("payment state purged");
    StatusCode::OK
}
