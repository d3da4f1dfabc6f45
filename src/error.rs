use thiserror::Error;

use crate::models::ProcessorTag;

/// Gateway error taxonomy.
///
/// Validation and duplicate errors surface synchronously at admission.
/// Dispatch errors stay internal: the worker pool retries them and the
/// submitter never sees them (admission already returned success).
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("invalid submission id: {0}")]
    InvalidSubmissionId(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("duplicate submission")]
    DuplicateSubmission,

    #[error("circuit open for {0} processor")]
    CircuitOpen(ProcessorTag),

    #[error("settlement call timed out")]
    CallTimeout,

    #[error("processor returned status {0}")]
    ProcessorStatus(u16),

    #[error("processor call failed: {0}")]
    ProcessorCall(#[from] reqwest::Error),
}
