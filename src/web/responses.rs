use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::workflow::{UploadWorkflow, WorkflowError, WorkflowSnapshot};

/// Canonical JSON payload for error responses.
#[derive(Debug, Serialize, Clone)]
pub struct ApiMessage {
    pub message: String,
}

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ApiMessage>);

/// Helper for controllers that need to return `(StatusCode, Json<ApiMessage>)`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiMessage::new(message)))
}

/// Every workflow endpoint answers with the snapshot, whatever the outcome.
pub fn snapshot_response(
    status: StatusCode,
    workflow: &UploadWorkflow,
) -> (StatusCode, Json<WorkflowSnapshot>) {
    (status, Json(workflow.snapshot()))
}

pub fn status_for(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::NoValidImages { .. }
        | WorkflowError::TooManyImages { .. }
        | WorkflowError::NothingSelected => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::UploadInProgress => StatusCode::CONFLICT,
        WorkflowError::TransferFailed => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::SelectionSource;

    #[test]
    fn workflow_errors_map_to_statuses() {
        assert_eq!(
            status_for(&WorkflowError::NoValidImages {
                origin: SelectionSource::Drop
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&WorkflowError::UploadInProgress),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&WorkflowError::TransferFailed),
            StatusCode::BAD_GATEWAY
        );
    }
}
