use crate::error::WorkflowError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// HTTP face of a `WorkflowError`: a status code plus `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(pub WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        Self(e)
    }
}

/// Map workflow errors to HTTP status codes
pub fn status_for(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkflowError::ValidationError(_) => StatusCode::BAD_REQUEST,
        WorkflowError::Conflict(_) => StatusCode::CONFLICT,
        WorkflowError::Unauthenticated => StatusCode::UNAUTHORIZED,
        WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
        WorkflowError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        WorkflowError::Storage(_) | WorkflowError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        #[cfg(feature = "storage-rocksdb")]
        WorkflowError::RocksDb(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!(error = %self.0, "request failed");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
