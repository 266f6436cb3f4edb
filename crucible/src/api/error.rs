use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crucible_core::ResourceError;
use serde_json::json;

/// Error returned by every handler, rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(pub ResourceError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ResourceError::Validation(_) => StatusCode::BAD_REQUEST,
            ResourceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ResourceError::NotFound(_) => StatusCode::NOT_FOUND,
            ResourceError::Integrity(_) | ResourceError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ResourceError> for ApiError {
    fn from(e: ResourceError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ResourceError::validation(format!(
            "Request body invalid: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_server_fault() {
            tracing::error!(%status, "request failed: {:#}", self.0);
        } else {
            tracing::debug!(%status, "request rejected: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
