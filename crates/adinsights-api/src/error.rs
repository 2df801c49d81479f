use adinsights_core::AdInsightsError;
use adinsights_report::ExportError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] AdInsightsError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Upstream(ref err) => match err.root() {
                AdInsightsError::Validation {
                    requested,
                    available,
                } => (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "invalid platform",
                        "available_platforms": available,
                        "requested_platform": requested,
                    }),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": err.to_string() }),
                ),
            },
            ApiError::Export(ExportError::UnsupportedFormat(_)) | ApiError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": self.to_string() }),
            ),
            ApiError::Export(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
            ApiError::NotFound(ref message) => {
                (StatusCode::NOT_FOUND, json!({ "error": message }))
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), body = %body, "request failed");
        }

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
