//! 统一的 API 错误类型与 JSON 错误响应。

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::drive::DriveError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    RequestTimeout(String),
    Internal(String),
    RangeNotSatisfiable(u64),
    Unauthorized,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RangeNotSatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut headers = HeaderMap::new();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::RequestTimeout(msg) => msg,
            ApiError::Internal(msg) => {
                error!(error = msg, "internal error");
                msg
            }
            ApiError::RangeNotSatisfiable(size) => {
                if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                    headers.insert(header::CONTENT_RANGE, value);
                }
                "range not satisfiable".to_string()
            }
            ApiError::Unauthorized => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="vault-drive""#),
                );
                "unauthorized".to_string()
            }
        };
        (status, headers, Json(json!({ "error": message }))).into_response()
    }
}

impl From<DriveError> for ApiError {
    fn from(error: DriveError) -> Self {
        let message = error.to_string();
        match error {
            DriveError::AccessDenied(_) => ApiError::Forbidden(message),
            DriveError::NotFound { .. } => ApiError::NotFound(message),
            DriveError::InvalidArgument(_) | DriveError::UploadInterrupted { .. } => {
                ApiError::BadRequest(message)
            }
            DriveError::AlreadyExists(_) => ApiError::Conflict(message),
            DriveError::Cancelled => ApiError::RequestTimeout(message),
            DriveError::Io { .. } | DriveError::AllUploadsFailed | DriveError::Internal(_) => {
                ApiError::Internal(message)
            }
        }
    }
}
