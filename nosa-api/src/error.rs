//! JSON error responses.
use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nosa_core::TransitionError;
use serde::Serialize;
use tracing::error;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        if err.is_conflict() {
            Self {
                status: StatusCode::CONFLICT,
                detail: err.to_string(),
            }
        } else {
            Self::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(detail = %self.detail, "Request failed");
        }
        (
            self.status,
            Json(ErrorBody {
                detail: &self.detail,
            }),
        )
            .into_response()
    }
}

/// Response for a handler that panicked.
pub(crate) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let reason = if let Some(reason) = panic.downcast_ref::<String>() {
        reason.as_str()
    } else if let Some(reason) = panic.downcast_ref::<&str>() {
        reason
    } else {
        "unknown panic"
    };
    ApiError::internal(format!("Internal server error: {reason}")).into_response()
}
