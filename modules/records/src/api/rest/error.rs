use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::rest::dto::ErrorBody;
use crate::domain::error::DomainError;

/// Error returned by every handler, rendered as `{ "code": .., "message": .. }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "no valid session")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.status.as_u16(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Map domain error to an HTTP error. Store faults are logged here and answered
/// without detail.
impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match &e {
            DomainError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            DomainError::InvalidPagination { .. }
            | DomainError::InvalidSortKey { .. }
            | DomainError::NoOpUpdate
            | DomainError::Validation { .. } => Self::bad_request(e.to_string()),
            DomainError::ContextCanceled => {
                tracing::warn!("request canceled before completion");
                Self::new(StatusCode::REQUEST_TIMEOUT, "request canceled")
            }
            DomainError::Constraint { .. }
            | DomainError::Transaction { .. }
            | DomainError::Commit { .. }
            | DomainError::Decode { .. }
            | DomainError::Storage { .. } => {
                tracing::error!(error = ?e, "Database error occurred");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rej: JsonRejection) -> Self {
        Self::bad_request(format!("incorrect json: {}", rej.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rej: QueryRejection) -> Self {
        Self::bad_request(format!("invalid query: {}", rej.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rej: PathRejection) -> Self {
        Self::bad_request(format!("invalid path: {}", rej.body_text()))
    }
}

// Extractors whose rejections use the same error body as everything else.

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
