//! HTTP-layer error mapping (spec §6 status codes, §7 error taxonomy).
//!
//! Grounded on the teacher's `api::error::ApiError` (`IntoResponse` impl,
//! `{"error": {...}}` JSON body shape), extended with the full status-code
//! table from spec.md §6/§7 and a `From<DomainError>` conversion — the
//! teacher only ever converts its own `MatchingError`, this crate's engine
//! errors need the same treatment one layer up.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::error::DomainError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error")]
    Internal(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::Auth => ApiError::Unauthorized,
            DomainError::Forbidden => ApiError::Forbidden,
            DomainError::NotFound(what) => ApiError::NotFound(what),
            DomainError::InsufficientFunds => ApiError::BadRequest("insufficient funds".into()),
            DomainError::InsufficientAsset => ApiError::BadRequest("insufficient asset".into()),
            DomainError::IllegalState(msg) => ApiError::BadRequest(msg),
            DomainError::Conflict(msg) => ApiError::BadRequest(msg),
            DomainError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION", msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "AUTH", self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "AUTH", self.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BUSINESS_RULE", msg.clone()),
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
