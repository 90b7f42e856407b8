use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

/// What the client sees for any failure it cannot fix itself.
pub const FETCH_FAILED: &str = "Failed to fetch car listings";
pub const INVALID_PRICE_FILTER: &str = "Invalid price filter";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            timestamp: Utc::now(),
        }
    }
}

// Errors as the HTTP layer sees them
#[derive(Debug)]
pub enum ApiError {
    /// The message is shown to the client as is.
    BadRequest(String),
    /// The detail is logged, the client gets the generic message.
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Internal(_) => FETCH_FAILED.to_string(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => ApiError::BadRequest(msg),
            err @ AppError::UnknownPlatform(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed");
        }
        let body = ErrorBody {
            error: self.message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
