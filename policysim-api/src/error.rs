//! Error types for policysim-api
//!
//! Every failure a handler can produce maps to one status code and a
//! `{"error": "<message>"}` body.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const NO_TOKEN: &str = "No token provided";
pub const INVALID_TOKEN: &str = "Invalid token";
pub const INVALID_POLICY: &str = "Invalid policy description";
pub const INVALID_TIER: &str = "Invalid tier requested";
pub const INVALID_USER_TIER: &str = "Invalid user tier";
pub const INSUFFICIENT_TIER: &str =
    "Insufficient tier to use this analysis level. Please upgrade your account.";
pub const DISPATCH_FAILED: &str = "Failed to process policy simulation. Please try again later.";
pub const TIER_LOOKUP_FAILED: &str = "Failed to look up user tier";
pub const TIER_UPDATE_FAILED: &str = "Failed to update user tier";
pub const HISTORY_FAILED: &str = "Failed to fetch history";
pub const BODY_TOO_LARGE: &str = "Request body too large";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or rejected credential (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed body or out-of-range tier (400)
    #[error("{0}")]
    InvalidRequest(String),

    /// Body over the size limit (413)
    #[error("{}", BODY_TOO_LARGE)]
    PayloadTooLarge,

    /// Requested tier above the caller's tier (403)
    #[error("{0}")]
    Forbidden(String),

    /// Text-generation upstream failure (500, fixed message)
    #[error("{}", DISPATCH_FAILED)]
    Dispatch,

    /// External store read/write failure (500)
    #[error("{0}")]
    Lookup(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Dispatch | ApiError::Lookup(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Body cut off by the request size limit
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::InvalidRequest(rejection.body_text())
        }
    }
}

/// Give size-limit responses produced outside the handlers the `{error}` body
pub async fn payload_too_large_as_json(response: Response) -> Response {
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge.into_response()
    } else {
        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
