//! Authentication middleware
//!
//! Every protected request carries `Authorization: Bearer <token>` or the
//! raw token. The token is verified against the identity service on each
//! request; the resolved [`UserIdentity`] is stored in the request
//! extensions for handlers.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use policysim_common::models::UserIdentity;
use tracing::warn;

use crate::error::{ApiError, INVALID_TOKEN, NO_TOKEN};
use crate::services::IdentityError;
use crate::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the credential from the `Authorization` header
///
/// Returns `NO_TOKEN` when the header is absent or blank, `INVALID_TOKEN`
/// when it is not UTF-8 or carries an empty bearer value.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let raw = match headers.get(AUTHORIZATION) {
        None => return Err(ApiError::Unauthorized(NO_TOKEN.to_string())),
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::Unauthorized(INVALID_TOKEN.to_string()))?,
    };

    if raw.trim().is_empty() {
        return Err(ApiError::Unauthorized(NO_TOKEN.to_string()));
    }

    let token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw).trim();
    if token.is_empty() {
        return Err(ApiError::Unauthorized(INVALID_TOKEN.to_string()));
    }

    Ok(token.to_string())
}

/// Authentication middleware
///
/// Returns 401 Unauthorized if the credential is missing or rejected.
/// Applied to protected routes only.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;

    let user = state.identity.verify(&token).await.map_err(|e| {
        match &e {
            IdentityError::Rejected(reason) => warn!("Token rejected: {}", reason),
            IdentityError::Unavailable(reason) => warn!("Token verification failed: {}", reason),
        }
        ApiError::Unauthorized(INVALID_TOKEN.to_string())
    })?;

    request.extensions_mut().insert::<UserIdentity>(user);

    Ok(next.run(request).await)
}
