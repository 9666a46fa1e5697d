//! Session endpoints
//!
//! Thin pass-through to the identity service so the client shell needs no
//! direct access to it.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use policysim_common::models::{Session, SignUpOutcome};
use serde::Deserialize;
use tracing::{info, warn};

use super::auth::bearer_token;
use crate::error::{ApiError, ApiResult};
use crate::services::IdentityError;
use crate::AppState;

const CREDENTIALS_REQUIRED: &str = "Email and password are required";
const IDENTITY_UNAVAILABLE: &str = "Authentication service unavailable";

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsRequest {
    fn validated(payload: Result<Json<Self>, JsonRejection>) -> ApiResult<Self> {
        let Json(credentials) = payload.map_err(ApiError::from)?;
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(ApiError::InvalidRequest(CREDENTIALS_REQUIRED.to_string()));
        }
        Ok(credentials)
    }
}

/// Map an identity failure; `rejected` picks the error for refusals
fn identity_error(err: IdentityError, rejected: fn(String) -> ApiError) -> ApiError {
    match err {
        IdentityError::Rejected(reason) => rejected(reason),
        IdentityError::Unavailable(reason) => {
            warn!("Identity service unavailable: {}", reason);
            ApiError::Internal(IDENTITY_UNAVAILABLE.to_string())
        }
    }
}

/// POST /api/auth/signin
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<Json<Session>> {
    let credentials = CredentialsRequest::validated(payload)?;

    let session = state
        .identity
        .sign_in(credentials.email.trim(), &credentials.password)
        .await
        .map_err(|e| identity_error(e, ApiError::Unauthorized))?;

    info!(user_id = %session.user.id, "User signed in");
    Ok(Json(session))
}

/// POST /api/auth/signup
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<Json<SignUpOutcome>> {
    let credentials = CredentialsRequest::validated(payload)?;

    let outcome = state
        .identity
        .sign_up(credentials.email.trim(), &credentials.password)
        .await
        .map_err(|e| identity_error(e, ApiError::InvalidRequest))?;

    info!(
        user_id = %outcome.user.id,
        confirmed = outcome.session.is_some(),
        "User signed up"
    );
    Ok(Json(outcome))
}

/// POST /api/auth/signout
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let token = bearer_token(&headers)?;

    state
        .identity
        .sign_out(&token)
        .await
        .map_err(|e| identity_error(e, ApiError::Unauthorized))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/signout", post(sign_out))
}
