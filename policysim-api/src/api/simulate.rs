//! Policy simulation endpoint
//!
//! Steps run strictly in order: body validation, tier resolution, access
//! policy, dispatch, recording. Nothing reaches the text generator unless
//! every earlier step succeeded.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use policysim_common::models::UserIdentity;
use policysim_common::Tier;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult, INVALID_POLICY};
use crate::services::{authorize, requested_tier};
use crate::AppState;

/// Validated `POST /api/simulate` body
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateRequest {
    pub policy_description: String,
    pub tier: Tier,
}

impl SimulateRequest {
    /// Validate `{policyDescription, tier}`
    ///
    /// The description must be a non-empty string; the tier an integer in
    /// 1-4. The description is checked first.
    pub fn from_json(body: &Value) -> ApiResult<Self> {
        let policy_description = match body.get("policyDescription") {
            Some(Value::String(text)) if !text.is_empty() => text.clone(),
            _ => return Err(ApiError::InvalidRequest(INVALID_POLICY.to_string())),
        };
        let tier = requested_tier(body.get("tier"))?;
        Ok(Self {
            policy_description,
            tier,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub success: bool,
    pub response: String,
}

/// POST /api/simulate
pub async fn simulate(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<SimulateResponse>> {
    let Json(body) = payload.map_err(ApiError::from)?;
    let request = SimulateRequest::from_json(&body)?;

    let actual_tier = state.tiers.resolve(&user.id).await?;
    authorize(actual_tier, request.tier)?;

    let analysis = state
        .dispatcher
        .dispatch(request.tier, &request.policy_description)
        .await?;

    state
        .recorder
        .record_best_effort(&user.id, &request.policy_description, &analysis, request.tier)
        .await;

    Ok(Json(SimulateResponse {
        success: true,
        response: analysis,
    }))
}
