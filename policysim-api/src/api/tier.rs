//! Tier read and change endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use policysim_common::models::UserIdentity;
use policysim_common::Tier;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::services::requested_tier;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TierResponse {
    pub tier: Tier,
}

/// GET /api/tier
///
/// Creates the default record on first call.
pub async fn get_tier(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<TierResponse>> {
    let tier = state.tiers.resolve(&user.id).await?;
    Ok(Json(TierResponse { tier }))
}

/// PUT /api/tier
///
/// Body `{tier}`; the explicit tier-change action.
pub async fn change_tier(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<TierResponse>> {
    let Json(body) = payload.map_err(ApiError::from)?;
    let tier = requested_tier(body.get("tier"))?;

    state.tiers.change(&user.id, tier).await?;
    Ok(Json(TierResponse { tier }))
}
