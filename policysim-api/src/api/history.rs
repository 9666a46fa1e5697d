//! Exchange history endpoint

use axum::{extract::State, Extension, Json};
use policysim_common::models::{Exchange, UserIdentity};
use tracing::error;

use crate::error::{ApiError, ApiResult, HISTORY_FAILED};
use crate::AppState;

/// GET /api/history
///
/// Returns the caller's exchanges, newest first.
pub async fn list_history(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<Exchange>>> {
    let exchanges = state.recorder.list(&user.id).await.map_err(|e| {
        error!(user_id = %user.id, error = %e, "History lookup failed");
        ApiError::Lookup(HISTORY_FAILED.to_string())
    })?;

    Ok(Json(exchanges))
}
