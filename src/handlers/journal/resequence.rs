use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::app::AppState;
use crate::journal::{GroupKey, ResequenceReport};
use crate::middleware::{ApiResponse, ApiResult};

use super::json_rejection;

/// POST /api/investment/tradingjournal/resequence - renumber one group 1..N
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<GroupKey>, JsonRejection>,
) -> ApiResult<ResequenceReport> {
    let Json(group) = payload.map_err(json_rejection)?;
    Ok(ApiResponse::success(state.journal.resequence(group).await?))
}
