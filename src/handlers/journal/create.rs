use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::app::AppState;
use crate::journal::{CreateEntryRequest, JournalEntry};
use crate::middleware::{ApiResponse, ApiResult};

use super::json_rejection;

/// POST /api/investment/tradingjournal - record a trade in its day group
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> ApiResult<JournalEntry> {
    let Json(request) = payload.map_err(json_rejection)?;
    let entry = state.journal.create(&request).await?;
    Ok(ApiResponse::created(entry))
}
