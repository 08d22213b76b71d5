use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};

use crate::app::AppState;
use crate::journal::{JournalEntry, UpdateEntryRequest};
use crate::middleware::{ApiResponse, ApiResult};

use super::{json_rejection, path_rejection};

/// PUT|PATCH /api/investment/tradingjournal/:id - partial update.
///
/// A changed trade_date, category_id or subcategory_id moves the entry to
/// another group, subject to that group's daily limit.
pub async fn put(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateEntryRequest>, JsonRejection>,
) -> ApiResult<JournalEntry> {
    let Path(id) = id.map_err(path_rejection)?;
    let Json(patch) = payload.map_err(json_rejection)?;
    Ok(ApiResponse::success(state.journal.update(id, &patch).await?))
}
