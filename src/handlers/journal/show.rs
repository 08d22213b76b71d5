use axum::extract::{rejection::PathRejection, Path, State};

use crate::app::AppState;
use crate::journal::JournalEntry;
use crate::middleware::{ApiResponse, ApiResult};

use super::path_rejection;

/// GET /api/investment/tradingjournal/:id
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<JournalEntry> {
    let Path(id) = id.map_err(path_rejection)?;
    Ok(ApiResponse::success(state.journal.get(id).await?))
}
