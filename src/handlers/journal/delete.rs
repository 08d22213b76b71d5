use axum::extract::{rejection::PathRejection, Path, State};

use crate::app::AppState;
use crate::journal::DeletedEntry;
use crate::middleware::{ApiResponse, ApiResult};

use super::path_rejection;

/// DELETE /api/investment/tradingjournal/:id
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeletedEntry> {
    let Path(id) = id.map_err(path_rejection)?;
    Ok(ApiResponse::success(state.journal.delete(id).await?))
}
