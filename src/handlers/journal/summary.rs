use axum::extract::{rejection::PathRejection, Path, State};
use chrono::NaiveDate;

use crate::app::AppState;
use crate::journal::DaySummary;
use crate::middleware::{ApiResponse, ApiResult};

use super::path_rejection;

/// GET /api/investment/tradingjournal/summary/:date - per-group totals and remaining capacity
pub async fn get(
    State(state): State<AppState>,
    date: Result<Path<NaiveDate>, PathRejection>,
) -> ApiResult<DaySummary> {
    let Path(date) = date.map_err(path_rejection)?;
    Ok(ApiResponse::success(state.journal.day_summary(date).await?))
}
