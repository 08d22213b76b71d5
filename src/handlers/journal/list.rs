use axum::extract::{rejection::QueryRejection, Query, State};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::journal::{EntryFilter, JournalEntry};
use crate::middleware::{ApiResponse, ApiResult};

use super::query_rejection;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    /// Clamp paging to the configured bounds
    fn into_filter(self, default_limit: i64, max_limit: i64) -> Result<EntryFilter, ApiError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ApiError::bad_request("'from' must not be after 'to'"));
            }
        }
        if self.offset.is_some_and(|o| o < 0) {
            return Err(ApiError::bad_request("'offset' must not be negative"));
        }
        let limit = match self.limit {
            Some(l) if l <= 0 => return Err(ApiError::bad_request("'limit' must be positive")),
            Some(l) => l.min(max_limit),
            None => default_limit,
        };

        Ok(EntryFilter {
            from: self.from,
            to: self.to,
            category_id: self.category_id,
            subcategory_id: self.subcategory_id,
            limit: Some(limit),
            offset: self.offset,
        })
    }
}

/// GET /api/investment/tradingjournal - entries ordered by group and sequence
pub async fn get(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<JournalEntry>> {
    let Query(query) = query.map_err(query_rejection)?;
    let filter = query.into_filter(state.default_list_limit, state.max_list_limit)?;
    Ok(ApiResponse::success(state.journal.list(&filter).await?))
}
