use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};

use crate::error::ApiError;

pub mod create;
pub mod delete;
pub mod list;
pub mod resequence;
pub mod show;
pub mod summary;
pub mod update;

pub use create::post as entry_create;
pub use delete::delete as entry_delete;
pub use list::get as entry_list;
pub use resequence::post as group_resequence;
pub use show::get as entry_show;
pub use summary::get as day_summary;
pub use update::put as entry_update;

pub(crate) fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::invalid_json(rejection.body_text())
}

pub(crate) fn path_rejection(rejection: PathRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

pub(crate) fn query_rejection(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}
