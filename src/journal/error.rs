use std::collections::HashMap;

use thiserror::Error;

use super::model::{GroupKey, GROUP_CAPACITY};

/// Failures reported by a journal store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Serialization failure, deadlock or lock timeout
    #[error("Concurrent access conflict: {0}")]
    Contention(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Injected failure: {0}")]
    Injected(&'static str),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                let code = db_err.code().map(|c| c.into_owned());
                match code.as_deref() {
                    Some("23505") => StoreError::UniqueViolation(message),
                    Some("23503") => StoreError::ForeignKeyViolation(message),
                    Some("23514") => StoreError::CheckViolation(message),
                    Some("23502") => StoreError::InvalidValue(message),
                    Some(code) if code.starts_with("22") => StoreError::InvalidValue(message),
                    Some("40001") | Some("40P01") | Some("55P03") => StoreError::Contention(message),
                    _ => StoreError::Sqlx(err),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Sqlx(err),
        }
    }
}

/// Domain errors surfaced by the journal service
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("Daily limit reached: group {0} already has {} entries", GROUP_CAPACITY)]
    CapacityExceeded(GroupKey),

    #[error("Journal entry {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl JournalError {
    pub fn validation(message: impl Into<String>, field_errors: HashMap<String, String>) -> Self {
        JournalError::Validation {
            message: message.into(),
            field_errors,
        }
    }

    /// True for failures the caller cannot fix by changing its input
    pub fn is_internal(&self) -> bool {
        matches!(self, JournalError::Store(_))
    }
}

impl From<StoreError> for JournalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) => {
                JournalError::Conflict(format!("Duplicate journal entry: {}", msg))
            }
            StoreError::ForeignKeyViolation(msg) => {
                JournalError::Conflict(format!("Unknown category or subcategory: {}", msg))
            }
            StoreError::CheckViolation(msg) => {
                JournalError::Conflict(format!("Entry violates a journal constraint: {}", msg))
            }
            StoreError::InvalidValue(msg) => JournalError::validation(msg, HashMap::new()),
            StoreError::Contention(msg) => JournalError::Conflict(format!(
                "Journal group was modified concurrently, please retry: {}",
                msg
            )),
            other => JournalError::Store(other),
        }
    }
}
