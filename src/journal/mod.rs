//! Trading journal: entries grouped by (trade date, category, subcategory),
//! at most three per group, numbered densely from 1 in creation order.

pub mod error;
pub mod limiter;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod sequencer;
pub mod service;
pub mod store;
pub mod validate;

pub use error::{JournalError, StoreError};
pub use limiter::GroupLimiter;
pub use memory::MemoryJournalStore;
pub use model::{
    CreateEntryRequest, DaySummary, EntryFilter, GroupKey, GroupSummary, JournalEntry,
    UpdateEntryRequest, GROUP_CAPACITY,
};
pub use postgres::PgJournalStore;
pub use sequencer::Sequencer;
pub use service::{DeletedEntry, JournalService, ResequenceReport};
pub use store::{JournalStore, JournalTx};
