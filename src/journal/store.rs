use async_trait::async_trait;

use super::error::StoreError;
use super::model::{EntryDraft, EntryFilter, GroupKey, JournalEntry, SequenceSlot};

/// Persistence boundary for journal entries.
///
/// Reads outside a transaction see committed state only. All mutations go
/// through a [`JournalTx`].
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn JournalTx>, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<JournalEntry>, StoreError>;

    /// Entries ordered by (trade_date, category_id, subcategory_id, sequence_no)
    async fn list(&self, filter: &EntryFilter) -> Result<Vec<JournalEntry>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// One atomic unit of work. Dropping it without calling [`JournalTx::commit`]
/// rolls back every change made through it.
#[async_trait]
pub trait JournalTx: Send {
    /// Exclusively lock the given groups until commit or rollback.
    ///
    /// Implementations acquire the locks in `GroupKey` order so that two
    /// transactions locking overlapping sets cannot deadlock. Empty groups are
    /// lockable too.
    async fn lock_groups(&mut self, groups: &[GroupKey]) -> Result<(), StoreError>;

    /// Fetch an entry and lock its row
    async fn fetch(&mut self, id: i64) -> Result<Option<JournalEntry>, StoreError>;

    async fn count_group(&mut self, group: &GroupKey) -> Result<i64, StoreError>;

    /// Highest sequence number in the group, 0 when empty
    async fn max_sequence(&mut self, group: &GroupKey) -> Result<i32, StoreError>;

    /// Members of the group in creation (id) order
    async fn group_members(&mut self, group: &GroupKey) -> Result<Vec<SequenceSlot>, StoreError>;

    async fn set_sequence(&mut self, id: i64, sequence_no: i32) -> Result<(), StoreError>;

    async fn insert(&mut self, draft: &EntryDraft, sequence_no: i32) -> Result<JournalEntry, StoreError>;

    /// Overwrite group key, amounts and notes of an existing row
    async fn update(
        &mut self,
        id: i64,
        draft: &EntryDraft,
        sequence_no: i32,
    ) -> Result<Option<JournalEntry>, StoreError>;

    async fn delete(&mut self, id: i64) -> Result<bool, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Sort and dedupe groups into lock acquisition order
pub fn lock_order(groups: &[GroupKey]) -> Vec<GroupKey> {
    let mut ordered = groups.to_vec();
    ordered.sort();
    ordered.dedup();
    ordered
}
