use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::StoreError;
use super::model::{
    EntryDraft, EntryFilter, GroupKey, JournalEntry, SequenceSlot, GROUP_CAPACITY,
};
use super::store::{JournalStore, JournalTx};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i64,
    rows: BTreeMap<i64, JournalEntry>,
}

impl MemoryState {
    /// Same guarantees the Postgres schema enforces at commit time
    fn check_constraints(&self) -> Result<(), StoreError> {
        let mut seen: HashSet<(GroupKey, i32)> = HashSet::new();
        for entry in self.rows.values() {
            if entry.sequence_no < 1 || i64::from(entry.sequence_no) > GROUP_CAPACITY {
                return Err(StoreError::CheckViolation(format!(
                    "sequence_no {} out of range for entry {}",
                    entry.sequence_no, entry.id
                )));
            }
            if !seen.insert((entry.group(), entry.sequence_no)) {
                return Err(StoreError::UniqueViolation(format!(
                    "duplicate sequence_no {} in group {}",
                    entry.sequence_no,
                    entry.group()
                )));
            }
        }
        Ok(())
    }

    fn members(&self, group: &GroupKey) -> impl Iterator<Item = &JournalEntry> + '_ {
        let group = *group;
        self.rows.values().filter(move |e| e.group() == group)
    }
}

/// In-process journal store.
///
/// A transaction holds the store-wide mutex from `begin` until it is committed
/// or dropped, so writers are fully serialized. Changes are made on a copy
/// that only replaces the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournalStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_set_sequence: Arc<AtomicBool>,
}

impl MemoryJournalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `set_sequence` call in any transaction fail
    pub fn fail_next_set_sequence(&self) {
        self.fail_next_set_sequence.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JournalStore for MemoryJournalStore {
    async fn begin(&self) -> Result<Box<dyn JournalTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_next_set_sequence: self.fail_next_set_sequence.clone(),
        }))
    }

    async fn get(&self, id: i64) -> Result<Option<JournalEntry>, StoreError> {
        Ok(self.state.lock().await.rows.get(&id).cloned())
    }

    async fn list(&self, filter: &EntryFilter) -> Result<Vec<JournalEntry>, StoreError> {
        let state = self.state.lock().await;
        let mut entries: Vec<JournalEntry> = state
            .rows
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.group(), e.sequence_no, e.id));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(entries.into_iter().skip(offset).take(limit).collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_next_set_sequence: Arc<AtomicBool>,
}

#[async_trait]
impl JournalTx for MemoryTx {
    async fn lock_groups(&mut self, _groups: &[GroupKey]) -> Result<(), StoreError> {
        // already exclusive for the whole store
        Ok(())
    }

    async fn fetch(&mut self, id: i64) -> Result<Option<JournalEntry>, StoreError> {
        Ok(self.working.rows.get(&id).cloned())
    }

    async fn count_group(&mut self, group: &GroupKey) -> Result<i64, StoreError> {
        Ok(self.working.members(group).count() as i64)
    }

    async fn max_sequence(&mut self, group: &GroupKey) -> Result<i32, StoreError> {
        Ok(self
            .working
            .members(group)
            .map(|e| e.sequence_no)
            .max()
            .unwrap_or(0))
    }

    async fn group_members(&mut self, group: &GroupKey) -> Result<Vec<SequenceSlot>, StoreError> {
        Ok(self
            .working
            .members(group)
            .map(|e| SequenceSlot {
                id: e.id,
                sequence_no: e.sequence_no,
            })
            .collect())
    }

    async fn set_sequence(&mut self, id: i64, sequence_no: i32) -> Result<(), StoreError> {
        if self.fail_next_set_sequence.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Injected("set_sequence"));
        }
        if let Some(entry) = self.working.rows.get_mut(&id) {
            entry.sequence_no = sequence_no;
        }
        Ok(())
    }

    async fn insert(&mut self, draft: &EntryDraft, sequence_no: i32) -> Result<JournalEntry, StoreError> {
        self.working.last_id += 1;
        let now = Utc::now();
        let entry = JournalEntry {
            id: self.working.last_id,
            trade_date: draft.group.trade_date,
            category_id: draft.group.category_id,
            subcategory_id: draft.group.subcategory_id,
            sequence_no,
            trade_entry: draft.amounts.trade_entry,
            trade_exit: draft.amounts.trade_exit,
            profit_amount: draft.amounts.profit_amount,
            loss_amount: draft.amounts.loss_amount,
            brokerage: draft.amounts.brokerage,
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        self.working.rows.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn update(
        &mut self,
        id: i64,
        draft: &EntryDraft,
        sequence_no: i32,
    ) -> Result<Option<JournalEntry>, StoreError> {
        let Some(entry) = self.working.rows.get_mut(&id) else {
            return Ok(None);
        };
        entry.trade_date = draft.group.trade_date;
        entry.category_id = draft.group.category_id;
        entry.subcategory_id = draft.group.subcategory_id;
        entry.sequence_no = sequence_no;
        entry.trade_entry = draft.amounts.trade_entry;
        entry.trade_exit = draft.amounts.trade_exit;
        entry.profit_amount = draft.amounts.profit_amount;
        entry.loss_amount = draft.amounts.loss_amount;
        entry.brokerage = draft.amounts.brokerage;
        entry.notes = draft.notes.clone();
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn delete(&mut self, id: i64) -> Result<bool, StoreError> {
        Ok(self.working.rows.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        working.check_constraints()?;
        *guard = working;
        Ok(())
    }
}
