use tracing::debug;

use super::error::StoreError;
use super::model::GroupKey;
use super::store::JournalTx;

/// Keeps `sequence_no` dense (1..=N) inside a group.
///
/// Ordering always follows entry id (creation order), never the stored
/// sequence numbers, which may be stale after a delete or move.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequencer;

impl Sequencer {
    /// Sequence number for an entry appended to `group`
    pub async fn next_in(&self, tx: &mut dyn JournalTx, group: &GroupKey) -> Result<i32, StoreError> {
        Ok(tx.max_sequence(group).await? + 1)
    }

    /// Rewrite the group's sequence numbers as 1, 2, 3, ... in id order.
    ///
    /// Idempotent; an empty group is a no-op. Returns how many rows changed.
    pub async fn resequence(&self, tx: &mut dyn JournalTx, group: &GroupKey) -> Result<usize, StoreError> {
        let members = tx.group_members(group).await?;
        let mut changed = 0;

        for (position, slot) in members.iter().enumerate() {
            let expected = position as i32 + 1;
            if slot.sequence_no != expected {
                tx.set_sequence(slot.id, expected).await?;
                changed += 1;
            }
        }

        if changed > 0 {
            debug!(group = %group, changed, "resequenced journal group");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::memory::MemoryJournalStore;
    use crate::journal::store::JournalStore;
    use crate::journal::validate::validate_create;
    use crate::testing::{create_request, group};

    async fn sequences(tx: &mut dyn JournalTx, key: &GroupKey) -> Vec<i32> {
        tx.group_members(key)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.sequence_no)
            .collect()
    }

    #[tokio::test]
    async fn next_in_appends_after_max() {
        let store = MemoryJournalStore::new();
        let key = group("2024-01-01", 1, 1);
        let draft = validate_create(&create_request("2024-01-01", 1, 1)).unwrap();
        let mut tx = store.begin().await.unwrap();

        assert_eq!(Sequencer.next_in(tx.as_mut(), &key).await.unwrap(), 1);
        tx.insert(&draft, 1).await.unwrap();
        tx.insert(&draft, 2).await.unwrap();
        assert_eq!(Sequencer.next_in(tx.as_mut(), &key).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn closes_gaps_in_id_order() {
        let store = MemoryJournalStore::new();
        let key = group("2024-01-01", 1, 1);
        let draft = validate_create(&create_request("2024-01-01", 1, 1)).unwrap();
        let mut tx = store.begin().await.unwrap();

        // stale numbering, deliberately out of id order
        let first = tx.insert(&draft, 3).await.unwrap();
        tx.insert(&draft, 1).await.unwrap();
        assert_eq!(sequences(tx.as_mut(), &key).await, vec![3, 1]);

        let changed = Sequencer.resequence(tx.as_mut(), &key).await.unwrap();
        assert_eq!(changed, 2);
        assert_eq!(sequences(tx.as_mut(), &key).await, vec![1, 2]);
        assert_eq!(tx.fetch(first.id).await.unwrap().unwrap().sequence_no, 1);
    }

    #[tokio::test]
    async fn resequence_is_idempotent() {
        let store = MemoryJournalStore::new();
        let key = group("2024-01-01", 1, 1);
        let draft = validate_create(&create_request("2024-01-01", 1, 1)).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert(&draft, 2).await.unwrap();
        tx.insert(&draft, 3).await.unwrap();

        Sequencer.resequence(tx.as_mut(), &key).await.unwrap();
        let once = sequences(tx.as_mut(), &key).await;
        let changed = Sequencer.resequence(tx.as_mut(), &key).await.unwrap();

        assert_eq!(changed, 0);
        assert_eq!(sequences(tx.as_mut(), &key).await, once);
    }

    #[tokio::test]
    async fn empty_group_is_a_no_op() {
        let store = MemoryJournalStore::new();
        let mut tx = store.begin().await.unwrap();
        let changed = Sequencer
            .resequence(tx.as_mut(), &group("2024-01-01", 9, 9))
            .await
            .unwrap();
        assert_eq!(changed, 0);
    }
}
