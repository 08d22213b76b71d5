use super::error::{JournalError, StoreError};
use super::model::{GroupKey, GROUP_CAPACITY};
use super::store::JournalTx;

/// Decides whether a group may take one more entry.
///
/// Callers must hold the group lock (see [`JournalTx::lock_groups`]) from the
/// check until the insert or move that follows it, otherwise two writers can
/// both observe a free slot.
#[derive(Debug, Clone, Copy)]
pub struct GroupLimiter {
    capacity: i64,
}

impl Default for GroupLimiter {
    fn default() -> Self {
        Self {
            capacity: GROUP_CAPACITY,
        }
    }
}

impl GroupLimiter {
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    pub async fn can_admit(&self, tx: &mut dyn JournalTx, group: &GroupKey) -> Result<bool, StoreError> {
        Ok(tx.count_group(group).await? < self.capacity)
    }

    /// Like [`Self::can_admit`], but reports a full group as `CapacityExceeded`
    pub async fn admit(&self, tx: &mut dyn JournalTx, group: &GroupKey) -> Result<(), JournalError> {
        if self.can_admit(tx, group).await? {
            Ok(())
        } else {
            Err(JournalError::CapacityExceeded(*group))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::memory::MemoryJournalStore;
    use crate::journal::store::JournalStore;
    use crate::journal::validate::validate_create;
    use crate::testing::{create_request, group};

    #[tokio::test]
    async fn admits_until_capacity() {
        let store = MemoryJournalStore::new();
        let limiter = GroupLimiter::default();
        let key = group("2024-01-01", 1, 1);
        let draft = validate_create(&create_request("2024-01-01", 1, 1)).unwrap();

        let mut tx = store.begin().await.unwrap();
        for seq in 1..=3 {
            assert!(limiter.can_admit(tx.as_mut(), &key).await.unwrap());
            tx.insert(&draft, seq).await.unwrap();
        }
        assert!(!limiter.can_admit(tx.as_mut(), &key).await.unwrap());
        assert!(matches!(
            limiter.admit(tx.as_mut(), &key).await,
            Err(JournalError::CapacityExceeded(g)) if g == key
        ));

        // other groups are unaffected
        assert!(limiter.can_admit(tx.as_mut(), &group("2024-01-02", 1, 1)).await.unwrap());
    }
}
