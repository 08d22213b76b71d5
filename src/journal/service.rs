use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use super::error::JournalError;
use super::limiter::GroupLimiter;
use super::model::{
    CreateEntryRequest, DaySummary, EntryFilter, GroupKey, JournalEntry, UpdateEntryRequest,
};
use super::sequencer::Sequencer;
use super::store::JournalStore;
use super::validate::{validate_create, validate_update};

/// How often update/delete re-read an entry whose group moved underneath them
const MAX_LOCK_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct DeletedEntry {
    pub id: i64,
    pub trade_date: NaiveDate,
    pub category_id: i64,
    pub subcategory_id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResequenceReport {
    #[serde(flatten)]
    pub group: GroupKey,
    pub changed: usize,
    pub entries: Vec<JournalEntry>,
}

/// Orchestrates capacity checks, writes and resequencing, one transaction per call.
#[derive(Clone)]
pub struct JournalService {
    store: Arc<dyn JournalStore>,
    limiter: GroupLimiter,
    sequencer: Sequencer,
}

impl JournalService {
    pub fn new(store: Arc<dyn JournalStore>) -> Self {
        Self {
            store,
            limiter: GroupLimiter::default(),
            sequencer: Sequencer,
        }
    }

    pub fn store(&self) -> &Arc<dyn JournalStore> {
        &self.store
    }

    pub async fn create(&self, request: &CreateEntryRequest) -> Result<JournalEntry, JournalError> {
        let draft = validate_create(request)?;
        let group = draft.group;

        let result = async {
            let mut tx = self.store.begin().await?;
            tx.lock_groups(&[group]).await?;
            self.limiter.admit(tx.as_mut(), &group).await?;

            let sequence_no = self.sequencer.next_in(tx.as_mut(), &group).await?;
            let entry = tx.insert(&draft, sequence_no).await?;
            tx.commit().await?;
            Ok::<_, JournalError>(entry)
        }
        .await;

        if let Ok(entry) = &result {
            info!(id = entry.id, group = %group, sequence_no = entry.sequence_no, "journal entry created");
        }
        result.inspect_err(|e| log_failure("create", Some(&group), None, e))
    }

    pub async fn get(&self, id: i64) -> Result<JournalEntry, JournalError> {
        self.store
            .get(id)
            .await
            .map_err(JournalError::from)
            .inspect_err(|e| log_failure("get", None, Some(id), e))?
            .ok_or(JournalError::NotFound(id))
    }

    pub async fn list(&self, filter: &EntryFilter) -> Result<Vec<JournalEntry>, JournalError> {
        self.store
            .list(filter)
            .await
            .map_err(JournalError::from)
            .inspect_err(|e| log_failure("list", None, None, e))
    }

    /// Apply a partial update. Changing any part of the group key moves the
    /// entry: the target group must have room, the vacated group is closed up
    /// and both end dense. Either everything commits or nothing does.
    pub async fn update(&self, id: i64, patch: &UpdateEntryRequest) -> Result<JournalEntry, JournalError> {
        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            let current = self.get(id).await?;
            // reject bad input before touching any lock
            let target = validate_update(&current, patch)?.group;
            let source = current.group();

            let outcome = self.try_update(id, patch, source, target).await;
            match outcome {
                Ok(Some(entry)) => return Ok(entry),
                Ok(None) => {
                    warn!(id, attempt, "journal entry changed group during update, retrying");
                }
                Err(e) => {
                    log_failure("update", Some(&target), Some(id), &e);
                    return Err(e);
                }
            }
        }
        Err(moved_concurrently(id))
    }

    /// `Ok(None)` when the row no longer sits in `source` once locked
    async fn try_update(
        &self,
        id: i64,
        patch: &UpdateEntryRequest,
        source: GroupKey,
        target: GroupKey,
    ) -> Result<Option<JournalEntry>, JournalError> {
        let mut tx = self.store.begin().await?;
        tx.lock_groups(&[source, target]).await?;

        let locked = tx.fetch(id).await?.ok_or(JournalError::NotFound(id))?;
        if locked.group() != source {
            return Ok(None);
        }
        let draft = validate_update(&locked, patch)?;
        if draft.group != target {
            return Ok(None);
        }

        if target == source {
            let entry = tx
                .update(id, &draft, locked.sequence_no)
                .await?
                .ok_or(JournalError::NotFound(id))?;
            tx.commit().await?;
            info!(id, group = %source, "journal entry updated");
            return Ok(Some(entry));
        }

        self.limiter.admit(tx.as_mut(), &target).await?;
        // the moved entry goes to the end of the target group; its members keep their numbers
        let sequence_no = self.sequencer.next_in(tx.as_mut(), &target).await?;
        let entry = tx
            .update(id, &draft, sequence_no)
            .await?
            .ok_or(JournalError::NotFound(id))?;

        self.sequencer.resequence(tx.as_mut(), &source).await?;
        tx.commit().await?;
        info!(
            id,
            from = %source,
            to = %target,
            sequence_no = entry.sequence_no,
            "journal entry moved"
        );
        Ok(Some(entry))
    }

    pub async fn delete(&self, id: i64) -> Result<DeletedEntry, JournalError> {
        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            let group = self.get(id).await?.group();

            match self.try_delete(id, group).await {
                Ok(true) => {
                    info!(id, group = %group, "journal entry deleted");
                    return Ok(DeletedEntry {
                        id,
                        trade_date: group.trade_date,
                        category_id: group.category_id,
                        subcategory_id: group.subcategory_id,
                        message: "Journal entry deleted".to_string(),
                    });
                }
                Ok(false) => {
                    warn!(id, attempt, "journal entry changed group during delete, retrying");
                }
                Err(e) => {
                    log_failure("delete", Some(&group), Some(id), &e);
                    return Err(e);
                }
            }
        }
        Err(moved_concurrently(id))
    }

    async fn try_delete(&self, id: i64, group: GroupKey) -> Result<bool, JournalError> {
        let mut tx = self.store.begin().await?;
        tx.lock_groups(&[group]).await?;

        let locked = tx.fetch(id).await?.ok_or(JournalError::NotFound(id))?;
        if locked.group() != group {
            return Ok(false);
        }
        if !tx.delete(id).await? {
            return Err(JournalError::NotFound(id));
        }
        self.sequencer.resequence(tx.as_mut(), &group).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Force dense numbering on a group, e.g. after manual edits in the database
    pub async fn resequence(&self, group: GroupKey) -> Result<ResequenceReport, JournalError> {
        let result = async {
            let mut tx = self.store.begin().await?;
            tx.lock_groups(&[group]).await?;
            let changed = self.sequencer.resequence(tx.as_mut(), &group).await?;
            tx.commit().await?;
            Ok::<_, JournalError>(changed)
        }
        .await
        .inspect_err(|e| log_failure("resequence", Some(&group), None, e))?;

        let entries = self.list(&EntryFilter::for_group(&group)).await?;
        info!(group = %group, changed = result, "journal group resequenced");
        Ok(ResequenceReport {
            group,
            changed: result,
            entries,
        })
    }

    pub async fn day_summary(&self, trade_date: NaiveDate) -> Result<DaySummary, JournalError> {
        let entries = self.list(&EntryFilter::for_date(trade_date)).await?;
        Ok(DaySummary::from_entries(trade_date, &entries))
    }
}

fn moved_concurrently(id: i64) -> JournalError {
    JournalError::Conflict(format!(
        "Journal entry {} was moved concurrently, please retry",
        id
    ))
}

fn log_failure(operation: &str, group: Option<&GroupKey>, id: Option<i64>, err: &JournalError) {
    if err.is_internal() {
        error!(
            operation,
            group = %group.map(ToString::to_string).unwrap_or_else(|| "-".into()),
            id = ?id,
            error = %err,
            "journal store failure"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::memory::MemoryJournalStore;
    use crate::testing::{create_request, dec, group};
    use rust_decimal::Decimal;

    fn service() -> (JournalService, MemoryJournalStore) {
        let store = MemoryJournalStore::new();
        (JournalService::new(Arc::new(store.clone())), store)
    }

    async fn sequences(service: &JournalService, key: &GroupKey) -> Vec<(i64, i32)> {
        service
            .list(&EntryFilter::for_group(key))
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.id, e.sequence_no))
            .collect()
    }

    #[tokio::test]
    async fn three_creates_fill_a_group_and_the_fourth_is_rejected() {
        let (service, _) = service();
        let request = create_request("2024-01-01", 1, 1);

        let mut numbers = Vec::new();
        for _ in 0..3 {
            numbers.push(service.create(&request).await.unwrap().sequence_no);
        }
        assert_eq!(numbers, vec![1, 2, 3]);

        let err = service.create(&request).await.unwrap_err();
        assert!(matches!(err, JournalError::CapacityExceeded(g) if g == group("2024-01-01", 1, 1)));
    }

    #[tokio::test]
    async fn deleting_the_middle_entry_closes_the_gap() {
        let (service, _) = service();
        let request = create_request("2024-01-01", 1, 1);
        let a = service.create(&request).await.unwrap();
        let b = service.create(&request).await.unwrap();
        let c = service.create(&request).await.unwrap();
        assert_eq!(b.sequence_no, 2);

        let deleted = service.delete(b.id).await.unwrap();
        assert_eq!(deleted.id, b.id);

        let key = group("2024-01-01", 1, 1);
        assert_eq!(sequences(&service, &key).await, vec![(a.id, 1), (c.id, 2)]);
    }

    #[tokio::test]
    async fn moving_an_entry_appends_it_to_the_target_group() {
        let (service, _) = service();
        let a1 = service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        let a2 = service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        let b1 = service.create(&create_request("2024-01-01", 2, 1)).await.unwrap();
        let b2 = service.create(&create_request("2024-01-01", 2, 1)).await.unwrap();

        let patch = UpdateEntryRequest {
            category_id: Some(2),
            ..Default::default()
        };
        let moved = service.update(a1.id, &patch).await.unwrap();

        assert_eq!(moved.category_id, 2);
        assert_eq!(moved.sequence_no, 3);
        assert_eq!(
            sequences(&service, &group("2024-01-01", 1, 1)).await,
            vec![(a2.id, 1)]
        );
        // the older entry lands last even though its id sorts first
        assert_eq!(
            sequences(&service, &group("2024-01-01", 2, 1)).await,
            vec![(b1.id, 1), (b2.id, 2), (a1.id, 3)]
        );
    }

    #[tokio::test]
    async fn moving_into_a_full_group_changes_nothing() {
        let (service, _) = service();
        let source = service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        for _ in 0..3 {
            service.create(&create_request("2024-01-02", 1, 1)).await.unwrap();
        }
        let before = sequences(&service, &group("2024-01-01", 1, 1)).await;

        let patch = UpdateEntryRequest {
            trade_date: Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            brokerage: Some(dec("9.99")),
            ..Default::default()
        };
        let err = service.update(source.id, &patch).await.unwrap_err();

        assert!(matches!(err, JournalError::CapacityExceeded(_)));
        assert_eq!(sequences(&service, &group("2024-01-01", 1, 1)).await, before);
        assert_eq!(service.get(source.id).await.unwrap(), source);
    }

    #[tokio::test]
    async fn failed_resequence_rolls_back_the_move() {
        let (service, store) = service();
        let first = service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        store.fail_next_set_sequence();

        let patch = UpdateEntryRequest {
            subcategory_id: Some(5),
            ..Default::default()
        };
        let err = service.update(first.id, &patch).await.unwrap_err();

        assert!(err.is_internal());
        assert_eq!(service.get(first.id).await.unwrap(), first);
        let remaining: Vec<i32> = sequences(&service, &group("2024-01-01", 1, 1))
            .await
            .into_iter()
            .map(|(_, seq)| seq)
            .collect();
        assert_eq!(remaining, vec![1, 2]);
        assert!(sequences(&service, &group("2024-01-01", 1, 5)).await.is_empty());
    }

    #[tokio::test]
    async fn field_only_update_keeps_sequence() {
        let (service, _) = service();
        service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        let second = service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();

        let patch = UpdateEntryRequest {
            profit_amount: Some(Decimal::ZERO),
            loss_amount: Some(dec("12.50")),
            notes: Some("stopped out".into()),
            ..Default::default()
        };
        let updated = service.update(second.id, &patch).await.unwrap();

        assert_eq!(updated.sequence_no, 2);
        assert_eq!(updated.loss_amount, dec("12.50"));
        assert_eq!(updated.notes.as_deref(), Some("stopped out"));
    }

    #[tokio::test]
    async fn update_restating_the_same_group_is_not_a_move() {
        let (service, _) = service();
        for _ in 0..3 {
            service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        }
        let last = service.list(&EntryFilter::default()).await.unwrap().pop().unwrap();

        // the group is full, but the entry already lives there
        let patch = UpdateEntryRequest {
            category_id: Some(1),
            ..Default::default()
        };
        let updated = service.update(last.id, &patch).await.unwrap();
        assert_eq!(updated.sequence_no, 3);
    }

    #[tokio::test]
    async fn invalid_update_is_rejected_before_any_write() {
        let (service, _) = service();
        let entry = service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        let patch = UpdateEntryRequest {
            trade_exit: Some(dec("1.123456")),
            ..Default::default()
        };
        assert!(matches!(
            service.update(entry.id, &patch).await,
            Err(JournalError::Validation { .. })
        ));
        assert_eq!(service.get(entry.id).await.unwrap(), entry);
    }

    #[tokio::test]
    async fn missing_entries_are_not_found() {
        let (service, _) = service();
        assert!(matches!(service.get(42).await, Err(JournalError::NotFound(42))));
        assert!(matches!(service.delete(42).await, Err(JournalError::NotFound(42))));
        assert!(matches!(
            service.update(42, &UpdateEntryRequest::default()).await,
            Err(JournalError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn explicit_resequence_reports_group_entries() {
        let (service, _) = service();
        let key = group("2024-01-01", 1, 1);
        service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();

        let report = service.resequence(key).await.unwrap();
        assert_eq!(report.changed, 0);
        assert_eq!(report.entries.len(), 2);

        let empty = service.resequence(group("2030-01-01", 1, 1)).await.unwrap();
        assert_eq!(empty.changed, 0);
        assert!(empty.entries.is_empty());
    }

    #[tokio::test]
    async fn day_summary_reports_remaining_capacity() {
        let (service, _) = service();
        service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        service.create(&create_request("2024-01-01", 1, 1)).await.unwrap();
        service.create(&create_request("2024-01-01", 3, 1)).await.unwrap();
        service.create(&create_request("2024-01-02", 1, 1)).await.unwrap();

        let summary = service
            .day_summary(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(summary.entries, 3);
        let remaining: Vec<i64> = summary.groups.iter().map(|g| g.remaining_capacity).collect();
        assert_eq!(remaining, vec![1, 2]);
    }
}
