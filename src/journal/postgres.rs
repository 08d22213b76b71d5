use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::error::StoreError;
use super::model::{EntryDraft, EntryFilter, GroupKey, JournalEntry, SequenceSlot};
use super::store::{lock_order, JournalStore, JournalTx};

const TABLE: &str = "trading_journal";

const COLUMNS: &str = "id, trade_date, category_id, subcategory_id, sequence_no, \
     trade_entry, trade_exit, profit_amount, loss_amount, brokerage, notes, created_at, updated_at";

const GROUP_PREDICATE: &str = "trade_date = $1 AND category_id = $2 AND subcategory_id = $3";

/// Postgres-backed journal store.
///
/// Group exclusivity uses transaction-scoped advisory locks, one per group,
/// so an empty group can be locked before its first insert.
#[derive(Debug, Clone)]
pub struct PgJournalStore {
    pool: PgPool,
}

impl PgJournalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Stable 64-bit advisory lock key for a group
pub fn advisory_key(group: &GroupKey) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(TABLE.as_bytes());
    hasher.update(b":");
    hasher.update(group.to_string().as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

#[async_trait]
impl JournalStore for PgJournalStore {
    async fn begin(&self) -> Result<Box<dyn JournalTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgJournalTx { tx }))
    }

    async fn get(&self, id: i64) -> Result<Option<JournalEntry>, StoreError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, TABLE);
        let entry = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn list(&self, filter: &EntryFilter) -> Result<Vec<JournalEntry>, StoreError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM {} WHERE TRUE", COLUMNS, TABLE));

        if let Some(from) = filter.from {
            query.push(" AND trade_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND trade_date <= ").push_bind(to);
        }
        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(subcategory_id) = filter.subcategory_id {
            query.push(" AND subcategory_id = ").push_bind(subcategory_id);
        }
        query.push(" ORDER BY trade_date, category_id, subcategory_id, sequence_no, id");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit.max(0));
        }
        if let Some(offset) = filter.offset {
            query.push(" OFFSET ").push_bind(offset.max(0));
        }

        let entries = query
            .build_query_as::<JournalEntry>()
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgJournalTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl JournalTx for PgJournalTx {
    async fn lock_groups(&mut self, groups: &[GroupKey]) -> Result<(), StoreError> {
        for group in lock_order(groups) {
            debug!(group = %group, "acquiring journal group lock");
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(advisory_key(&group))
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn fetch(&mut self, id: i64) -> Result<Option<JournalEntry>, StoreError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1 FOR UPDATE", COLUMNS, TABLE);
        let entry = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(entry)
    }

    async fn count_group(&mut self, group: &GroupKey) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", TABLE, GROUP_PREDICATE);
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(group.trade_date)
            .bind(group.category_id)
            .bind(group.subcategory_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn max_sequence(&mut self, group: &GroupKey) -> Result<i32, StoreError> {
        let sql = format!(
            "SELECT COALESCE(MAX(sequence_no), 0) FROM {} WHERE {}",
            TABLE, GROUP_PREDICATE
        );
        let (max,): (i32,) = sqlx::query_as(&sql)
            .bind(group.trade_date)
            .bind(group.category_id)
            .bind(group.subcategory_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(max)
    }

    async fn group_members(&mut self, group: &GroupKey) -> Result<Vec<SequenceSlot>, StoreError> {
        let sql = format!(
            "SELECT id, sequence_no FROM {} WHERE {} ORDER BY id",
            TABLE, GROUP_PREDICATE
        );
        let members = sqlx::query_as::<_, SequenceSlot>(&sql)
            .bind(group.trade_date)
            .bind(group.category_id)
            .bind(group.subcategory_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(members)
    }

    async fn set_sequence(&mut self, id: i64, sequence_no: i32) -> Result<(), StoreError> {
        let sql = format!("UPDATE {} SET sequence_no = $2 WHERE id = $1", TABLE);
        sqlx::query(&sql)
            .bind(id)
            .bind(sequence_no)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert(&mut self, draft: &EntryDraft, sequence_no: i32) -> Result<JournalEntry, StoreError> {
        let sql = format!(
            "INSERT INTO {} (trade_date, category_id, subcategory_id, sequence_no, \
             trade_entry, trade_exit, profit_amount, loss_amount, brokerage, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            TABLE, COLUMNS
        );
        let entry = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(draft.group.trade_date)
            .bind(draft.group.category_id)
            .bind(draft.group.subcategory_id)
            .bind(sequence_no)
            .bind(draft.amounts.trade_entry)
            .bind(draft.amounts.trade_exit)
            .bind(draft.amounts.profit_amount)
            .bind(draft.amounts.loss_amount)
            .bind(draft.amounts.brokerage)
            .bind(&draft.notes)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(entry)
    }

    async fn update(
        &mut self,
        id: i64,
        draft: &EntryDraft,
        sequence_no: i32,
    ) -> Result<Option<JournalEntry>, StoreError> {
        let sql = format!(
            "UPDATE {} SET trade_date = $2, category_id = $3, subcategory_id = $4, sequence_no = $5, \
             trade_entry = $6, trade_exit = $7, profit_amount = $8, loss_amount = $9, brokerage = $10, \
             notes = $11, updated_at = now() WHERE id = $1 RETURNING {}",
            TABLE, COLUMNS
        );
        let entry = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(id)
            .bind(draft.group.trade_date)
            .bind(draft.group.category_id)
            .bind(draft.group.subcategory_id)
            .bind(sequence_no)
            .bind(draft.amounts.trade_entry)
            .bind(draft.amounts.trade_exit)
            .bind(draft.amounts.profit_amount)
            .bind(draft.amounts.loss_amount)
            .bind(draft.amounts.brokerage)
            .bind(&draft.notes)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(entry)
    }

    async fn delete(&mut self, id: i64) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        // deferred (group, sequence_no) uniqueness is checked here
        self.tx.commit().await?;
        Ok(())
    }
}
