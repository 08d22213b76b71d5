use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum number of journal entries allowed in one group
pub const GROUP_CAPACITY: i64 = 3;

/// Identifies the set of entries that share a trading day, category and subcategory.
///
/// Ordering is (date, category, subcategory); lock acquisition relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub trade_date: NaiveDate,
    pub category_id: i64,
    pub subcategory_id: i64,
}

impl GroupKey {
    pub fn new(trade_date: NaiveDate, category_id: i64, subcategory_id: i64) -> Self {
        Self {
            trade_date,
            category_id,
            subcategory_id,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.trade_date.format("%Y-%m-%d"),
            self.category_id,
            self.subcategory_id
        )
    }
}

/// A persisted trading journal row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JournalEntry {
    pub id: i64,
    pub trade_date: NaiveDate,
    pub category_id: i64,
    pub subcategory_id: i64,
    pub sequence_no: i32,
    pub trade_entry: Decimal,
    pub trade_exit: Decimal,
    pub profit_amount: Decimal,
    pub loss_amount: Decimal,
    pub brokerage: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn group(&self) -> GroupKey {
        GroupKey::new(self.trade_date, self.category_id, self.subcategory_id)
    }

    /// profit - loss - brokerage
    pub fn net_pnl(&self) -> Decimal {
        self.profit_amount - self.loss_amount - self.brokerage
    }
}

/// Financial and descriptive fields of an entry, already validated
#[derive(Debug, Clone, PartialEq)]
pub struct EntryAmounts {
    pub trade_entry: Decimal,
    pub trade_exit: Decimal,
    pub profit_amount: Decimal,
    pub loss_amount: Decimal,
    pub brokerage: Decimal,
}

/// Write-ready entry produced by validation. Only `validate` constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub group: GroupKey,
    pub amounts: EntryAmounts,
    pub notes: Option<String>,
}

/// (id, sequence_no) pair as seen by the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct SequenceSlot {
    pub id: i64,
    pub sequence_no: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    pub trade_date: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub trade_entry: Option<Decimal>,
    pub trade_exit: Option<Decimal>,
    pub profit_amount: Option<Decimal>,
    pub loss_amount: Option<Decimal>,
    pub brokerage: Option<Decimal>,
    pub notes: Option<String>,
}

/// Partial update. Absent fields keep their stored value; an empty `notes` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEntryRequest {
    pub trade_date: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub trade_entry: Option<Decimal>,
    pub trade_exit: Option<Decimal>,
    pub profit_amount: Option<Decimal>,
    pub loss_amount: Option<Decimal>,
    pub brokerage: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl EntryFilter {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            from: Some(date),
            to: Some(date),
            ..Default::default()
        }
    }

    pub fn for_group(group: &GroupKey) -> Self {
        Self {
            from: Some(group.trade_date),
            to: Some(group.trade_date),
            category_id: Some(group.category_id),
            subcategory_id: Some(group.subcategory_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, entry: &JournalEntry) -> bool {
        self.from.map_or(true, |from| entry.trade_date >= from)
            && self.to.map_or(true, |to| entry.trade_date <= to)
            && self.category_id.map_or(true, |c| entry.category_id == c)
            && self.subcategory_id.map_or(true, |s| entry.subcategory_id == s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub category_id: i64,
    pub subcategory_id: i64,
    pub entries: i64,
    pub remaining_capacity: i64,
    pub wins: i64,
    pub losses: i64,
    pub total_profit: Decimal,
    pub total_loss: Decimal,
    pub total_brokerage: Decimal,
    pub net_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub trade_date: NaiveDate,
    pub entries: i64,
    pub wins: i64,
    pub losses: i64,
    pub total_profit: Decimal,
    pub total_loss: Decimal,
    pub total_brokerage: Decimal,
    pub net_pnl: Decimal,
    pub groups: Vec<GroupSummary>,
}

impl DaySummary {
    /// Aggregate the entries of one trading day. Entries from other dates are ignored.
    pub fn from_entries(trade_date: NaiveDate, entries: &[JournalEntry]) -> Self {
        let mut groups: BTreeMap<(i64, i64), GroupSummary> = BTreeMap::new();

        for entry in entries.iter().filter(|e| e.trade_date == trade_date) {
            let group = groups
                .entry((entry.category_id, entry.subcategory_id))
                .or_insert_with(|| GroupSummary {
                    category_id: entry.category_id,
                    subcategory_id: entry.subcategory_id,
                    entries: 0,
                    remaining_capacity: GROUP_CAPACITY,
                    wins: 0,
                    losses: 0,
                    total_profit: Decimal::ZERO,
                    total_loss: Decimal::ZERO,
                    total_brokerage: Decimal::ZERO,
                    net_pnl: Decimal::ZERO,
                });

            group.entries += 1;
            group.remaining_capacity = (GROUP_CAPACITY - group.entries).max(0);
            if !entry.profit_amount.is_zero() {
                group.wins += 1;
            }
            if !entry.loss_amount.is_zero() {
                group.losses += 1;
            }
            group.total_profit += entry.profit_amount;
            group.total_loss += entry.loss_amount;
            group.total_brokerage += entry.brokerage;
            group.net_pnl += entry.net_pnl();
        }

        let groups: Vec<GroupSummary> = groups.into_values().collect();

        Self {
            trade_date,
            entries: groups.iter().map(|g| g.entries).sum(),
            wins: groups.iter().map(|g| g.wins).sum(),
            losses: groups.iter().map(|g| g.losses).sum(),
            total_profit: groups.iter().map(|g| g.total_profit).sum(),
            total_loss: groups.iter().map(|g| g.total_loss).sum(),
            total_brokerage: groups.iter().map(|g| g.total_brokerage).sum(),
            net_pnl: groups.iter().map(|g| g.net_pnl).sum(),
            groups,
        }
    }
}
