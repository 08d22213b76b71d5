use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::journal::{CreateEntryRequest, GroupKey, JournalEntry};

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal literal")
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid YYYY-MM-DD date")
}

pub fn group(trade_date: &str, category_id: i64, subcategory_id: i64) -> GroupKey {
    GroupKey::new(date(trade_date), category_id, subcategory_id)
}

/// A valid winning trade for the given group
pub fn create_request(trade_date: &str, category_id: i64, subcategory_id: i64) -> CreateEntryRequest {
    CreateEntryRequest {
        trade_date: Some(date(trade_date)),
        category_id: Some(category_id),
        subcategory_id: Some(subcategory_id),
        trade_entry: Some(dec("101.25")),
        trade_exit: Some(dec("103.5")),
        profit_amount: Some(dec("225")),
        loss_amount: None,
        brokerage: Some(dec("20")),
        notes: None,
    }
}

pub fn stored_entry(
    id: i64,
    trade_date: &str,
    category_id: i64,
    subcategory_id: i64,
    sequence_no: i32,
) -> JournalEntry {
    let now = Utc::now();
    JournalEntry {
        id,
        trade_date: date(trade_date),
        category_id,
        subcategory_id,
        sequence_no,
        trade_entry: dec("101.25"),
        trade_exit: dec("103.5"),
        profit_amount: dec("225"),
        loss_amount: Decimal::ZERO,
        brokerage: dec("20"),
        notes: Some("breakout".into()),
        created_at: now,
        updated_at: now,
    }
}
