use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::JournalError;
use super::model::{
    CreateEntryRequest, EntryAmounts, EntryDraft, GroupKey, JournalEntry, UpdateEntryRequest,
};

/// Fractional digits allowed for trade prices (NUMERIC(12,4))
pub const PRICE_SCALE: u32 = 4;
/// Fractional digits allowed for money amounts (NUMERIC(12,2))
pub const AMOUNT_SCALE: u32 = 2;
pub const NOTES_MAX_CHARS: usize = 1000;

const PRICE_INTEGER_DIGITS: u32 = 12 - PRICE_SCALE;
const AMOUNT_INTEGER_DIGITS: u32 = 12 - AMOUNT_SCALE;

/// Merged field set before validation
#[derive(Debug, Default)]
struct RawFields {
    trade_date: Option<NaiveDate>,
    category_id: Option<i64>,
    subcategory_id: Option<i64>,
    trade_entry: Option<Decimal>,
    trade_exit: Option<Decimal>,
    profit_amount: Option<Decimal>,
    loss_amount: Option<Decimal>,
    brokerage: Option<Decimal>,
    notes: Option<String>,
}

pub fn validate_create(request: &CreateEntryRequest) -> Result<EntryDraft, JournalError> {
    validate_fields(RawFields {
        trade_date: request.trade_date,
        category_id: request.category_id,
        subcategory_id: request.subcategory_id,
        trade_entry: request.trade_entry,
        trade_exit: request.trade_exit,
        profit_amount: request.profit_amount,
        loss_amount: request.loss_amount,
        brokerage: request.brokerage,
        notes: request.notes.clone(),
    })
}

/// Apply `patch` over `current` and validate the result as a whole.
pub fn validate_update(
    current: &JournalEntry,
    patch: &UpdateEntryRequest,
) -> Result<EntryDraft, JournalError> {
    validate_fields(RawFields {
        trade_date: patch.trade_date.or(Some(current.trade_date)),
        category_id: patch.category_id.or(Some(current.category_id)),
        subcategory_id: patch.subcategory_id.or(Some(current.subcategory_id)),
        trade_entry: patch.trade_entry.or(Some(current.trade_entry)),
        trade_exit: patch.trade_exit.or(Some(current.trade_exit)),
        profit_amount: patch.profit_amount.or(Some(current.profit_amount)),
        loss_amount: patch.loss_amount.or(Some(current.loss_amount)),
        brokerage: patch.brokerage.or(Some(current.brokerage)),
        notes: patch.notes.clone().or_else(|| current.notes.clone()),
    })
}

fn validate_fields(raw: RawFields) -> Result<EntryDraft, JournalError> {
    let mut errors: HashMap<String, String> = HashMap::new();

    if raw.trade_date.is_none() {
        errors.insert("trade_date".into(), "This field is required".into());
    }
    let category_id = check_reference(&mut errors, "category_id", raw.category_id);
    let subcategory_id = check_reference(&mut errors, "subcategory_id", raw.subcategory_id);

    let trade_entry = check_price(&mut errors, "trade_entry", raw.trade_entry);
    let trade_exit = check_price(&mut errors, "trade_exit", raw.trade_exit);
    let profit_amount = check_amount(&mut errors, "profit_amount", raw.profit_amount);
    let loss_amount = check_amount(&mut errors, "loss_amount", raw.loss_amount);
    let brokerage = check_amount(&mut errors, "brokerage", raw.brokerage);

    if let (Some(profit), Some(loss)) = (profit_amount, loss_amount) {
        if !profit.is_zero() && !loss.is_zero() {
            errors.insert(
                "profit_amount".into(),
                "Only one of profit_amount or loss_amount may be non-zero".into(),
            );
        } else if profit.is_zero() && loss.is_zero() {
            errors.insert(
                "profit_amount".into(),
                "One of profit_amount or loss_amount must be non-zero".into(),
            );
        }
    }

    let notes = raw
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(n) = &notes {
        if n.chars().count() > NOTES_MAX_CHARS {
            errors.insert(
                "notes".into(),
                format!("Must be at most {} characters", NOTES_MAX_CHARS),
            );
        }
    }

    match (
        raw.trade_date,
        category_id,
        subcategory_id,
        trade_entry,
        trade_exit,
        profit_amount,
        loss_amount,
        brokerage,
    ) {
        (
            Some(trade_date),
            Some(category_id),
            Some(subcategory_id),
            Some(trade_entry),
            Some(trade_exit),
            Some(profit_amount),
            Some(loss_amount),
            Some(brokerage),
        ) if errors.is_empty() => Ok(EntryDraft {
            group: GroupKey::new(trade_date, category_id, subcategory_id),
            amounts: EntryAmounts {
                trade_entry,
                trade_exit,
                profit_amount,
                loss_amount,
                brokerage,
            },
            notes,
        }),
        _ => Err(JournalError::validation("Invalid journal entry", errors)),
    }
}

fn check_reference(
    errors: &mut HashMap<String, String>,
    field: &str,
    value: Option<i64>,
) -> Option<i64> {
    match value {
        None => {
            errors.insert(field.into(), "This field is required".into());
            None
        }
        Some(id) if id <= 0 => {
            errors.insert(field.into(), "Must be a positive identifier".into());
            None
        }
        Some(id) => Some(id),
    }
}

fn check_price(
    errors: &mut HashMap<String, String>,
    field: &str,
    value: Option<Decimal>,
) -> Option<Decimal> {
    let Some(price) = value else {
        errors.insert(field.into(), "This field is required".into());
        return None;
    };
    if price <= Decimal::ZERO {
        errors.insert(field.into(), "Must be greater than zero".into());
        return None;
    }
    check_precision(errors, field, price, PRICE_SCALE, PRICE_INTEGER_DIGITS)
}

fn check_amount(
    errors: &mut HashMap<String, String>,
    field: &str,
    value: Option<Decimal>,
) -> Option<Decimal> {
    let amount = value.unwrap_or(Decimal::ZERO);
    if amount.is_sign_negative() && !amount.is_zero() {
        errors.insert(field.into(), "Must not be negative".into());
        return None;
    }
    check_precision(errors, field, amount, AMOUNT_SCALE, AMOUNT_INTEGER_DIGITS)
}

fn check_precision(
    errors: &mut HashMap<String, String>,
    field: &str,
    value: Decimal,
    scale: u32,
    integer_digits: u32,
) -> Option<Decimal> {
    if value.normalize().scale() > scale {
        errors.insert(
            field.into(),
            format!("At most {} decimal places allowed", scale),
        );
        return None;
    }
    if value.trunc().abs() >= Decimal::from(10i64.pow(integer_digits)) {
        errors.insert(
            field.into(),
            format!("At most {} integer digits allowed", integer_digits),
        );
        return None;
    }
    Some(value)
}
