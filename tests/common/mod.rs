#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use trading_journal_api::app::{app, AppState};
use trading_journal_api::config::AppConfig;
use trading_journal_api::journal::{JournalStore, MemoryJournalStore};

pub const JOURNAL: &str = "/api/investment/tradingjournal";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.server.enable_request_logging = false;
    config
}

/// Router backed by a fresh in-memory store
pub fn memory_app() -> Router {
    store_app(Arc::new(MemoryJournalStore::new()))
}

pub fn store_app(store: Arc<dyn JournalStore>) -> Router {
    let config = test_config();
    app(AppState::new(store, &config), &config)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok((status, value))
}

/// A valid winning trade for the group
pub fn entry_body(trade_date: &str, category_id: i64, subcategory_id: i64) -> Value {
    json!({
        "trade_date": trade_date,
        "category_id": category_id,
        "subcategory_id": subcategory_id,
        "trade_entry": "101.25",
        "trade_exit": "103.50",
        "profit_amount": "225.00",
        "brokerage": "20.00",
        "notes": "opening range breakout"
    })
}

pub async fn create(app: &Router, trade_date: &str, category_id: i64, subcategory_id: i64) -> Result<Value> {
    let (status, body) = send(app, "POST", JOURNAL, Some(entry_body(trade_date, category_id, subcategory_id))).await?;
    anyhow::ensure!(status == StatusCode::CREATED, "create failed with {}: {}", status, body);
    Ok(body["data"].clone())
}

/// (id, sequence_no) of every entry in the group, in sequence order
pub async fn group_sequences(app: &Router, trade_date: &str, category_id: i64, subcategory_id: i64) -> Result<Vec<(i64, i64)>> {
    let uri = format!(
        "{}?from={d}&to={d}&category_id={}&subcategory_id={}",
        JOURNAL,
        category_id,
        subcategory_id,
        d = trade_date
    );
    let (status, body) = send(app, "GET", &uri, None).await?;
    anyhow::ensure!(status == StatusCode::OK, "list failed with {}: {}", status, body);
    Ok(body["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|e| (e["id"].as_i64().unwrap_or(-1), e["sequence_no"].as_i64().unwrap_or(-1)))
        .collect())
}
