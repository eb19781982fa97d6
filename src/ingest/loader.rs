//! Reading raw records from trade files and writing the canonical form.

use crate::domain::{OutcomeSide, Trade, TradeType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal as RustDecimal;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported file type: {0} (use .json or .csv)")]
    UnsupportedFormat(String),
    #[error("expected a JSON array of trade records")]
    NotAnArray,
}

/// Load raw records from a `.json` or `.csv` file.
pub fn load_records(path: &Path) -> Result<Vec<Value>, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let records = match extension.as_str() {
        "json" => parse_json_records(&std::fs::read_to_string(path)?)?,
        "csv" => parse_csv_records(&std::fs::read(path)?)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    debug!("Loaded {} raw records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse a JSON document holding either an array of records or a page
/// object with a `data` array.
pub fn parse_json_records(content: &str) -> Result<Vec<Value>, LoadError> {
    match serde_json::from_str::<Value>(content)? {
        Value::Array(records) => Ok(records),
        Value::Object(mut page) => match page.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(LoadError::NotAnArray),
        },
        _ => Err(LoadError::NotAnArray),
    }
}

/// Parse header-delimited CSV into one JSON object per row.
///
/// Cells stay strings (numbers are parsed later without float rounding);
/// empty cells become null so that they count as absent.
pub fn parse_csv_records(bytes: &[u8]) -> Result<Vec<Value>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut object = serde_json::Map::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            let value = if cell.is_empty() {
                Value::Null
            } else {
                Value::String(cell.to_string())
            };
            object.insert(header.to_string(), value);
        }
        records.push(Value::Object(object));
    }
    Ok(records)
}

/// One trade as written by `save_trades`.
///
/// Amounts are decimal strings so a reload reproduces every digit; the
/// normalizer reads them the same way it reads CSV cells.
#[derive(Debug, Serialize)]
struct PersistedTrade<'a> {
    market: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    market_slug: Option<&'a str>,
    timestamp: DateTime<Utc>,
    #[serde(serialize_with = "rust_decimal::serde::str::serialize")]
    price: RustDecimal,
    #[serde(serialize_with = "rust_decimal::serde::str::serialize")]
    shares: RustDecimal,
    #[serde(serialize_with = "rust_decimal::serde::str::serialize")]
    cost: RustDecimal,
    #[serde(rename = "type")]
    trade_type: TradeType,
    side: OutcomeSide,
    #[serde(serialize_with = "rust_decimal::serde::str::serialize")]
    pnl: RustDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    tx_hash: Option<&'a str>,
}

impl<'a> From<&'a Trade> for PersistedTrade<'a> {
    fn from(t: &'a Trade) -> Self {
        PersistedTrade {
            market: &t.market,
            market_slug: t.market_slug.as_deref(),
            timestamp: t.timestamp,
            price: t.price.inner(),
            shares: t.shares.inner(),
            cost: t.cost.inner(),
            trade_type: t.trade_type,
            side: t.side,
            pnl: t.pnl.inner(),
            tx_hash: t.tx_hash.as_deref(),
        }
    }
}

/// Canonical persisted form: a JSON array of trades.
pub fn trades_to_json(trades: &[Trade]) -> Result<String, LoadError> {
    let persisted: Vec<PersistedTrade<'_>> = trades.iter().map(PersistedTrade::from).collect();
    Ok(serde_json::to_string_pretty(&persisted)?)
}

/// Write trades to `path` in canonical form.
pub fn save_trades(trades: &[Trade], path: &Path) -> Result<(), LoadError> {
    std::fs::write(path, trades_to_json(trades)?)?;
    debug!("Saved {} trades to {}", trades.len(), path.display());
    Ok(())
}
