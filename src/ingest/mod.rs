//! Ingestion normalizer: raw heterogeneous records to canonical trades.
//!
//! This module provides:
//! - Explicit per-source field mapping tables (`schema`)
//! - Record-level normalization with strict/lenient batch policies
//! - File loading and canonical saving (`loader`)

pub mod loader;
pub mod schema;

use crate::domain::{Decimal, OutcomeSide, Trade, TradeType};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use schema::{convert, lookup, schema_for, validate_schema, CanonicalField, Conversion, Converted};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use loader::{load_records, save_trades, LoadError};
pub use schema::RecordSource;

/// Reason a single raw record could not become a Trade.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum IngestError {
    #[error("record is not an object")]
    NotAnObject,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("unknown trade type: {0:?}")]
    UnknownTradeType(String),
    #[error("unknown outcome side: {0:?}")]
    UnknownSide(String),
    #[error("negative share count: {0}")]
    NegativeShares(String),
}

/// A rejected record together with its position in the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordError {
    pub index: usize,
    pub record: Value,
    pub error: IngestError,
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record {}: {}", self.index, self.error)
    }
}

/// Batch-level failure of `normalize`.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Strict mode stops at the first malformed record.
    #[error("strict ingest aborted at {0}")]
    Strict(RecordError),
    #[error("mapping table for {record_source:?} cannot fill {field}")]
    IncompleteSchema {
        record_source: RecordSource,
        field: &'static str,
    },
}

/// Batch ingestion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// First malformed record aborts the whole batch.
    Strict,
    /// Malformed records are skipped and reported.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub mode: IngestMode,
    pub source: RecordSource,
}

impl NormalizeOptions {
    pub fn new(mode: IngestMode, source: RecordSource) -> Self {
        Self { mode, source }
    }
}

/// Output of a normalization run.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Canonical trades in input order.
    pub trades: Vec<Trade>,
    /// Records skipped in lenient mode, in input order.
    pub errors: Vec<RecordError>,
}

/// Normalize a batch of raw records.
///
/// Records are independent, so they are converted in parallel; results are
/// reassembled by input index.
pub fn normalize(records: &[Value], options: NormalizeOptions) -> Result<Normalized, NormalizeError> {
    check_schemas(options.source)?;

    let results: Vec<Result<Trade, IngestError>> = records
        .par_iter()
        .map(|record| normalize_record(record, options.source))
        .collect();

    let mut out = Normalized::default();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(trade) => out.trades.push(trade),
            Err(error) => {
                let record_error = RecordError {
                    index,
                    record: records[index].clone(),
                    error,
                };
                if options.mode == IngestMode::Strict {
                    warn!("Strict ingest aborted: {}", record_error);
                    return Err(NormalizeError::Strict(record_error));
                }
                debug!("Skipping {}", record_error);
                out.errors.push(record_error);
            }
        }
    }

    info!(
        "Normalized {} records: {} trades, {} skipped",
        records.len(),
        out.trades.len(),
        out.errors.len()
    );
    Ok(out)
}

fn check_schemas(source: RecordSource) -> Result<(), NormalizeError> {
    let tables: &[(RecordSource, &[schema::SourceField])] = match source {
        RecordSource::File => &[(RecordSource::File, schema::FILE_SCHEMA)],
        RecordSource::Api => &[(RecordSource::Api, schema::API_SCHEMA)],
        RecordSource::Detect => &[
            (RecordSource::File, schema::FILE_SCHEMA),
            (RecordSource::Api, schema::API_SCHEMA),
        ],
    };
    for (source, table) in tables {
        validate_schema(table).map_err(|field| NormalizeError::IncompleteSchema {
            record_source: *source,
            field: field.name(),
        })?;
    }
    Ok(())
}

/// Fields gathered from one record before assembly.
#[derive(Default)]
struct Fields {
    market: Option<String>,
    market_slug: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    price: Option<Decimal>,
    shares: Option<Decimal>,
    cost: Option<Decimal>,
    trade_type: Option<TradeType>,
    side: Option<OutcomeSide>,
    pnl: Option<Decimal>,
    tx_hash: Option<String>,
}

impl Fields {
    fn is_set(&self, field: CanonicalField) -> bool {
        match field {
            CanonicalField::Market => self.market.is_some(),
            CanonicalField::MarketSlug => self.market_slug.is_some(),
            CanonicalField::Timestamp => self.timestamp.is_some(),
            CanonicalField::Price => self.price.is_some(),
            CanonicalField::Shares => self.shares.is_some(),
            CanonicalField::Cost => self.cost.is_some(),
            CanonicalField::Type => self.trade_type.is_some(),
            CanonicalField::Side => self.side.is_some(),
            CanonicalField::Pnl => self.pnl.is_some(),
            CanonicalField::TxHash => self.tx_hash.is_some(),
        }
    }

    fn set(&mut self, field: CanonicalField, value: Converted) -> Result<(), IngestError> {
        let mismatch = || IngestError::InvalidField {
            field: field.name(),
            reason: "conversion produced the wrong kind of value".to_string(),
        };
        match (field, value) {
            (CanonicalField::Market, Converted::Text(s)) => self.market = non_empty(s),
            (CanonicalField::MarketSlug, Converted::Text(s)) => self.market_slug = non_empty(s),
            (CanonicalField::TxHash, Converted::Text(s)) => self.tx_hash = non_empty(s),
            (CanonicalField::Timestamp, Converted::Timestamp(t)) => self.timestamp = Some(t),
            (CanonicalField::Price, Converted::Amount(d)) => self.price = Some(d),
            (CanonicalField::Shares, Converted::Amount(d)) => self.shares = Some(d),
            (CanonicalField::Cost, Converted::Amount(d)) => self.cost = Some(d),
            (CanonicalField::Pnl, Converted::Amount(d)) => self.pnl = Some(d),
            (CanonicalField::Type, Converted::Type(t)) => self.trade_type = Some(t),
            (CanonicalField::Side, Converted::Side(s)) => self.side = Some(s),
            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Normalize one raw record. Pure: the same input always yields the same Trade.
pub fn normalize_record(record: &Value, source: RecordSource) -> Result<Trade, IngestError> {
    if !record.is_object() {
        return Err(IngestError::NotAnObject);
    }

    let mut fields = Fields::default();
    for entry in schema_for(source, record) {
        if fields.is_set(entry.field) {
            continue;
        }
        let Some(raw) = lookup(record, entry.key) else {
            continue;
        };
        // A nested market object is addressed through its dotted keys.
        if entry.conversion == Conversion::Text && (raw.is_object() || raw.is_array()) {
            continue;
        }
        let converted = convert(entry.field, entry.conversion, raw)?;
        fields.set(entry.field, converted)?;
    }

    let market = match (fields.market, fields.market_slug.as_ref()) {
        (Some(title), _) => title,
        (None, Some(slug)) => slug.clone(),
        (None, None) => return Err(IngestError::MissingField("market")),
    };
    let timestamp = fields
        .timestamp
        .ok_or(IngestError::MissingField("timestamp"))?;
    let price = fields.price.ok_or(IngestError::MissingField("price"))?;
    let shares = fields.shares.ok_or(IngestError::MissingField("shares"))?;
    let cost = fields.cost.ok_or(IngestError::MissingField("cost"))?;
    let trade_type = fields.trade_type.ok_or(IngestError::MissingField("type"))?;
    let side = fields.side.ok_or(IngestError::MissingField("side"))?;

    if shares.is_negative() {
        return Err(IngestError::NegativeShares(shares.to_canonical_string()));
    }
    if price.is_negative() {
        return Err(IngestError::InvalidField {
            field: "price",
            reason: format!("negative price {}", price),
        });
    }

    Ok(Trade {
        market,
        market_slug: fields.market_slug,
        timestamp,
        price,
        shares,
        cost,
        trade_type,
        side,
        pnl: fields.pnl.unwrap_or_else(Decimal::zero),
        tx_hash: fields.tx_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn file_record() -> Value {
        json!({
            "market": "Will BTC hit 100k?",
            "market_slug": "btc-100k",
            "timestamp": 1_700_000_000,
            "price": 0.4,
            "shares": 100,
            "cost": 40.0,
            "type": "Market Buy",
            "side": "YES"
        })
    }

    fn api_record() -> Value {
        json!({
            "market": {"title": "Will BTC hit 100k?", "slug": "btc-100k"},
            "blockTimestamp": 1_700_000_000,
            "price": "0.4",
            "outcomeTokenAmount": "100000000",
            "collateralAmount": "2500000",
            "strategy": "Buy",
            "outcomeIndex": 1,
            "pnl": "-500000",
            "transactionHash": "0xabc"
        })
    }

    #[test]
    fn test_file_record_normalizes() {
        let trade = normalize_record(&file_record(), RecordSource::File).unwrap();
        assert_eq!(trade.market, "Will BTC hit 100k?");
        assert_eq!(trade.market_slug.as_deref(), Some("btc-100k"));
        assert_eq!(trade.timestamp, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert_eq!(trade.price, d("0.4"));
        assert_eq!(trade.shares, d("100"));
        assert_eq!(trade.cost, d("40"));
        assert_eq!(trade.trade_type, TradeType::Buy);
        assert_eq!(trade.side, OutcomeSide::Yes);
        assert!(trade.pnl.is_zero());
        assert_eq!(trade.tx_hash, None);
    }

    #[test]
    fn test_api_record_converts_micro_units() {
        let trade = normalize_record(&api_record(), RecordSource::Api).unwrap();
        assert_eq!(trade.cost, d("2.5"));
        assert_eq!(trade.shares, d("100"));
        assert_eq!(trade.pnl, d("-0.5"));
        assert_eq!(trade.price, d("0.4"));
        assert_eq!(trade.side, OutcomeSide::No);
        assert_eq!(trade.tx_hash.as_deref(), Some("0xabc"));
        assert_eq!(trade.market_slug.as_deref(), Some("btc-100k"));
    }

    #[test]
    fn test_file_floats_are_never_micro_converted() {
        let mut record = file_record();
        record["cost"] = json!(2_500_000);
        let trade = normalize_record(&record, RecordSource::File).unwrap();
        assert_eq!(trade.cost, d("2500000"));
    }

    #[test]
    fn test_detect_picks_schema_per_record() {
        let api = normalize_record(&api_record(), RecordSource::Detect).unwrap();
        assert_eq!(api.cost, d("2.5"));
        let file = normalize_record(&file_record(), RecordSource::Detect).unwrap();
        assert_eq!(file.cost, d("40"));
    }

    #[test]
    fn test_missing_slug_stays_absent() {
        let mut record = file_record();
        record.as_object_mut().unwrap().remove("market_slug");
        let trade = normalize_record(&record, RecordSource::File).unwrap();
        assert_eq!(trade.market_slug, None);
    }

    #[test]
    fn test_slug_only_market_uses_slug_as_title() {
        let mut record = file_record();
        record.as_object_mut().unwrap().remove("market");
        let trade = normalize_record(&record, RecordSource::File).unwrap();
        assert_eq!(trade.market, "btc-100k");
    }

    #[test]
    fn test_missing_market_identity_is_rejected() {
        let mut record = file_record();
        let obj = record.as_object_mut().unwrap();
        obj.remove("market");
        obj.remove("market_slug");
        assert_eq!(
            normalize_record(&record, RecordSource::File),
            Err(IngestError::MissingField("market"))
        );
    }

    #[test]
    fn test_missing_type_is_not_defaulted() {
        let mut record = file_record();
        record.as_object_mut().unwrap().remove("type");
        assert_eq!(
            normalize_record(&record, RecordSource::File),
            Err(IngestError::MissingField("type"))
        );
    }

    #[test]
    fn test_negative_shares_rejected() {
        let mut record = file_record();
        record["shares"] = json!(-1);
        assert!(matches!(
            normalize_record(&record, RecordSource::File),
            Err(IngestError::NegativeShares(_))
        ));
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(
            normalize_record(&json!([1, 2]), RecordSource::File),
            Err(IngestError::NotAnObject)
        );
    }

    #[test]
    fn test_lenient_mode_skips_and_reports() {
        let mut bad = file_record();
        bad["side"] = json!("MAYBE");
        let records = vec![file_record(), bad, file_record()];

        let out = normalize(&records, NormalizeOptions::new(IngestMode::Lenient, RecordSource::File))
            .unwrap();
        assert_eq!(out.trades.len(), 2);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].index, 1);
        assert_eq!(out.errors[0].error, IngestError::UnknownSide("MAYBE".to_string()));
        assert_eq!(out.errors[0].record["side"], "MAYBE");
    }

    #[test]
    fn test_strict_mode_aborts_on_first_bad_record() {
        let mut bad1 = file_record();
        bad1["timestamp"] = json!("not a date");
        let mut bad2 = file_record();
        bad2["type"] = json!("Claim");
        let records = vec![file_record(), bad1, bad2];

        let err = normalize(&records, NormalizeOptions::new(IngestMode::Strict, RecordSource::File))
            .unwrap_err();
        match err {
            NormalizeError::Strict(record_error) => assert_eq!(record_error.index, 1),
            other => panic!("expected strict abort, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_is_deterministic_and_ordered() {
        let records: Vec<Value> = (0..50)
            .map(|i| {
                let mut r = file_record();
                r["timestamp"] = json!(1_700_000_000 + i);
                r
            })
            .collect();
        let options = NormalizeOptions::new(IngestMode::Lenient, RecordSource::File);
        let a = normalize(&records, options).unwrap();
        let b = normalize(&records, options).unwrap();
        assert_eq!(a.trades, b.trades);
        for (i, trade) in a.trades.iter().enumerate() {
            assert_eq!(trade.timestamp.timestamp(), 1_700_000_000 + i as i64);
        }
    }
}
