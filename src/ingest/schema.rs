//! Source field mapping tables.
//!
//! Each table lists `(source key, canonical field, conversion)` entries in
//! priority order. A canonical field takes its value from the first listed key
//! that is present and non-null in the raw record. Dotted keys address nested
//! objects (`market.slug`).

use super::IngestError;
use crate::domain::time::parse_timestamp_value;
use crate::domain::{Decimal, OutcomeSide, TradeType};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Largest accepted magnitude for any amount once in canonical units.
///
/// Keeps every product and running sum in the ledger walk inside
/// `rust_decimal`'s range.
pub const MAX_ABS_AMOUNT: i64 = 1_000_000_000;

/// Where a batch of raw records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordSource {
    /// File export: amounts are already canonical floats.
    File,
    /// Exchange API page: amounts are 1e6-scaled micro-unit integers.
    Api,
    /// Per record: API when it carries `collateralAmount`, file otherwise.
    #[default]
    Detect,
}

/// Canonical Trade fields a raw record can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Market,
    MarketSlug,
    Timestamp,
    Price,
    Shares,
    Cost,
    Type,
    Side,
    Pnl,
    TxHash,
}

impl CanonicalField {
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Market => "market",
            CanonicalField::MarketSlug => "market_slug",
            CanonicalField::Timestamp => "timestamp",
            CanonicalField::Price => "price",
            CanonicalField::Shares => "shares",
            CanonicalField::Cost => "cost",
            CanonicalField::Type => "type",
            CanonicalField::Side => "side",
            CanonicalField::Pnl => "pnl",
            CanonicalField::TxHash => "tx_hash",
        }
    }

    /// Fields a schema must be able to fill for a record to become a Trade.
    ///
    /// Market identity is satisfied by either title or slug and is checked
    /// separately.
    pub const REQUIRED: &'static [CanonicalField] = &[
        CanonicalField::Timestamp,
        CanonicalField::Price,
        CanonicalField::Shares,
        CanonicalField::Cost,
        CanonicalField::Type,
        CanonicalField::Side,
    ];
}

/// How a raw cell becomes a canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Text,
    Timestamp,
    Amount,
    MicroAmount,
    TradeType,
    SideLabel,
    OutcomeIndex,
}

#[derive(Debug, Clone, Copy)]
pub struct SourceField {
    pub key: &'static str,
    pub field: CanonicalField,
    pub conversion: Conversion,
}

const fn map(key: &'static str, field: CanonicalField, conversion: Conversion) -> SourceField {
    SourceField {
        key,
        field,
        conversion,
    }
}

use CanonicalField as F;
use Conversion as C;

/// File exports (JSON/CSV written by us or by the exchange UI).
pub const FILE_SCHEMA: &[SourceField] = &[
    map("market.title", F::Market, C::Text),
    map("market", F::Market, C::Text),
    map("title", F::Market, C::Text),
    map("market.slug", F::MarketSlug, C::Text),
    map("market_slug", F::MarketSlug, C::Text),
    map("marketSlug", F::MarketSlug, C::Text),
    map("slug", F::MarketSlug, C::Text),
    map("timestamp", F::Timestamp, C::Timestamp),
    map("blockTimestamp", F::Timestamp, C::Timestamp),
    map("time", F::Timestamp, C::Timestamp),
    map("price", F::Price, C::Amount),
    map("shares", F::Shares, C::Amount),
    map("cost", F::Cost, C::Amount),
    map("type", F::Type, C::TradeType),
    map("strategy", F::Type, C::TradeType),
    map("orderType", F::Type, C::TradeType),
    map("side", F::Side, C::SideLabel),
    map("outcome", F::Side, C::SideLabel),
    map("outcomeIndex", F::Side, C::OutcomeIndex),
    map("pnl", F::Pnl, C::Amount),
    map("tx_hash", F::TxHash, C::Text),
    map("transactionHash", F::TxHash, C::Text),
    map("txHash", F::TxHash, C::Text),
];

/// Exchange portfolio-history API records.
pub const API_SCHEMA: &[SourceField] = &[
    map("market.title", F::Market, C::Text),
    map("market.slug", F::MarketSlug, C::Text),
    map("blockTimestamp", F::Timestamp, C::Timestamp),
    map("timestamp", F::Timestamp, C::Timestamp),
    map("price", F::Price, C::Amount),
    map("outcomeTokenAmount", F::Shares, C::MicroAmount),
    map("collateralAmount", F::Cost, C::MicroAmount),
    map("strategy", F::Type, C::TradeType),
    map("type", F::Type, C::TradeType),
    map("outcomeIndex", F::Side, C::OutcomeIndex),
    map("side", F::Side, C::SideLabel),
    map("pnl", F::Pnl, C::MicroAmount),
    map("transactionHash", F::TxHash, C::Text),
    map("tx_hash", F::TxHash, C::Text),
];

/// Key whose presence marks a record as API-sourced under `RecordSource::Detect`.
pub const API_MARKER_KEY: &str = "collateralAmount";

/// Pick the table for one record.
pub fn schema_for(source: RecordSource, record: &Value) -> &'static [SourceField] {
    match source {
        RecordSource::File => FILE_SCHEMA,
        RecordSource::Api => API_SCHEMA,
        RecordSource::Detect => {
            if record.get(API_MARKER_KEY).is_some() {
                API_SCHEMA
            } else {
                FILE_SCHEMA
            }
        }
    }
}

/// Check that a table can fill every required field and some market identity.
pub fn validate_schema(schema: &[SourceField]) -> Result<(), CanonicalField> {
    for required in CanonicalField::REQUIRED {
        if !schema.iter().any(|sf| sf.field == *required) {
            return Err(*required);
        }
    }
    if !schema
        .iter()
        .any(|sf| matches!(sf.field, F::Market | F::MarketSlug))
    {
        return Err(F::Market);
    }
    Ok(())
}

/// Resolve a possibly dotted key against a record; null counts as absent.
pub fn lookup<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = record;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    (!current.is_null()).then_some(current)
}

/// A converted cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    Text(String),
    Timestamp(DateTime<Utc>),
    Amount(Decimal),
    Type(TradeType),
    Side(OutcomeSide),
}

/// Apply a conversion to a raw cell.
pub fn convert(field: CanonicalField, conversion: Conversion, raw: &Value) -> Result<Converted, IngestError> {
    let invalid = |reason: String| IngestError::InvalidField {
        field: field.name(),
        reason,
    };

    match conversion {
        Conversion::Text => match raw {
            Value::String(s) => Ok(Converted::Text(s.trim().to_string())),
            Value::Number(n) => Ok(Converted::Text(n.to_string())),
            other => Err(invalid(format!("expected text, got {}", other))),
        },
        Conversion::Timestamp => parse_timestamp_value(raw)
            .map(Converted::Timestamp)
            .map_err(|e| invalid(e.to_string())),
        Conversion::Amount => parse_amount(raw)
            .and_then(within_bounds)
            .map(Converted::Amount)
            .map_err(invalid),
        Conversion::MicroAmount => parse_amount(raw)
            .map(Decimal::from_micro_units)
            .and_then(within_bounds)
            .map(Converted::Amount)
            .map_err(invalid),
        Conversion::TradeType => {
            let s = raw
                .as_str()
                .ok_or_else(|| invalid(format!("expected text, got {}", raw)))?;
            TradeType::from_raw(s)
                .map(Converted::Type)
                .ok_or_else(|| IngestError::UnknownTradeType(s.to_string()))
        }
        Conversion::SideLabel => {
            let s = raw
                .as_str()
                .ok_or_else(|| invalid(format!("expected text, got {}", raw)))?;
            OutcomeSide::from_raw(s)
                .map(Converted::Side)
                .ok_or_else(|| IngestError::UnknownSide(s.to_string()))
        }
        Conversion::OutcomeIndex => {
            let index = match raw {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }
            .ok_or_else(|| invalid(format!("expected integer outcome index, got {}", raw)))?;
            OutcomeSide::from_outcome_index(index)
                .map(Converted::Side)
                .ok_or_else(|| IngestError::UnknownSide(format!("outcomeIndex {}", index)))
        }
    }
}

fn parse_amount(raw: &Value) -> Result<Decimal, String> {
    match raw {
        Value::Number(n) => Decimal::from_json_number(n).map_err(|e| format!("{}: {}", n, e)),
        Value::String(s) => {
            Decimal::from_str_canonical(s).map_err(|e| format!("{:?}: {}", s, e))
        }
        other => Err(format!("expected number, got {}", other)),
    }
}

fn within_bounds(amount: Decimal) -> Result<Decimal, String> {
    if amount.abs() > Decimal::from(MAX_ABS_AMOUNT) {
        return Err(format!("{} exceeds the limit of {}", amount, MAX_ABS_AMOUNT));
    }
    Ok(amount)
}
