//! Composable trade filters.
//!
//! Every filter returns a new vector and keeps the relative order of the
//! trades it lets through. An absent bound or set is a no-op for its
//! dimension, so filters commute.

use crate::domain::time::{parse_datetime_str, ParsedInstant};
use crate::domain::{Decimal, MarketKey, OutcomeSide, Trade, TradeType};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("minimum pnl {min} is greater than maximum pnl {max}")]
    InvertedPnlRange { min: Decimal, max: Decimal },
    #[error("{field}: timestamp {value:?} has no UTC offset")]
    NaiveTimestamp { field: &'static str, value: String },
    #[error("{field}: cannot parse date {value:?}")]
    UnparsableDate { field: &'static str, value: String },
    #[error("{field}: cannot parse number {value:?}")]
    UnparsableNumber { field: &'static str, value: String },
    #[error("unknown trade type: {0}")]
    UnknownTradeType(String),
    #[error("unknown side: {0}")]
    UnknownSide(String),
    #[error("threshold must be within 0..=1, got {0}")]
    ThresholdOutOfRange(String),
}

/// Keep trades with `start <= timestamp <= end`; either bound may be open.
pub fn by_date_range(
    trades: &[Trade],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<Trade>, ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ValidationError::InvertedDateRange { start, end });
        }
    }

    Ok(trades
        .iter()
        .filter(|t| start.map_or(true, |s| t.timestamp >= s))
        .filter(|t| end.map_or(true, |e| t.timestamp <= e))
        .cloned()
        .collect())
}

/// Keep trades whose type is in `types`. `None` or an empty set keeps all.
pub fn by_trade_type(trades: &[Trade], types: Option<&BTreeSet<TradeType>>) -> Vec<Trade> {
    match types.filter(|set| !set.is_empty()) {
        Some(set) => trades
            .iter()
            .filter(|t| set.contains(&t.trade_type))
            .cloned()
            .collect(),
        None => trades.to_vec(),
    }
}

/// Keep trades whose side is in `sides`. `None` or an empty set keeps all.
pub fn by_side(trades: &[Trade], sides: Option<&BTreeSet<OutcomeSide>>) -> Vec<Trade> {
    match sides.filter(|set| !set.is_empty()) {
        Some(set) => trades
            .iter()
            .filter(|t| set.contains(&t.side))
            .cloned()
            .collect(),
        None => trades.to_vec(),
    }
}

/// Keep trades with `min <= pnl <= max`; either bound may be open.
pub fn by_pnl_range(
    trades: &[Trade],
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Result<Vec<Trade>, ValidationError> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ValidationError::InvertedPnlRange { min, max });
        }
    }

    Ok(trades
        .iter()
        .filter(|t| min.map_or(true, |m| t.pnl >= m))
        .filter(|t| max.map_or(true, |m| t.pnl <= m))
        .cloned()
        .collect())
}

/// Keep trades of a single market, compared by market key.
pub fn by_market(trades: &[Trade], market: Option<&MarketKey>) -> Vec<Trade> {
    match market {
        Some(key) => trades
            .iter()
            .filter(|t| t.market_key() == *key)
            .cloned()
            .collect(),
        None => trades.to_vec(),
    }
}

/// A validated set of filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub types: Option<BTreeSet<TradeType>>,
    pub sides: Option<BTreeSet<OutcomeSide>>,
    pub min_pnl: Option<Decimal>,
    pub max_pnl: Option<Decimal>,
    pub market_slug: Option<MarketKey>,
}

impl FilterSpec {
    /// Reject inverted bounds before any trade is looked at.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ValidationError::InvertedDateRange { start, end });
            }
        }
        if let (Some(min), Some(max)) = (self.min_pnl, self.max_pnl) {
            if min > max {
                return Err(ValidationError::InvertedPnlRange { min, max });
            }
        }
        Ok(())
    }
}

/// Validate `spec`, then apply every filter it sets.
pub fn apply_filters(trades: &[Trade], spec: &FilterSpec) -> Result<Vec<Trade>, ValidationError> {
    spec.validate()?;

    let filtered = by_date_range(trades, spec.start, spec.end)?;
    let filtered = by_trade_type(&filtered, spec.types.as_ref());
    let filtered = by_side(&filtered, spec.sides.as_ref());
    let filtered = by_pnl_range(&filtered, spec.min_pnl, spec.max_pnl)?;
    Ok(by_market(&filtered, spec.market_slug.as_ref()))
}

/// String form of a `FilterSpec`, as received in query parameters.
///
/// `types` and `sides` are comma-separated lists. Date bounds accept a
/// `YYYY-MM-DD` day (UTC; the end bound covers the whole day) or a date-time
/// with an explicit offset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub types: Option<String>,
    pub sides: Option<String>,
    pub min_pnl: Option<String>,
    pub max_pnl: Option<String>,
    pub market: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound(field: &'static str, raw: &str, bound: Bound) -> Result<DateTime<Utc>, ValidationError> {
    let parsed = parse_datetime_str(raw).map_err(|_| ValidationError::UnparsableDate {
        field,
        value: raw.to_string(),
    })?;

    match parsed {
        ParsedInstant::Aware(dt) => Ok(dt),
        ParsedInstant::Naive(_) => Err(ValidationError::NaiveTimestamp {
            field,
            value: raw.to_string(),
        }),
        ParsedInstant::Date(date) => {
            let time = match bound {
                Bound::Start => date.and_hms_nano_opt(0, 0, 0, 0),
                Bound::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
            };
            time.map(|naive| naive.and_utc())
                .ok_or_else(|| ValidationError::UnparsableDate {
                    field,
                    value: raw.to_string(),
                })
        }
    }
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, ValidationError> {
    Decimal::from_str_canonical(raw.trim()).map_err(|_| ValidationError::UnparsableNumber {
        field,
        value: raw.to_string(),
    })
}

fn parse_list<T: Ord>(
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
    unknown: impl Fn(String) -> ValidationError,
) -> Result<Option<BTreeSet<T>>, ValidationError> {
    let mut set = BTreeSet::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        set.insert(parse(item).ok_or_else(|| unknown(item.to_string()))?);
    }
    Ok((!set.is_empty()).then_some(set))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl FilterParams {
    pub fn into_spec(self) -> Result<FilterSpec, ValidationError> {
        let spec = FilterSpec {
            start: present(&self.start_date)
                .map(|s| parse_bound("startDate", s, Bound::Start))
                .transpose()?,
            end: present(&self.end_date)
                .map(|s| parse_bound("endDate", s, Bound::End))
                .transpose()?,
            types: match present(&self.types) {
                Some(raw) => parse_list(raw, TradeType::from_raw, ValidationError::UnknownTradeType)?,
                None => None,
            },
            sides: match present(&self.sides) {
                Some(raw) => parse_list(raw, OutcomeSide::from_raw, ValidationError::UnknownSide)?,
                None => None,
            },
            min_pnl: present(&self.min_pnl)
                .map(|s| parse_decimal("minPnl", s))
                .transpose()?,
            max_pnl: present(&self.max_pnl)
                .map(|s| parse_decimal("maxPnl", s))
                .transpose()?,
            market_slug: present(&self.market).map(MarketKey::parse),
        };
        spec.validate()?;
        Ok(spec)
    }
}
