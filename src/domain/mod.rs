//! Domain types and determinism layer for the trade ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Closed enumerations for trade type and outcome side
//! - The canonical Trade record and its duplicate-detection key
//! - Stable chronological ordering for the ledger walk

pub mod decimal;
pub mod ordering;
pub mod primitives;
pub mod time;
pub mod trade;

pub use decimal::{Decimal, MICRO_UNITS_PER_UNIT};
pub use ordering::{chronological, TradeOrderingKey};
pub use primitives::{normalize_title, MarketKey, OutcomeSide, TradeType};
pub use time::{parse_datetime_str, parse_timestamp_value, ParsedInstant, TimestampError};
pub use trade::Trade;
