//! Canonical chronological ordering of trades.

use crate::domain::Trade;

/// Sort key for the ledger walk: timestamp first, then original input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TradeOrderingKey {
    /// Nanoseconds since Unix epoch (primary sort).
    pub time_ns: i128,
    /// Position in the input sequence (tie-breaker).
    pub input_pos: usize,
}

impl TradeOrderingKey {
    pub fn new(trade: &Trade, input_pos: usize) -> Self {
        let ts = trade.timestamp;
        TradeOrderingKey {
            time_ns: i128::from(ts.timestamp()) * 1_000_000_000
                + i128::from(ts.timestamp_subsec_nanos()),
            input_pos,
        }
    }
}

/// Return references to `trades` in chronological order, ties kept in input order.
pub fn chronological(trades: &[Trade]) -> Vec<&Trade> {
    let mut keyed: Vec<(TradeOrderingKey, &Trade)> = trades
        .iter()
        .enumerate()
        .map(|(pos, t)| (TradeOrderingKey::new(t, pos), t))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, t)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, OutcomeSide, TradeType};
    use chrono::{TimeZone, Utc};

    fn trade(secs: i64, market: &str) -> Trade {
        Trade::new(
            market.to_string(),
            None,
            Utc.timestamp_opt(secs, 0).unwrap(),
            Decimal::from_str_canonical("0.5").unwrap(),
            Decimal::from_str_canonical("1").unwrap(),
            Decimal::from_str_canonical("0.5").unwrap(),
            TradeType::Buy,
            OutcomeSide::Yes,
        )
    }

    #[test]
    fn test_chronological_sorts_by_time() {
        let trades = vec![trade(30, "c"), trade(10, "a"), trade(20, "b")];
        let sorted: Vec<_> = chronological(&trades).iter().map(|t| t.market.as_str()).collect();
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let trades = vec![trade(10, "first"), trade(5, "early"), trade(10, "second")];
        let sorted: Vec<_> = chronological(&trades).iter().map(|t| t.market.as_str()).collect();
        assert_eq!(sorted, vec!["early", "first", "second"]);
    }

    #[test]
    fn test_ordering_key_compares_time_before_position() {
        let a = TradeOrderingKey::new(&trade(10, "a"), 5);
        let b = TradeOrderingKey::new(&trade(20, "b"), 0);
        assert!(a < b);
    }
}
