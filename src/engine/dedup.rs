//! Exact-duplicate removal and market grouping.

use crate::domain::{MarketKey, Trade};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Drop exact duplicates, keeping the first occurrence and the input order.
///
/// Two trades are duplicates when their `Trade::dedup_key` matches; the
/// transaction hash plays no part.
pub fn deduplicate(trades: &[Trade]) -> Vec<Trade> {
    let mut seen = HashSet::with_capacity(trades.len());
    let unique: Vec<Trade> = trades
        .iter()
        .filter(|t| seen.insert(t.dedup_key()))
        .cloned()
        .collect();

    let removed = trades.len() - unique.len();
    if removed > 0 {
        debug!("Removed {} duplicate trades", removed);
    }
    unique
}

/// Group trades by market key. Trades without a slug group under their
/// normalized title; none are dropped. Input order is kept inside each group.
pub fn group_by_market(trades: &[Trade]) -> BTreeMap<MarketKey, Vec<&Trade>> {
    let mut groups: BTreeMap<MarketKey, Vec<&Trade>> = BTreeMap::new();
    for trade in trades {
        groups.entry(trade.market_key()).or_default().push(trade);
    }
    groups
}

/// Market key to display title (first title seen for the key).
pub fn unique_markets(trades: &[Trade]) -> BTreeMap<MarketKey, String> {
    let mut markets = BTreeMap::new();
    for trade in trades {
        markets
            .entry(trade.market_key())
            .or_insert_with(|| trade.market.clone());
    }
    markets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, OutcomeSide, TradeType};
    use chrono::{TimeZone, Utc};

    fn trade(market: &str, slug: Option<&str>, secs: i64, price: &str) -> Trade {
        Trade::new(
            market.to_string(),
            slug.map(str::to_string),
            Utc.timestamp_opt(secs, 0).unwrap(),
            Decimal::from_str_canonical(price).unwrap(),
            Decimal::from_str_canonical("10").unwrap(),
            Decimal::from_str_canonical("5").unwrap(),
            TradeType::Buy,
            OutcomeSide::Yes,
        )
    }

    #[test]
    fn test_keeps_first_occurrence_in_order() {
        let a = trade("A", Some("a"), 1, "0.5");
        let b = trade("B", Some("b"), 2, "0.5");
        let a_again = a.clone().with_tx_hash("0xfeed");
        let out = deduplicate(&[a.clone(), b.clone(), a_again]);
        assert_eq!(out, vec![a, b]);
    }

    #[test]
    fn test_tx_hash_presence_does_not_hide_duplicates() {
        let with_hash = trade("A", Some("a"), 1, "0.5").with_tx_hash("0x1");
        let other_hash = trade("A", Some("a"), 1, "0.5").with_tx_hash("0x2");
        assert_eq!(deduplicate(&[with_hash, other_hash]).len(), 1);
    }

    #[test]
    fn test_distinct_slugless_markets_are_not_merged() {
        let a = trade("Market A", None, 1, "0.5");
        let b = trade("Market B", None, 1, "0.5");
        assert_eq!(deduplicate(&[a, b]).len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let trades = vec![
            trade("A", Some("a"), 1, "0.5"),
            trade("A", Some("a"), 1, "0.5"),
            trade("A", Some("a"), 2, "0.5"),
        ];
        let once = deduplicate(&trades);
        assert_eq!(deduplicate(&once), once);
    }

    #[test]
    fn test_group_by_market_uses_title_fallback() {
        let trades = vec![
            trade("Alpha", Some("alpha"), 1, "0.5"),
            trade("No Slug Market", None, 2, "0.5"),
            trade("no slug   market", None, 3, "0.5"),
        ];
        let groups = group_by_market(&trades);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&MarketKey::from_slug("alpha")].len(), 1);
        let fallback = &groups[&MarketKey::from_title("no slug market")];
        assert_eq!(fallback.len(), 2);
        assert_eq!(fallback[0].timestamp.timestamp(), 2);
    }

    #[test]
    fn test_unique_markets_maps_key_to_title() {
        let trades = vec![trade("Alpha", Some("alpha"), 1, "0.5"), trade("Beta", None, 2, "0.5")];
        let markets = unique_markets(&trades);
        assert_eq!(markets[&MarketKey::from_slug("alpha")], "Alpha");
        assert_eq!(markets[&MarketKey::from_title("Beta")], "Beta");
    }
}
