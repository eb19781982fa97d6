//! Fuzzy market-name resolution.

use crate::domain::{MarketKey, Trade};
use crate::engine::dedup::unique_markets;

/// Minimum similarity accepted when no threshold is configured.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Shorter queries (ignoring whitespace) get no substring preference and must
/// clear the similarity threshold like any other query.
pub const MIN_SUBSTRING_QUERY_LEN: usize = 3;

/// Similarity in [0, 1]: Sørensen–Dice over character bigrams, case-insensitive.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(&a.to_lowercase(), &b.to_lowercase())
}

/// Resolve `query` to one of `known_titles`.
///
/// A title containing the query (case-insensitive) beats any title that only
/// scores well on similarity; among several such titles the best-scoring one
/// wins. This applies to queries of at least `MIN_SUBSTRING_QUERY_LEN`
/// characters. Otherwise the best-scoring title is returned only when its
/// score is at least `threshold`. Ties keep the earliest title.
pub fn match_market<'a, S: AsRef<str>>(
    query: &str,
    known_titles: &'a [S],
    threshold: f64,
) -> Option<&'a str> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let substring_allowed =
        needle.chars().filter(|c| !c.is_whitespace()).count() >= MIN_SUBSTRING_QUERY_LEN;
    let mut best_substring: Option<(f64, &'a str)> = None;
    let mut best_fuzzy: Option<(f64, &'a str)> = None;

    for title in known_titles {
        let title = title.as_ref();
        let score = similarity(&needle, title);
        let slot = if substring_allowed && title.to_lowercase().contains(&needle) {
            &mut best_substring
        } else {
            &mut best_fuzzy
        };
        if slot.map(|(best, _)| score > best).unwrap_or(true) {
            *slot = Some((score, title));
        }
    }

    if let Some((_, title)) = best_substring {
        return Some(title);
    }
    best_fuzzy
        .filter(|(score, _)| *score >= threshold)
        .map(|(_, title)| title)
}

/// Resolve a query against the markets present in `trades`: titles first,
/// then slugs.
pub fn resolve_market(query: &str, trades: &[Trade], threshold: f64) -> Option<MarketKey> {
    let markets = unique_markets(trades);

    let titles: Vec<&str> = markets.values().map(String::as_str).collect();
    if let Some(title) = match_market(query, &titles, threshold) {
        return markets
            .iter()
            .find(|(_, t)| t.as_str() == title)
            .map(|(key, _)| key.clone());
    }

    let slugs: Vec<&str> = trades
        .iter()
        .filter_map(|t| t.market_slug.as_deref())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    match_market(query, &slugs, threshold).map(MarketKey::from_slug)
}

/// Trades of the market named by `query`.
///
/// With `fuzzy` the query goes through `resolve_market`; without it the query
/// must equal a title or slug exactly. No match yields an empty list.
pub fn filter_by_market(trades: &[Trade], query: &str, fuzzy: bool, threshold: f64) -> Vec<Trade> {
    if fuzzy {
        let Some(key) = resolve_market(query, trades, threshold) else {
            return Vec::new();
        };
        return trades
            .iter()
            .filter(|t| t.market_key() == key)
            .cloned()
            .collect();
    }

    trades
        .iter()
        .filter(|t| t.market == query || t.market_slug.as_deref() == Some(query))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, OutcomeSide, TradeType};
    use chrono::{TimeZone, Utc};

    fn trade(market: &str, slug: Option<&str>) -> Trade {
        Trade::new(
            market.to_string(),
            slug.map(str::to_string),
            Utc.timestamp_opt(1, 0).unwrap(),
            Decimal::from_str_canonical("0.5").unwrap(),
            Decimal::from_str_canonical("1").unwrap(),
            Decimal::from_str_canonical("0.5").unwrap(),
            TradeType::Buy,
            OutcomeSide::Yes,
        )
    }

    #[test]
    fn test_below_threshold_is_none() {
        assert_eq!(match_market("BTC-USD", &["ETH-USD"], 0.6), None);
    }

    #[test]
    fn test_close_match_is_found() {
        assert_eq!(match_market("BTC-US", &["BTC-USD"], 0.6), Some("BTC-USD"));
    }

    #[test]
    fn test_substring_beats_higher_ratio() {
        // The query scores higher against the second title, but only the
        // first contains it verbatim.
        let titles = ["Will Bitcoin close above 100k by December?", "bitcoin prices"];
        let query = "bitcoin close";
        assert!(similarity(query, titles[1]) > similarity(query, titles[0]));
        assert_eq!(match_market(query, &titles, 0.6), Some(titles[0]));
    }

    #[test]
    fn test_short_query_needs_the_threshold() {
        let titles = ["Will BTC hit 100k?", "Fed cuts in March?"];
        assert_eq!(match_market("a", &titles, 0.6), None);
        assert_eq!(match_market("in", &titles, 0.6), None);
        assert_eq!(match_market("fed", &titles, 0.6), Some(titles[1]));
        assert_eq!(match_market("ab", &["AB"], 0.6), Some("AB"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(match_market("btc-usd", &["BTC-USD"], 0.9), Some("BTC-USD"));
    }

    #[test]
    fn test_empty_query_and_titles() {
        assert_eq!(match_market("   ", &["BTC-USD"], 0.0), None);
        let none: [&str; 0] = [];
        assert_eq!(match_market("BTC", &none, 0.0), None);
    }

    #[test]
    fn test_resolve_market_prefers_titles_then_slugs() {
        let trades = vec![
            trade("Will ETH flip BTC?", Some("eth-flip")),
            trade("Fed cuts rates in March", Some("fed-march-cut")),
        ];
        assert_eq!(
            resolve_market("eth flip", &trades, 0.6),
            Some(MarketKey::from_slug("eth-flip"))
        );
        assert_eq!(
            resolve_market("fed-march-cut", &trades, 0.6),
            Some(MarketKey::from_slug("fed-march-cut"))
        );
        assert_eq!(resolve_market("election", &trades, 0.6), None);
    }

    #[test]
    fn test_filter_by_market_exact_and_fuzzy() {
        let trades = vec![
            trade("Will ETH flip BTC?", Some("eth-flip")),
            trade("Fed cuts rates in March", Some("fed-march-cut")),
            trade("Will ETH flip BTC?", Some("eth-flip")),
        ];
        assert_eq!(filter_by_market(&trades, "eth-flip", false, 0.6).len(), 2);
        assert_eq!(filter_by_market(&trades, "eth flip", false, 0.6).len(), 0);
        assert_eq!(filter_by_market(&trades, "eth flip", true, 0.6).len(), 2);
        assert!(filter_by_market(&trades, "zzz", true, 0.6).is_empty());
    }
}
