//! Domain primitives: TradeType, OutcomeSide, MarketKey.
//!
//! Raw exchange/file spellings are mapped through closed tables; anything
//! outside a table is rejected rather than defaulted.

use serde::{Deserialize, Serialize};

/// Order direction after collapsing "Market Buy", "Limit Sell", etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TradeType {
    Buy,
    Sell,
}

/// Every raw trade-type spelling we accept, compared case-insensitively.
const TRADE_TYPE_VARIANTS: &[(&str, TradeType)] = &[
    ("buy", TradeType::Buy),
    ("market buy", TradeType::Buy),
    ("limit buy", TradeType::Buy),
    ("marketbuy", TradeType::Buy),
    ("limitbuy", TradeType::Buy),
    ("market_buy", TradeType::Buy),
    ("limit_buy", TradeType::Buy),
    ("b", TradeType::Buy),
    ("sell", TradeType::Sell),
    ("market sell", TradeType::Sell),
    ("limit sell", TradeType::Sell),
    ("marketsell", TradeType::Sell),
    ("limitsell", TradeType::Sell),
    ("market_sell", TradeType::Sell),
    ("limit_sell", TradeType::Sell),
    ("s", TradeType::Sell),
];

impl TradeType {
    /// Map a raw spelling to its canonical type. `None` for unknown variants.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_ascii_lowercase();
        TRADE_TYPE_VARIANTS
            .iter()
            .find(|(variant, _)| *variant == needle)
            .map(|(_, t)| *t)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "Buy",
            TradeType::Sell => "Sell",
        }
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome token traded: YES or NO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutcomeSide {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

const OUTCOME_SIDE_VARIANTS: &[(&str, OutcomeSide)] = &[
    ("yes", OutcomeSide::Yes),
    ("y", OutcomeSide::Yes),
    ("no", OutcomeSide::No),
    ("n", OutcomeSide::No),
];

impl OutcomeSide {
    pub fn from_raw(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_ascii_lowercase();
        OUTCOME_SIDE_VARIANTS
            .iter()
            .find(|(variant, _)| *variant == needle)
            .map(|(_, s)| *s)
    }

    /// Exchange outcome index: 0 = YES, 1 = NO.
    pub fn from_outcome_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(OutcomeSide::Yes),
            1 => Some(OutcomeSide::No),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            OutcomeSide::Yes => OutcomeSide::No,
            OutcomeSide::No => OutcomeSide::Yes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeSide::Yes => "YES",
            OutcomeSide::No => "NO",
        }
    }
}

impl std::fmt::Display for OutcomeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping identity of a market.
///
/// The slug when the source provided one, otherwise `title:` plus the
/// normalized display title. The prefix keeps a title-derived key from
/// colliding with a real slug.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketKey(String);

impl MarketKey {
    pub fn from_slug(slug: &str) -> Self {
        MarketKey(slug.trim().to_string())
    }

    pub fn from_title(title: &str) -> Self {
        MarketKey(format!("title:{}", normalize_title(title)))
    }

    /// Rebuild a key from its string form (as produced by `as_str`).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().strip_prefix("title:") {
            Some(title) => Self::from_title(title),
            None => Self::from_slug(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MarketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case, trim, and collapse internal whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
