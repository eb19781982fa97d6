//! Canonical trade record produced by the normalizer.

use crate::domain::{Decimal, MarketKey, OutcomeSide, TradeType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single prediction-market trade in canonical units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Display title of the market.
    pub market: String,
    /// Canonical market identifier, when the source had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_slug: Option<String>,
    /// Execution time (always UTC-aware).
    pub timestamp: DateTime<Utc>,
    /// Price per share, conceptually in [0, 1].
    pub price: Decimal,
    /// Shares traded (never negative).
    pub shares: Decimal,
    /// Collateral moved, in canonical currency units.
    pub cost: Decimal,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub side: OutcomeSide,
    /// Realized PnL; zero when the source did not report one.
    pub pnl: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market: String,
        market_slug: Option<String>,
        timestamp: DateTime<Utc>,
        price: Decimal,
        shares: Decimal,
        cost: Decimal,
        trade_type: TradeType,
        side: OutcomeSide,
    ) -> Self {
        Trade {
            market,
            market_slug,
            timestamp,
            price,
            shares,
            cost,
            trade_type,
            side,
            pnl: Decimal::zero(),
            tx_hash: None,
        }
    }

    pub fn with_pnl(mut self, pnl: Decimal) -> Self {
        self.pnl = pnl;
        self
    }

    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    /// Grouping key: slug if present, normalized title otherwise.
    pub fn market_key(&self) -> MarketKey {
        match self.market_slug.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(slug) => MarketKey::from_slug(slug),
            None => MarketKey::from_title(&self.market),
        }
    }

    /// True when the trade arrived with a non-zero PnL from its source.
    pub fn has_reported_pnl(&self) -> bool {
        !self.pnl.is_zero()
    }

    /// Stable identity used for exact-duplicate detection.
    ///
    /// Covers market key, timestamp, price, shares, cost, type and side.
    /// `tx_hash` and `pnl` are not part of the key.
    pub fn dedup_key(&self) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, self.market_key().as_str());
        hasher.update(self.timestamp.timestamp().to_le_bytes());
        hasher.update(self.timestamp.timestamp_subsec_nanos().to_le_bytes());
        hash_var(&mut hasher, &self.price.to_canonical_string());
        hash_var(&mut hasher, &self.shares.to_canonical_string());
        hash_var(&mut hasher, &self.cost.to_canonical_string());
        hash_var(&mut hasher, self.trade_type.as_str());
        hash_var(&mut hasher, self.side.as_str());

        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }
}
