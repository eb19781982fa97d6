//! Best-effort guess of how a market resolved.
//!
//! The guess looks only at the market's latest trade. A final trade that was
//! not representative of settlement gives a wrong answer; callers should
//! present the result as a heuristic, not as settlement data.

use crate::domain::{Decimal, MarketKey, OutcomeSide, Trade, TradeOrderingKey};
use serde::Serialize;

/// Price at or above which the latest trade is read as a YES resolution.
pub fn default_resolution_threshold() -> Decimal {
    Decimal::new(rust_decimal::Decimal::new(5, 1))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredOutcome<'a> {
    pub side: OutcomeSide,
    pub evidence: &'a Trade,
}

/// Infer the resolved side of `market` from its chronologically latest trade.
///
/// `price >= threshold` reads as YES; otherwise the side opposite to the
/// evidence trade's side. `None` when the market has no trades.
pub fn infer_outcome<'a>(
    trades: &'a [Trade],
    market: &MarketKey,
    threshold: Decimal,
) -> Option<InferredOutcome<'a>> {
    let evidence = trades
        .iter()
        .enumerate()
        .filter(|(_, t)| t.market_key() == *market)
        .max_by_key(|(pos, t)| TradeOrderingKey::new(t, *pos))
        .map(|(_, t)| t)?;

    let side = if evidence.price >= threshold {
        OutcomeSide::Yes
    } else {
        evidence.side.opposite()
    };

    Some(InferredOutcome { side, evidence })
}
