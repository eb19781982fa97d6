//! Chronological ledger walk across all markets.

use super::position_tracker::{PnlOrigin, PositionTracker};
use crate::domain::{chronological, Decimal, MarketKey, Trade};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// One step of the ledger: a trade with its PnL filled in and the position
/// state of its market right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub trade: Trade,
    pub market_key: MarketKey,
    pub pnl_origin: PnlOrigin,
    /// YES held minus NO held in this market.
    pub exposure: Decimal,
    /// Average cost basis of the traded side after the trade.
    pub avg_cost_basis: Decimal,
    pub market_cumulative_pnl: Decimal,
    pub cumulative_pnl: Decimal,
    pub unmatched_shares: Decimal,
}

/// Walk `trades` in canonical order (timestamp, then input position) and
/// return one entry per trade.
///
/// Each market keeps its own `PositionTracker`; the walk itself is sequential
/// because every step depends on the previous state of its market.
pub fn build_ledger(trades: &[Trade]) -> Vec<LedgerEntry> {
    let mut trackers: HashMap<MarketKey, PositionTracker> = HashMap::new();
    let mut cumulative = Decimal::zero();
    let mut entries = Vec::with_capacity(trades.len());

    for trade in chronological(trades) {
        let key = trade.market_key();
        let tracker = trackers.entry(key.clone()).or_default();
        let effect = tracker.process_trade(trade);
        cumulative += effect.pnl;

        let mut settled = trade.clone();
        settled.pnl = effect.pnl;

        entries.push(LedgerEntry {
            avg_cost_basis: tracker.state(trade.side).avg_cost_basis,
            exposure: tracker.exposure(),
            market_cumulative_pnl: tracker.realized_pnl(),
            cumulative_pnl: cumulative,
            pnl_origin: effect.origin,
            unmatched_shares: effect.unmatched_shares,
            market_key: key,
            trade: settled,
        });
    }

    debug!(
        "Ledger walk: {} trades across {} markets",
        entries.len(),
        trackers.len()
    );
    entries
}

/// Trades in canonical order with engine-computed PnL filled in where the
/// source reported none.
pub fn settle_trades(trades: &[Trade]) -> Vec<Trade> {
    build_ledger(trades).into_iter().map(|e| e.trade).collect()
}
