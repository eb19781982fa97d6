use crate::domain::{Decimal, OutcomeSide, Trade, TradeType};
use serde::Serialize;
use tracing::warn;

/// Holdings of one outcome token (YES or NO) within a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionState {
    /// Shares currently held (never negative).
    pub held: Decimal,

    /// Weighted-average price paid per held share (zero when flat).
    pub avg_cost_basis: Decimal,
}

impl PositionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.held.is_zero()
    }
}

/// Where a ledger entry's PnL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PnlOrigin {
    /// Carried by the source record; taken as-is.
    Reported,
    /// Realized against the average cost basis.
    Computed,
}

/// What one trade did to its market's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeEffect {
    pub pnl: Decimal,
    pub origin: PnlOrigin,
    /// Shares actually closed against holdings (zero for buys).
    pub closed_shares: Decimal,
    /// Sold shares with no holdings behind them.
    pub unmatched_shares: Decimal,
}

/// Running position of a single market, one `PositionState` per outcome side.
///
/// Trades must be fed in chronological order; the caller owns the sort.
/// Amounts are assumed to lie within `ingest::schema::MAX_ABS_AMOUNT`, which
/// `normalize` enforces; inside that bound the arithmetic here cannot overflow.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    pub yes: PositionState,
    pub no: PositionState,
    realized_pnl: Decimal,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, side: OutcomeSide) -> &PositionState {
        match side {
            OutcomeSide::Yes => &self.yes,
            OutcomeSide::No => &self.no,
        }
    }

    fn state_mut(&mut self, side: OutcomeSide) -> &mut PositionState {
        match side {
            OutcomeSide::Yes => &mut self.yes,
            OutcomeSide::No => &mut self.no,
        }
    }

    /// Signed share exposure: YES held minus NO held.
    pub fn exposure(&self) -> Decimal {
        self.yes.held - self.no.held
    }

    /// Sum of realized PnL so far, reported or computed.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Apply one trade and return its PnL effect.
    ///
    /// Holdings always move with the trade. A source-reported PnL is used
    /// unchanged; otherwise a Buy realizes nothing and a Sell realizes
    /// `(price - avg_cost_basis) * closed` on the shares it can close.
    pub fn process_trade(&mut self, trade: &Trade) -> TradeEffect {
        let (computed, closed_shares, unmatched_shares) = match trade.trade_type {
            TradeType::Buy => {
                self.handle_buy(trade);
                (Decimal::zero(), Decimal::zero(), Decimal::zero())
            }
            TradeType::Sell => self.handle_sell(trade),
        };

        let (pnl, origin) = if trade.has_reported_pnl() {
            (trade.pnl, PnlOrigin::Reported)
        } else {
            (computed, PnlOrigin::Computed)
        };
        self.realized_pnl += pnl;

        TradeEffect {
            pnl,
            origin,
            closed_shares,
            unmatched_shares,
        }
    }

    /// Increase holdings and re-weight the cost basis.
    fn handle_buy(&mut self, trade: &Trade) {
        let state = self.state_mut(trade.side);
        let new_held = state.held + trade.shares;
        if new_held.is_zero() {
            return;
        }

        let old_value = state.held * state.avg_cost_basis;
        let added_value = trade.shares * trade.price;
        state.avg_cost_basis = (old_value + added_value) / new_held;
        state.held = new_held;
    }

    /// Decrease holdings; returns (realized pnl, closed, unmatched).
    fn handle_sell(&mut self, trade: &Trade) -> (Decimal, Decimal, Decimal) {
        let state = self.state_mut(trade.side);
        let closed = trade.shares.min(state.held);
        let unmatched = trade.shares - closed;
        let pnl = (trade.price - state.avg_cost_basis) * closed;

        state.held = state.held - closed;
        if state.held.is_zero() {
            *state = PositionState::new();
        }

        if unmatched.is_positive() {
            warn!(
                "Sell of {} {} shares in '{}' exceeds holdings; {} shares unmatched",
                trade.shares, trade.side, trade.market, unmatched
            );
        }

        (pnl, closed, unmatched)
    }
}
