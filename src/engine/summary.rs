//! Aggregate PnL metrics over a settled ledger.

use super::ledger::build_ledger;
use crate::domain::{Decimal, MarketKey, Trade, TradeType};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A ratio that may have no meaningful value (zero denominator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ratio {
    Value(Decimal),
    NotApplicable,
}

impl Ratio {
    /// `numerator / denominator`, or `NotApplicable` when the denominator is zero.
    pub fn of(numerator: Decimal, denominator: Decimal) -> Self {
        match numerator.checked_div(denominator) {
            Some(v) => Ratio::Value(v),
            None => Ratio::NotApplicable,
        }
    }

    /// Same as `of`, scaled to percent. A quotient too large to scale is
    /// `NotApplicable` as well.
    pub fn percent(numerator: Decimal, denominator: Decimal) -> Self {
        match Self::of(numerator, denominator) {
            Ratio::Value(v) => v
                .checked_mul(Decimal::hundred())
                .map_or(Ratio::NotApplicable, Ratio::Value),
            Ratio::NotApplicable => Ratio::NotApplicable,
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Ratio::Value(v) => Some(*v),
            Ratio::NotApplicable => None,
        }
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ratio::Value(v) => v.serialize(serializer),
            Ratio::NotApplicable => serializer.serialize_str("n/a"),
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Value(v) => write!(f, "{}", v.round_dp(2)),
            Ratio::NotApplicable => f.write_str("n/a"),
        }
    }
}

/// Metrics shared by the global and per-market views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub trade_count: usize,
    /// Sum of cost over all trades.
    pub total_volume: Decimal,
    /// Sum of cost over Buy trades.
    pub total_invested: Decimal,
    pub total_pnl: Decimal,
    pub average_pnl: Ratio,
    /// Percent of winning trades among winners and losers; breakeven excluded.
    pub win_rate: Ratio,
    /// `total_pnl / total_invested`, in percent.
    pub roi: Ratio,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
}

impl Metrics {
    /// Compute metrics over trades whose PnL is already settled.
    pub fn from_settled<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Self {
        let mut trade_count = 0usize;
        let mut total_volume = Decimal::zero();
        let mut total_invested = Decimal::zero();
        let mut total_pnl = Decimal::zero();
        let (mut winning, mut losing, mut breakeven) = (0usize, 0usize, 0usize);

        for trade in trades {
            trade_count += 1;
            total_volume += trade.cost;
            if trade.trade_type == TradeType::Buy {
                total_invested += trade.cost;
            }
            total_pnl += trade.pnl;

            if trade.pnl.is_positive() {
                winning += 1;
            } else if trade.pnl.is_negative() {
                losing += 1;
            } else {
                breakeven += 1;
            }
        }

        Metrics {
            trade_count,
            total_volume,
            total_invested,
            total_pnl,
            average_pnl: Ratio::of(total_pnl, Decimal::from(trade_count as i64)),
            win_rate: Ratio::percent(
                Decimal::from(winning as i64),
                Decimal::from((winning + losing) as i64),
            ),
            roi: Ratio::percent(total_pnl, total_invested),
            winning_trades: winning,
            losing_trades: losing,
            breakeven_trades: breakeven,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryScope {
    #[default]
    Global,
    PerMarket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub market_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub market_key: MarketKey,
    pub market: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerMarketSummary {
    pub market_count: usize,
    pub markets: Vec<MarketSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "scope")]
pub enum Summary {
    Global(PortfolioSummary),
    PerMarket(PerMarketSummary),
}

impl Summary {
    pub fn as_global(&self) -> Option<&PortfolioSummary> {
        match self {
            Summary::Global(s) => Some(s),
            Summary::PerMarket(_) => None,
        }
    }

    pub fn as_per_market(&self) -> Option<&PerMarketSummary> {
        match self {
            Summary::PerMarket(s) => Some(s),
            Summary::Global(_) => None,
        }
    }
}

/// Settle PnL through the ledger walk, then aggregate at the requested scope.
pub fn compute_summary(trades: &[Trade], scope: SummaryScope) -> Summary {
    let settled: Vec<Trade> = build_ledger(trades).into_iter().map(|e| e.trade).collect();
    summarize_settled(&settled, scope)
}

/// Aggregate trades whose PnL has already been settled by a ledger walk
/// (possibly over a larger history than `settled`).
pub fn summarize_settled(settled: &[Trade], scope: SummaryScope) -> Summary {
    match scope {
        SummaryScope::Global => {
            let market_count = settled
                .iter()
                .map(Trade::market_key)
                .collect::<BTreeSet<_>>()
                .len();
            Summary::Global(PortfolioSummary {
                metrics: Metrics::from_settled(settled),
                market_count,
            })
        }
        SummaryScope::PerMarket => {
            let mut groups: BTreeMap<MarketKey, Vec<&Trade>> = BTreeMap::new();
            for trade in settled {
                groups.entry(trade.market_key()).or_default().push(trade);
            }

            let markets: Vec<MarketSummary> = groups
                .into_iter()
                .map(|(market_key, trades)| MarketSummary {
                    market: trades
                        .first()
                        .map(|t| t.market.clone())
                        .unwrap_or_default(),
                    metrics: Metrics::from_settled(trades),
                    market_key,
                })
                .collect();

            Summary::PerMarket(PerMarketSummary {
                market_count: markets.len(),
                markets,
            })
        }
    }
}
