//! Pure computation over canonical trades: dedup, matching, filters,
//! the PnL ledger and outcome inference.

pub mod dedup;
pub mod filters;
pub mod inference;
pub mod ledger;
pub mod matcher;
pub mod position_tracker;
pub mod summary;

pub use dedup::{deduplicate, group_by_market, unique_markets};
pub use filters::{
    apply_filters, by_date_range, by_market, by_pnl_range, by_side, by_trade_type, FilterParams,
    FilterSpec, ValidationError,
};
pub use inference::{default_resolution_threshold, infer_outcome, InferredOutcome};
pub use ledger::{build_ledger, settle_trades, LedgerEntry};
pub use matcher::{filter_by_market, match_market, resolve_market, similarity, DEFAULT_MATCH_THRESHOLD};
pub use position_tracker::{PnlOrigin, PositionState, PositionTracker, TradeEffect};
pub use summary::{
    compute_summary, summarize_settled, MarketSummary, Metrics, PerMarketSummary,
    PortfolioSummary, Ratio, Summary, SummaryScope,
};
