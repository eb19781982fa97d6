//! The analysis context every query runs against.

use crate::datasource::FetchOutcome;
use crate::domain::{Decimal, MarketKey, Trade};
use crate::engine::{
    apply_filters, build_ledger, deduplicate, infer_outcome, resolve_market, summarize_settled,
    unique_markets, FilterSpec, InferredOutcome, LedgerEntry, Summary, SummaryScope,
    ValidationError,
};
use crate::ingest::{normalize, NormalizeError, NormalizeOptions, RecordError};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Canonical, deduplicated trades of one analysis run plus what was lost
/// getting there.
///
/// Read-only once built; filtered views and summaries are computed into new
/// values.
#[derive(Debug, Clone)]
pub struct Session {
    trades: Vec<Trade>,
    ledger: Vec<LedgerEntry>,
    ingest_errors: Vec<RecordError>,
    complete: bool,
}

/// A summary together with the completeness of the data behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub input_complete: bool,
    pub skipped_records: usize,
    pub summary: Summary,
}

impl Session {
    /// Build from already-canonical trades.
    pub fn from_trades(trades: Vec<Trade>) -> Self {
        let trades = deduplicate(&trades);
        let ledger = build_ledger(&trades);
        Session {
            trades,
            ledger,
            ingest_errors: Vec::new(),
            complete: true,
        }
    }

    /// Normalize raw records and deduplicate the result.
    pub fn from_records(records: &[Value], options: NormalizeOptions) -> Result<Self, NormalizeError> {
        let normalized = normalize(records, options)?;
        for error in &normalized.errors {
            warn!("Skipped {}", error);
        }

        let mut session = Self::from_trades(normalized.trades);
        session.ingest_errors = normalized.errors;
        info!(
            "Session holds {} trades ({} records skipped)",
            session.trades.len(),
            session.ingest_errors.len()
        );
        Ok(session)
    }

    /// Build from a paged API fetch, carrying over its completeness.
    pub fn from_fetch(fetch: &FetchOutcome, options: NormalizeOptions) -> Result<Self, NormalizeError> {
        let mut session = Self::from_records(&fetch.records, options)?;
        session.complete = fetch.complete;
        Ok(session)
    }

    /// Merge an overlapping load into this session.
    pub fn extend(&mut self, other: Session) {
        let mut merged = std::mem::take(&mut self.trades);
        merged.extend(other.trades);
        self.trades = deduplicate(&merged);
        self.ledger = build_ledger(&self.trades);
        self.ingest_errors.extend(other.ingest_errors);
        self.complete &= other.complete;
    }

    /// Deduplicated trades in load order, PnL as reported by the source.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn ingest_errors(&self) -> &[RecordError] {
        &self.ingest_errors
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Ledger entries in chronological order.
    pub fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }

    /// Trades in chronological order with PnL settled over the full history.
    pub fn settled_trades(&self) -> Vec<Trade> {
        self.ledger.iter().map(|e| e.trade.clone()).collect()
    }

    /// Settled trades passing `spec`.
    ///
    /// Filtering runs after settlement, so a sell keeps the PnL realized
    /// against buys that the filter excludes.
    pub fn filtered(&self, spec: &FilterSpec) -> Result<Vec<Trade>, ValidationError> {
        apply_filters(&self.settled_trades(), spec)
    }

    pub fn summary(&self, spec: &FilterSpec, scope: SummaryScope) -> Result<SummaryReport, ValidationError> {
        let trades = self.filtered(spec)?;
        Ok(SummaryReport {
            input_complete: self.complete,
            skipped_records: self.ingest_errors.len(),
            summary: summarize_settled(&trades, scope),
        })
    }

    pub fn markets(&self) -> BTreeMap<MarketKey, String> {
        unique_markets(&self.trades)
    }

    pub fn match_market(&self, query: &str, threshold: f64) -> Option<MarketKey> {
        resolve_market(query, &self.trades, threshold)
    }

    pub fn outcome(&self, market: &MarketKey, threshold: Decimal) -> Option<InferredOutcome<'_>> {
        infer_outcome(&self.trades, market, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutcomeSide;
    use crate::engine::Ratio;
    use crate::ingest::{IngestMode, RecordSource};
    use serde_json::json;

    fn records() -> Vec<Value> {
        vec![
            json!({"market": "Will BTC hit 100k?", "market_slug": "btc-100k", "timestamp": 1_700_000_000,
                   "price": 0.40, "shares": 100, "cost": 40, "type": "Buy", "side": "YES"}),
            json!({"market": "Will BTC hit 100k?", "market_slug": "btc-100k", "timestamp": 1_700_086_400,
                   "price": 0.60, "shares": 100, "cost": 60, "type": "Sell", "side": "YES"}),
            json!({"market": "Broken", "timestamp": "not a date", "price": 1, "shares": 1, "cost": 1,
                   "type": "Buy", "side": "YES"}),
        ]
    }

    fn options() -> NormalizeOptions {
        NormalizeOptions::new(IngestMode::Lenient, RecordSource::File)
    }

    #[test]
    fn test_from_records_keeps_errors() {
        let session = Session::from_records(&records(), options()).unwrap();
        assert_eq!(session.trades().len(), 2);
        assert_eq!(session.ingest_errors().len(), 1);
        assert_eq!(session.ingest_errors()[0].index, 2);
        assert!(session.is_complete());
    }

    #[test]
    fn test_summary_report() {
        let session = Session::from_records(&records(), options()).unwrap();
        let report = session.summary(&FilterSpec::default(), SummaryScope::Global).unwrap();
        assert!(report.input_complete);
        assert_eq!(report.skipped_records, 1);
        let metrics = &report.summary.as_global().unwrap().metrics;
        assert_eq!(metrics.total_pnl, Decimal::from(20));
        assert_eq!(metrics.roi, Ratio::Value(Decimal::from(50)));
    }

    #[test]
    fn test_filtered_sell_keeps_full_history_pnl() {
        let session = Session::from_records(&records(), options()).unwrap();
        let spec = FilterSpec {
            types: Some([crate::domain::TradeType::Sell].into_iter().collect()),
            ..FilterSpec::default()
        };
        let sells = session.filtered(&spec).unwrap();
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].pnl, Decimal::from(20));
        // The canonical list is untouched.
        assert_eq!(session.trades()[1].pnl, Decimal::zero());
    }

    #[test]
    fn test_extend_deduplicates_overlap() {
        let mut session = Session::from_records(&records()[..2], options()).unwrap();
        let overlap = Session::from_records(&records()[1..], options()).unwrap();
        session.extend(overlap);
        assert_eq!(session.trades().len(), 2);
        assert_eq!(session.ingest_errors().len(), 1);
        assert_eq!(session.ledger().len(), 2);
    }

    #[test]
    fn test_incomplete_fetch_propagates() {
        let fetch = FetchOutcome {
            records: records()[..1].to_vec(),
            pages_fetched: 1,
            complete: false,
        };
        let mut session = Session::from_records(&records()[1..2], options()).unwrap();
        session.extend(Session::from_fetch(&fetch, options()).unwrap());
        assert!(!session.is_complete());
        let report = session.summary(&FilterSpec::default(), SummaryScope::Global).unwrap();
        assert!(!report.input_complete);
    }

    #[test]
    fn test_match_and_outcome() {
        let session = Session::from_records(&records(), options()).unwrap();
        let key = session.match_market("btc hit 100k", 0.6).unwrap();
        assert_eq!(key, MarketKey::from_slug("btc-100k"));

        let outcome = session
            .outcome(&key, crate::engine::default_resolution_threshold())
            .unwrap();
        assert_eq!(outcome.side, OutcomeSide::Yes);
        assert_eq!(session.markets().len(), 1);
    }
}
