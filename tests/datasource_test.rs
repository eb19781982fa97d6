use predledger::datasource::{fetch_all, DataSourceError, MockDataSource};
use predledger::ingest::{IngestMode, NormalizeOptions, RecordSource};
use predledger::engine::FilterSpec;
use predledger::{Decimal, OutcomeSide, Session, SummaryScope, TradeType};
use serde_json::{json, Value};

fn api_record(i: i64, strategy: &str, outcome_index: i64, price: f64, collateral: i64) -> Value {
    json!({
        "market": {"title": "Will ETH flip BTC?", "slug": "eth-flip"},
        "blockTimestamp": 1_700_000_000 + i * 3600,
        "price": price,
        "outcomeTokenAmount": 4_000_000,
        "collateralAmount": collateral,
        "strategy": strategy,
        "outcomeIndex": outcome_index,
        "transactionHash": format!("0x{:04x}", i)
    })
}

fn history() -> Vec<Value> {
    vec![
        api_record(0, "Buy", 0, 0.5, 2_000_000),
        api_record(1, "Sell", 0, 0.75, 3_000_000),
        api_record(2, "Buy", 1, 0.25, 1_000_000),
        api_record(3, "Buy", 1, 0.375, 1_500_000),
        api_record(4, "Sell", 1, 0.125, 500_000),
    ]
}

fn api_options() -> NormalizeOptions {
    NormalizeOptions::new(IngestMode::Strict, RecordSource::Api)
}

#[tokio::test]
async fn test_full_history_flows_into_session() {
    let source = MockDataSource::new()
        .with_records(history(), 2)
        .with_total_count(5);

    let fetch = fetch_all(&source, 10, 2).await.unwrap();
    assert!(fetch.complete);
    assert_eq!(fetch.pages_fetched, 3);

    let session = Session::from_fetch(&fetch, api_options()).unwrap();
    assert!(session.is_complete());
    assert_eq!(session.trades().len(), 5);

    let first = &session.trades()[0];
    assert_eq!(first.cost, Decimal::from(2));
    assert_eq!(first.shares, Decimal::from(4));
    assert_eq!(first.trade_type, TradeType::Buy);
    assert_eq!(session.trades()[2].side, OutcomeSide::No);

    // YES: bought 4 for 2, sold 4 for 3.
    let settled = session.settled_trades();
    assert_eq!(settled[1].pnl, Decimal::from(1));

    let report = session
        .summary(&FilterSpec::default(), SummaryScope::Global)
        .unwrap();
    assert!(report.input_complete);
    assert_eq!(report.skipped_records, 0);
}

#[tokio::test]
async fn test_page_cap_marks_session_incomplete() {
    let source = MockDataSource::new().with_records(history(), 2);

    let fetch = fetch_all(&source, 2, 2).await.unwrap();
    assert!(!fetch.complete);
    assert_eq!(fetch.records.len(), 4);

    let session = Session::from_fetch(&fetch, api_options()).unwrap();
    assert!(!session.is_complete());

    let report = session
        .summary(&FilterSpec::default(), SummaryScope::Global)
        .unwrap();
    assert!(!report.input_complete);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["inputComplete"], false);
}

#[tokio::test]
async fn test_later_page_failure_keeps_partial_history() {
    let source = MockDataSource::new()
        .with_records(history(), 2)
        .failing_at(2, DataSourceError::RateLimited);

    let fetch = fetch_all(&source, 10, 2).await.unwrap();
    assert!(!fetch.complete);
    assert_eq!(fetch.records.len(), 2);

    let session = Session::from_fetch(&fetch, api_options()).unwrap();
    assert_eq!(session.trades().len(), 2);
    assert!(!session.is_complete());
}

#[tokio::test]
async fn test_first_page_failure_is_an_error() {
    let source = MockDataSource::new()
        .with_records(history(), 2)
        .failing_at(
            1,
            DataSourceError::HttpError {
                status: 401,
                message: "unauthorized".to_string(),
            },
        );

    let err = fetch_all(&source, 10, 2).await.unwrap_err();
    assert!(matches!(err, DataSourceError::HttpError { status: 401, .. }));
}

#[tokio::test]
async fn test_merging_file_and_api_loads_dedups_overlap() {
    let source = MockDataSource::new().with_records(history(), 5);
    let fetch = fetch_all(&source, 10, 5).await.unwrap();
    let mut session = Session::from_fetch(&fetch, api_options()).unwrap();

    // The same first two fills exported earlier, already in display units.
    let exported = vec![
        json!({"market": "Will ETH flip BTC?", "market_slug": "eth-flip", "timestamp": 1_700_000_000,
               "price": 0.5, "shares": 4, "cost": 2, "type": "Buy", "side": "YES", "tx_hash": "0x0000"}),
        json!({"market": "Will ETH flip BTC?", "market_slug": "eth-flip", "timestamp": 1_700_003_600,
               "price": 0.75, "shares": 4, "cost": 3, "type": "Sell", "side": "YES", "tx_hash": "0x0001"}),
    ];
    let file = Session::from_records(
        &exported,
        NormalizeOptions::new(IngestMode::Strict, RecordSource::File),
    )
    .unwrap();

    session.extend(file);
    assert_eq!(session.trades().len(), 5);
    assert!(session.is_complete());
}
