pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod session;

pub use config::Config;
pub use datasource::{fetch_all, DataSourceError, FetchOutcome, LimitlessDataSource, MockDataSource, TradeSource};
pub use domain::{Decimal, MarketKey, OutcomeSide, Trade, TradeType};
pub use engine::{
    apply_filters, compute_summary, deduplicate, group_by_market, infer_outcome, match_market,
    FilterSpec, Ratio, Summary, SummaryScope, ValidationError,
};
pub use error::AppError;
pub use ingest::{normalize, IngestError, IngestMode, NormalizeOptions, RecordSource};
pub use session::Session;
