//! Paged trade-history sources and the bounded fetch loop over them.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod limitless;
pub mod mock;

pub use limitless::LimitlessDataSource;
pub use mock::MockDataSource;

/// One page of raw history records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPage {
    pub records: Vec<Value>,
    /// Total records available server-side, when the source reports it.
    pub total_count: Option<usize>,
}

/// A paged source of raw trade records.
///
/// Implementations own transport, authentication and retry/backoff; pages
/// are 1-based.
#[async_trait]
pub trait TradeSource: Send + Sync + fmt::Debug {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<HistoryPage, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    #[error("Network error: {0}")]
    NetworkError(String),
    /// HTTP error (e.g., 401 expired session, 5xx server error)
    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed page)
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Rate limit exceeded and retries exhausted
    #[error("Rate limited")]
    RateLimited,
}

/// Everything a bounded fetch collected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<Value>,
    pub pages_fetched: u32,
    /// False when the loop stopped early (page cap or a failed page) and the
    /// records are only a prefix of the history.
    pub complete: bool,
}

/// Page through `source` until it runs dry, the reported total is reached,
/// or `max_pages` pages have been read.
///
/// A failure on the first page is returned as an error. A failure after some
/// pages were read ends the loop with `complete = false`.
pub async fn fetch_all<S: TradeSource + ?Sized>(
    source: &S,
    max_pages: u32,
    limit: u32,
) -> Result<FetchOutcome, DataSourceError> {
    let mut outcome = FetchOutcome::default();

    for page in 1..=max_pages {
        let fetched = match source.fetch_page(page, limit).await {
            Ok(fetched) => fetched,
            Err(e) if outcome.pages_fetched == 0 => return Err(e),
            Err(e) => {
                warn!("Fetching page {} failed, keeping {} records: {}", page, outcome.records.len(), e);
                return Ok(outcome);
            }
        };

        outcome.pages_fetched += 1;
        if fetched.records.is_empty() {
            outcome.complete = true;
            break;
        }

        let page_len = fetched.records.len();
        outcome.records.extend(fetched.records);
        debug!("Page {}: {} records ({} so far)", page, page_len, outcome.records.len());

        let reached_total = match fetched.total_count {
            Some(total) => outcome.records.len() >= total,
            None => page_len < limit as usize,
        };
        if reached_total {
            outcome.complete = true;
            break;
        }
    }

    if outcome.complete {
        info!("Fetched {} records in {} pages", outcome.records.len(), outcome.pages_fetched);
    } else {
        warn!(
            "Stopped at the {}-page cap with {} records; history is incomplete",
            max_pages,
            outcome.records.len()
        );
    }
    Ok(outcome)
}
