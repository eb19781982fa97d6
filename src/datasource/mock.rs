//! Mock data source for testing without network calls.

use super::{DataSourceError, HistoryPage, TradeSource};
use async_trait::async_trait;
use serde_json::Value;

/// Serves canned pages in order; pages past the last one are empty.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    pages: Vec<Vec<Value>>,
    total_count: Option<usize>,
    failure: Option<(u32, DataSourceError)>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page of raw records.
    pub fn with_page(mut self, records: Vec<Value>) -> Self {
        self.pages.push(records);
        self
    }

    /// Split `records` into pages of `limit` records each.
    pub fn with_records(mut self, records: Vec<Value>, limit: usize) -> Self {
        self.pages
            .extend(records.chunks(limit.max(1)).map(|chunk| chunk.to_vec()));
        self
    }

    /// Set the `totalCount` reported with every page.
    pub fn with_total_count(mut self, total: usize) -> Self {
        self.total_count = Some(total);
        self
    }

    /// Make the given 1-based page fail with `error`.
    pub fn failing_at(mut self, page: u32, error: DataSourceError) -> Self {
        self.failure = Some((page, error));
        self
    }
}

#[async_trait]
impl TradeSource for MockDataSource {
    async fn fetch_page(&self, page: u32, _limit: u32) -> Result<HistoryPage, DataSourceError> {
        if let Some((failing, error)) = &self.failure {
            if *failing == page {
                return Err(error.clone());
            }
        }

        let records = page
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx as usize))
            .cloned()
            .unwrap_or_default();

        Ok(HistoryPage {
            records,
            total_count: self.total_count,
        })
    }
}
