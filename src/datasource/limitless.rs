//! Limitless exchange portfolio-history client.

use super::{DataSourceError, HistoryPage, TradeSource};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.limitless.exchange";
const SESSION_COOKIE_NAME: &str = "limitless_session";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Authenticated reader of `GET /portfolio/history`.
#[derive(Clone)]
pub struct LimitlessDataSource {
    client: Client,
    base_url: String,
    session_cookie: String,
    max_elapsed: Duration,
}

impl std::fmt::Debug for LimitlessDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitlessDataSource")
            .field("base_url", &self.base_url)
            .field("session_cookie", &"<redacted>")
            .finish()
    }
}

impl LimitlessDataSource {
    pub fn new(base_url: String, session_cookie: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_cookie,
            max_elapsed: Duration::from_secs(30),
        }
    }

    pub fn default_url(session_cookie: String) -> Self {
        Self::new(DEFAULT_BASE_URL.to_string(), session_cookie)
    }

    /// Upper bound on time spent retrying one page.
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    async fn get_history(&self, page: u32, limit: u32) -> Result<Value, DataSourceError> {
        let url = format!("{}/portfolio/history", self.base_url);
        let cookie = format!("{}={}", SESSION_COOKIE_NAME, self.session_cookie);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&[("page", page), ("limit", limit)])
                .header(COOKIE, cookie.as_str())
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("Client error")
                        .to_string(),
                }));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl TradeSource for LimitlessDataSource {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<HistoryPage, DataSourceError> {
        debug!("Fetching portfolio history page={}, limit={}", page, limit);
        let body = self.get_history(page, limit).await?;
        parse_page(body)
    }
}

/// Accept `{"data": [...], "totalCount": n}` or a bare array of records.
fn parse_page(body: Value) -> Result<HistoryPage, DataSourceError> {
    match body {
        Value::Array(records) => Ok(HistoryPage {
            records,
            total_count: None,
        }),
        Value::Object(mut object) => {
            let total_count = object
                .get("totalCount")
                .and_then(Value::as_u64)
                .map(|n| n as usize);
            let records = match object.remove("data") {
                Some(Value::Array(records)) => records,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(DataSourceError::ParseError(format!(
                        "Expected data array, got {}",
                        other
                    )))
                }
            };
            Ok(HistoryPage {
                records,
                total_count,
            })
        }
        other => Err(DataSourceError::ParseError(format!(
            "Expected page object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_page_object() {
        let page = parse_page(json!({
            "data": [{"collateralAmount": "2500000"}],
            "totalCount": 7
        }))
        .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total_count, Some(7));
    }

    #[test]
    fn test_parse_page_without_data_is_empty() {
        let page = parse_page(json!({"totalCount": 0})).unwrap();
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_parse_page_bare_array() {
        let page = parse_page(json!([{}, {}])).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total_count, None);
    }

    #[test]
    fn test_parse_page_rejects_scalar() {
        assert!(matches!(
            parse_page(json!("nope")),
            Err(DataSourceError::ParseError(_))
        ));
        assert!(matches!(
            parse_page(json!({"data": 3})),
            Err(DataSourceError::ParseError(_))
        ));
    }

    #[test]
    fn test_debug_redacts_cookie() {
        let source = LimitlessDataSource::default_url("secret-token".to_string());
        let rendered = format!("{:?}", source);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains(DEFAULT_BASE_URL));
    }
}
