use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::engine::ValidationError;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDto {
    pub market_key: String,
    pub market: String,
    pub trade_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketsResponse {
    pub markets: Vec<MarketDto>,
}

pub async fn get_markets(State(state): State<AppState>) -> Json<MarketsResponse> {
    let trades = state.session.trades();
    let markets = state
        .session
        .markets()
        .into_iter()
        .map(|(key, market)| MarketDto {
            trade_count: trades.iter().filter(|t| t.market_key() == key).count(),
            market_key: key.to_string(),
            market,
        })
        .collect();

    Json(MarketsResponse { markets })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuery {
    pub q: String,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub query: String,
    pub market_key: String,
    pub market: String,
}

/// Resolve a free-text market name; 404 when nothing clears the threshold.
pub async fn match_market(
    Query(params): Query<MatchQuery>,
    State(state): State<AppState>,
) -> Result<Json<MatchResponse>, AppError> {
    let threshold = params.threshold.unwrap_or(state.config.match_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ValidationError::ThresholdOutOfRange(threshold.to_string()).into());
    }

    let key = state
        .session
        .match_market(&params.q, threshold)
        .ok_or_else(|| AppError::NotFound(format!("No market matches {:?}", params.q)))?;
    let market = state.session.markets().remove(&key).unwrap_or_default();

    Ok(Json(MatchResponse {
        query: params.q,
        market_key: key.to_string(),
        market,
    }))
}
