use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::domain::Trade;
use crate::engine::FilterParams;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<TradeDto>,
    pub input_complete: bool,
}

/// Wire form of a settled trade; decimals as canonical strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub market: String,
    pub market_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_slug: Option<String>,
    pub timestamp: String,
    pub price: String,
    pub shares: String,
    pub cost: String,
    #[serde(rename = "type")]
    pub trade_type: String,
    pub side: String,
    pub pnl: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl From<&Trade> for TradeDto {
    fn from(t: &Trade) -> Self {
        TradeDto {
            market: t.market.clone(),
            market_key: t.market_key().to_string(),
            market_slug: t.market_slug.clone(),
            timestamp: t.timestamp.to_rfc3339(),
            price: t.price.to_canonical_string(),
            shares: t.shares.to_canonical_string(),
            cost: t.cost.to_canonical_string(),
            trade_type: t.trade_type.to_string(),
            side: t.side.to_string(),
            pnl: t.pnl.to_canonical_string(),
            tx_hash: t.tx_hash.clone(),
        }
    }
}

/// Settled trades in chronological order, narrowed by the filter parameters.
pub async fn get_trades(
    Query(params): Query<FilterParams>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    let spec = params.into_spec()?;
    let trades = state.session.filtered(&spec)?;

    Ok(Json(TradesResponse {
        trades: trades.iter().map(TradeDto::from).collect(),
        input_complete: state.session.is_complete(),
    }))
}
