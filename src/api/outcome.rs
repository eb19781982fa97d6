use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::trades::TradeDto;
use super::AppState;
use crate::domain::MarketKey;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct OutcomeQuery {
    pub market: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeResponse {
    pub market_key: String,
    pub market: String,
    pub inferred_side: String,
    /// Always true: the side is read off the latest trade, not settlement data.
    pub heuristic: bool,
    pub evidence: TradeDto,
}

/// `market` is a market key or slug; anything else goes through fuzzy matching.
pub async fn get_outcome(
    Query(params): Query<OutcomeQuery>,
    State(state): State<AppState>,
) -> Result<Json<OutcomeResponse>, AppError> {
    let session = &state.session;
    let markets = session.markets();

    let exact = MarketKey::parse(&params.market);
    let key = if markets.contains_key(&exact) {
        exact
    } else {
        session
            .match_market(&params.market, state.config.match_threshold)
            .ok_or_else(|| AppError::NotFound(format!("No market matches {:?}", params.market)))?
    };

    let outcome = session
        .outcome(&key, state.config.resolution_threshold)
        .ok_or_else(|| AppError::NotFound(format!("No trades for market {}", key)))?;

    Ok(Json(OutcomeResponse {
        market: markets.get(&key).cloned().unwrap_or_default(),
        market_key: key.to_string(),
        inferred_side: outcome.side.to_string(),
        heuristic: true,
        evidence: TradeDto::from(outcome.evidence),
    }))
}
