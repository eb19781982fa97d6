use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::engine::{FilterParams, SummaryScope};
use crate::error::AppError;
use crate::session::SummaryReport;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub scope: Option<String>,
    #[serde(flatten)]
    pub filters: FilterParams,
}

fn parse_scope(raw: Option<&str>) -> Result<SummaryScope, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("global") => Ok(SummaryScope::Global),
        Some("perMarket") | Some("per_market") => Ok(SummaryScope::PerMarket),
        Some(other) => Err(AppError::BadRequest(format!(
            "scope must be global or perMarket, got {}",
            other
        ))),
    }
}

pub async fn get_summary(
    Query(params): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<SummaryReport>, AppError> {
    let scope = parse_scope(params.scope.as_deref())?;
    let spec = params.filters.into_spec()?;
    Ok(Json(state.session.summary(&spec, scope)?))
}
