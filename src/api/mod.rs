pub mod health;
pub mod markets;
pub mod outcome;
pub mod summary;
pub mod trades;

use crate::config::Config;
use crate::session::Session;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub config: Config,
}

impl AppState {
    pub fn new(session: Arc<Session>, config: Config) -> Self {
        Self { session, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/trades", get(trades::get_trades))
        .route("/v1/summary", get(summary::get_summary))
        .route("/v1/markets", get(markets::get_markets))
        .route("/v1/markets/match", get(markets::match_market))
        .route("/v1/outcome", get(outcome::get_outcome))
        .layer(cors)
        .with_state(state)
}
