use axum::extract::State;
use axum::Json;

use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Readiness plus a glance at what the session holds.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let session = &state.session;
    Json(serde_json::json!({
        "status": "ready",
        "trades": session.trades().len(),
        "skippedRecords": session.ingest_errors().len(),
        "inputComplete": session.is_complete(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_returns_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }
}
