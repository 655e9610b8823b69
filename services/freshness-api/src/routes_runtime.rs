use axum::{extract::State, Json};

use crate::state::SharedState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "service": "freshness-api",
    }))
}

pub async fn get_runtime(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let info = state.analyzer.provider_info();
    let shares = state.shares.len().await;

    Json(serde_json::json!({
        "provider": info,
        "shares": {
            "stored": shares,
            "ttl_secs": state.config.share_ttl.as_secs(),
            "sweep_interval_secs": state.config.share_sweep_interval.as_secs(),
        },
    }))
}
