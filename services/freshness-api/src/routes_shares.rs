use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use freshness::{verify, BatchResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::share_store::ShareRecord;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    pub results: Option<serde_json::Value>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCreatedResponse {
    pub share_id: String,
    pub share_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    pub id: Option<String>,
}

pub async fn create_share(
    State(state): State<SharedState>,
    payload: Result<Json<CreateShareRequest>, JsonRejection>,
) -> Result<Json<ShareCreatedResponse>, ApiError> {
    let Json(req) = payload?;
    let raw = req
        .results
        .ok_or_else(|| ApiError::BadRequest("Results data is required".to_string()))?;
    let results: BatchResult = serde_json::from_value(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid results data: {e}")))?;

    if let Err(e) = verify(&results) {
        warn!(error=%e, "share rejected: inconsistent results");
        return Err(ApiError::BadRequest(format!("Invalid results: {e}")));
    }

    let image = req.image.filter(|s| !s.trim().is_empty());
    let (share_id, expires_at) = state.shares.create(results, image).await;
    info!(share_id=%share_id, expires_at=%expires_at, "share created");

    Ok(Json(ShareCreatedResponse {
        share_url: state.share_url(&share_id),
        share_id,
        expires_at,
    }))
}

pub async fn get_share(
    State(state): State<SharedState>,
    Query(q): Query<ShareQuery>,
) -> Result<Json<ShareRecord>, ApiError> {
    let id = match q.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => return Err(ApiError::BadRequest("Share ID is required".to_string())),
    };

    let record = state.shares.get(id).await?;
    Ok(Json(record))
}
