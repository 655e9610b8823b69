use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use freshness::BatchResult;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub image: Option<String>,
    pub language: Option<String>,
}

fn require_image(req: &AnalyzeRequest) -> Result<&str, ApiError> {
    match req.image.as_deref().map(str::trim) {
        Some(img) if !img.is_empty() => Ok(img),
        _ => Err(ApiError::BadRequest("Image data is required".to_string())),
    }
}

pub async fn analyze(
    State(state): State<SharedState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(req) = payload?;
    let image = require_image(&req)?;
    let batch = state.analyzer.analyze(image).await?;

    let batch = match req.language.as_deref().map(str::trim) {
        None | Some("") => batch,
        Some(lang) => match state.translator.translate(&batch, lang) {
            Ok(translated) => translated,
            Err(e) => {
                warn!(language=%lang, error=%e, "translation skipped");
                batch
            }
        },
    };

    info!(analysis_id=%batch.analysis_id, items=batch.item_count, "analyze: done");
    Ok(Json(batch))
}

pub async fn analyze_local(
    State(state): State<SharedState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(req) = payload?;
    let image = require_image(&req)?;
    let batch = state.analyzer.analyze_local(image).await?;
    Ok(Json(batch))
}
