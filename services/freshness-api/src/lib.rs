//! HTTP surface of the produce freshness pipeline: remote vision inference
//! with heuristic fallback, plus short-lived share links for results.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod provider;
pub mod provider_openai;
pub mod routes_analyze;
pub mod routes_runtime;
pub mod routes_shares;
pub mod share_store;
pub mod state;
pub mod sweeper;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub use analyzer::{AnalyzeError, Analyzer};
pub use config::AppConfig;
pub use provider::{InferenceError, ProviderInfo, VisionProvider};
pub use share_store::{ShareError, ShareRecord, ShareStore};
pub use state::{AppState, SharedState};

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(routes_runtime::health))
        .route("/runtime", get(routes_runtime::get_runtime))
        .route("/analyze", post(routes_analyze::analyze))
        .route("/analyze/local", post(routes_analyze::analyze_local))
        .route(
            "/shares",
            post(routes_shares::create_share).get(routes_shares::get_share),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
