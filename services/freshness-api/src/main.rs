use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use freshness_api::provider_openai::OpenAiVisionProvider;
use freshness_api::sweeper::spawn_sweeper;
use freshness_api::{build_router, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    let provider = Arc::new(OpenAiVisionProvider::from_config(&cfg));
    if cfg.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY not set; every analysis will use the local heuristic");
    }
    info!(model=%cfg.model, timeout_secs=cfg.inference_timeout.as_secs(), "vision provider ready");

    let app_state = Arc::new(AppState::new(cfg.clone(), provider));

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(app_state.shares.clone(), cfg.share_sweep_interval, shutdown.clone());

    let app = build_router(app_state);

    let addr = &cfg.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("freshness-api listening on http://{addr}");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error=%e, "ctrl-c handler failed");
            }
            info!("shutdown requested");
            signal.cancel();
        })
        .await
        .context("server error")?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error=%e, "share sweeper task failed");
    }
    Ok(())
}
