use std::sync::Arc;

use freshness::{GlossaryTranslator, Translator};

use crate::analyzer::Analyzer;
use crate::config::AppConfig;
use crate::provider::VisionProvider;
use crate::share_store::ShareStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub analyzer: Analyzer,
    pub shares: Arc<ShareStore>,
    pub translator: Arc<dyn Translator>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Arc<dyn VisionProvider>) -> Self {
        Self {
            analyzer: Analyzer::new(provider),
            shares: Arc::new(ShareStore::new(config.share_ttl)),
            translator: Arc::new(GlossaryTranslator::new()),
            config,
        }
    }

    pub fn share_url(&self, share_id: &str) -> String {
        format!("{}/shared/{}", self.config.public_base_url.trim_end_matches('/'), share_id)
    }
}
