pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod images;
pub mod llm;
pub mod placeholders;
pub mod products;
pub mod queries;
pub mod settings;

use std::sync::Arc;
use config::Config;
use llm::{CompletionClient, HttpCompletionClient};
use products::ResolverSet;
use settings::SettingsStore;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub settings: Arc<SettingsStore>,
    pub completions: Arc<dyn CompletionClient>,
    pub resolvers: Arc<ResolverSet>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let client = (*http::CLIENT).clone();
        let resolvers = ResolverSet::from_config(&config, client.clone());
        Self::with_parts(config, Arc::new(HttpCompletionClient::new(client)), resolvers)
    }

    /// Assembles state from explicit parts, e.g. a stub completion client.
    pub fn with_parts(
        config: Config,
        completions: Arc<dyn CompletionClient>,
        resolvers: ResolverSet,
    ) -> Self {
        AppState {
            settings: Arc::new(SettingsStore::new(config.initial_settings())),
            config: Arc::new(config),
            completions,
            resolvers: Arc::new(resolvers),
        }
    }
}
