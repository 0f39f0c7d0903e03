use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::products::Gift;
use crate::settings::{ModelCatalog, ModelInfo, Provider, ProductSource, Settings};

#[derive(Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendData {
    pub description: String,
    pub total_results: usize,
    pub used_fallback_queries: bool,
    pub gifts: Vec<Gift>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub product_source: ProductSource,
    pub google_shopping_configured: bool,
    pub unsplash_configured: bool,
    pub legacy_mock_mode: bool,
}

/// Settings as shown to clients; the API key is reduced to a short preview.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub provider: Provider,
    pub model: String,
    pub product_source: ProductSource,
    pub api_key_configured: bool,
    pub api_key_preview: String,
}

impl From<&Settings> for ConfigView {
    fn from(settings: &Settings) -> Self {
        ConfigView {
            provider: settings.provider,
            model: settings.model.clone(),
            product_source: settings.product_source,
            api_key_configured: settings.is_configured(),
            api_key_preview: settings.api_key_preview(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub success: bool,
    pub config: ConfigView,
    pub available_models: ModelCatalog,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub product_source: Option<String>,
}

#[derive(Serialize)]
pub struct ConfigUpdateResponse {
    pub success: bool,
    pub message: String,
    pub config: ConfigView,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub success: bool,
    pub provider: Provider,
    pub models: &'static [ModelInfo],
}
