use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};
use crate::settings::{ProductSource, Provider, Settings};

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub product_source: ProductSource,
    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub unsplash_access_key: Option<String>,
    /// Pause between consecutive Google Custom Search calls.
    pub google_delay: Duration,
    /// Bounds of the randomized pause between eBay page fetches.
    pub scrape_delay: (Duration, Duration),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            provider: Provider::Gemini,
            api_key: String::new(),
            model: Provider::Gemini.main_model().to_string(),
            product_source: ProductSource::MultiStore,
            google_search_api_key: None,
            google_search_engine_id: None,
            unsplash_access_key: None,
            google_delay: Duration::from_millis(500),
            scrape_delay: (Duration::from_secs(2), Duration::from_secs(4)),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let defaults = Config::default();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        let server_addr = SocketAddr::new(ip, port);

        let provider = match non_empty("AI_PROVIDER") {
            Some(p) => p
                .parse::<Provider>()
                .map_err(|_| AppError::ConfigError(format!("Invalid AI_PROVIDER: {}", p)))?,
            None => defaults.provider,
        };

        let api_key = match provider {
            Provider::Gemini => non_empty("GEMINI_API_KEY"),
            Provider::Groq => non_empty("GROQ_API_KEY"),
        }
        .unwrap_or_default();

        let model = match non_empty("AI_MODEL") {
            Some(m) if provider.supports_model(&m) => m,
            Some(m) => {
                return Err(AppError::ConfigError(format!(
                    "Model {} is not available for provider {}",
                    m, provider
                )));
            }
            None => provider.main_model().to_string(),
        };

        let product_source = match non_empty("PRODUCT_SOURCE") {
            Some(s) => s
                .parse::<ProductSource>()
                .map_err(|_| AppError::ConfigError(format!("Invalid PRODUCT_SOURCE: {}", s)))?,
            None => defaults.product_source,
        };

        Ok(Config {
            server_addr,
            provider,
            api_key,
            model,
            product_source,
            google_search_api_key: non_empty("GOOGLE_SEARCH_API_KEY"),
            google_search_engine_id: non_empty("GOOGLE_SEARCH_ENGINE_ID"),
            unsplash_access_key: non_empty("UNSPLASH_ACCESS_KEY"),
            ..defaults
        })
    }

    /// Runtime settings the service starts with.
    pub fn initial_settings(&self) -> Settings {
        Settings {
            provider: self.provider,
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            product_source: self.product_source,
        }
    }

    pub fn google_shopping_configured(&self) -> bool {
        self.google_search_api_key.is_some() && self.google_search_engine_id.is_some()
    }

    pub fn unsplash_configured(&self) -> bool {
        self.unsplash_access_key.is_some()
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
