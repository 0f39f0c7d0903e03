use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use crate::error::{AppError, Result};

/// Text-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    Groq,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Gemini, Provider::Groq];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Groq => "groq",
        }
    }

    pub fn models(&self) -> &'static [ModelInfo] {
        match self {
            Provider::Gemini => GEMINI_MODELS,
            Provider::Groq => GROQ_MODELS,
        }
    }

    pub fn main_model(&self) -> &'static str {
        self.models()
            .iter()
            .find(|m| m.is_main)
            .map(|m| m.id)
            .unwrap_or(self.models()[0].id)
    }

    pub fn supports_model(&self, model: &str) -> bool {
        self.models().iter().any(|m| m.id == model)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gemini" => Ok(Provider::Gemini),
            "groq" => Ok(Provider::Groq),
            _ => Err(AppError::validation(
                "Invalid provider",
                "Invalid provider. Must be \"gemini\" or \"groq\"",
            )),
        }
    }
}

/// Strategy used to turn queries into products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSource {
    MultiStore,
    GoogleShopping,
    Mock,
    EbayScraping,
}

impl ProductSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductSource::MultiStore => "multi-store",
            ProductSource::GoogleShopping => "google-shopping",
            ProductSource::Mock => "mock",
            ProductSource::EbayScraping => "ebay-scraping",
        }
    }

    /// Sources an operator may pick through the settings endpoint. The
    /// legacy `mock` and `ebay-scraping` modes are environment-only.
    pub fn is_selectable(&self) -> bool {
        matches!(self, ProductSource::MultiStore | ProductSource::GoogleShopping)
    }
}

impl fmt::Display for ProductSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "multi-store" => Ok(ProductSource::MultiStore),
            "google-shopping" => Ok(ProductSource::GoogleShopping),
            "mock" => Ok(ProductSource::Mock),
            "ebay-scraping" => Ok(ProductSource::EbayScraping),
            _ => Err(invalid_source()),
        }
    }
}

fn invalid_source() -> AppError {
    AppError::validation(
        "Invalid product source",
        "Invalid product source. Must be \"multi-store\" or \"google-shopping\"",
    )
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub is_main: bool,
}

static GEMINI_MODELS: &[ModelInfo] = &[
    ModelInfo { id: "gemini-2.5-flash-lite", name: "Gemini 2.5 Flash Lite (Main)", is_main: true },
    ModelInfo { id: "gemini-2.0-flash", name: "Gemini 2.0 Flash", is_main: false },
    ModelInfo { id: "gemini-2.0-flash-lite", name: "Gemini 2.0 Flash Lite", is_main: false },
];

static GROQ_MODELS: &[ModelInfo] = &[
    ModelInfo { id: "llama-3.3-70b-versatile", name: "Llama 3.3 70B Versatile (Main)", is_main: true },
    ModelInfo { id: "meta-llama/llama-4-scout-17b-16e-instruct", name: "Llama 4 Scout 17B", is_main: false },
    ModelInfo { id: "openai/gpt-oss-120b", name: "GPT OSS 120B", is_main: false },
];

/// Catalog keyed by provider, as served by `GET /api/config`.
#[derive(Debug, Serialize)]
pub struct ModelCatalog {
    pub gemini: &'static [ModelInfo],
    pub groq: &'static [ModelInfo],
}

pub fn model_catalog() -> ModelCatalog {
    ModelCatalog {
        gemini: Provider::Gemini.models(),
        groq: Provider::Groq.models(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub product_source: ProductSource,
}

impl Settings {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// First 8 characters of the key followed by an ellipsis.
    pub fn api_key_preview(&self) -> String {
        if self.api_key.is_empty() {
            return String::new();
        }
        let head: String = self.api_key.chars().take(8).collect();
        format!("{}...", head)
    }
}

/// Partial update. Fields left as `None` keep their current value.
#[derive(Debug, Default, Clone)]
pub struct SettingsUpdate {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub product_source: Option<String>,
}

pub struct SettingsStore {
    inner: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(initial: Settings) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub fn get(&self) -> Settings {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Validates every supplied field first and only then applies them, so a
    /// rejected update leaves the stored settings untouched.
    pub fn update(&self, update: SettingsUpdate) -> Result<Settings> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| AppError::Internal("settings lock poisoned by an earlier writer".to_string()))?;

        let provider = match update.provider.as_deref() {
            Some(p) if !p.is_empty() => p.parse::<Provider>()?,
            _ => guard.provider,
        };

        let model = match update.model.as_deref() {
            Some(m) if !m.is_empty() => {
                if !provider.supports_model(m) {
                    let valid: Vec<&str> = provider.models().iter().map(|m| m.id).collect();
                    return Err(AppError::validation(
                        "Invalid model",
                        format!(
                            "Invalid model for {}. Must be one of: {}",
                            provider,
                            valid.join(", ")
                        ),
                    ));
                }
                Some(m.to_string())
            }
            _ => None,
        };

        let product_source = match update.product_source.as_deref() {
            Some(s) if !s.is_empty() => {
                let source = s.parse::<ProductSource>()?;
                if !source.is_selectable() {
                    return Err(invalid_source());
                }
                Some(source)
            }
            _ => None,
        };

        guard.provider = provider;
        if let Some(api_key) = update.api_key {
            guard.api_key = api_key;
        }
        if let Some(model) = model {
            guard.model = model;
        } else if !provider.supports_model(&guard.model) {
            guard.model = provider.main_model().to_string();
        }
        if let Some(source) = product_source {
            guard.product_source = source;
        }

        Ok(guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SettingsStore {
        SettingsStore::new(Settings {
            provider: Provider::Gemini,
            api_key: "AIzaSyExampleKey".to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            product_source: ProductSource::MultiStore,
        })
    }

    #[test]
    fn get_returns_a_copy() {
        let store = store();
        let mut copy = store.get();
        copy.api_key.clear();
        assert!(store.get().is_configured());
    }

    #[test]
    fn switches_provider_and_model() {
        let store = store();
        let updated = store
            .update(SettingsUpdate {
                provider: Some("groq".into()),
                api_key: Some("gsk_123456789".into()),
                model: Some("openai/gpt-oss-120b".into()),
                product_source: Some("google-shopping".into()),
            })
            .unwrap();
        assert_eq!(updated.provider, Provider::Groq);
        assert_eq!(updated.model, "openai/gpt-oss-120b");
        assert_eq!(updated.product_source, ProductSource::GoogleShopping);
        assert_eq!(store.get(), updated);
    }

    #[test]
    fn provider_switch_without_model_picks_main_model() {
        let store = store();
        let updated = store
            .update(SettingsUpdate {
                provider: Some("groq".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn rejected_updates_leave_settings_unchanged() {
        let store = store();
        let before = store.get();

        let bad_provider = SettingsUpdate {
            provider: Some("openai".into()),
            api_key: Some("new-key".into()),
            ..Default::default()
        };
        let bad_model = SettingsUpdate {
            provider: Some("groq".into()),
            model: Some("gemini-2.0-flash".into()),
            ..Default::default()
        };
        let bad_source = SettingsUpdate {
            provider: Some("groq".into()),
            product_source: Some("ebay-scraping".into()),
            ..Default::default()
        };

        for update in [bad_provider, bad_model, bad_source] {
            let err = store.update(update).unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
            assert_eq!(store.get(), before);
        }
    }

    #[test]
    fn poisoned_store_refuses_updates() {
        let store = std::sync::Arc::new(store());
        let writer = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = writer.inner.write().unwrap();
            panic!("writer died mid-update");
        })
        .join();

        let err = store
            .update(SettingsUpdate {
                provider: Some("groq".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(store.get().provider, Provider::Gemini);
    }

    #[test]
    fn api_key_preview_truncates() {
        let settings = store().get();
        assert_eq!(settings.api_key_preview(), "AIzaSyEx...");

        let empty = Settings { api_key: String::new(), ..settings };
        assert_eq!(empty.api_key_preview(), "");
        assert!(!empty.is_configured());
    }

    #[test]
    fn catalog_has_one_main_model_per_provider() {
        for provider in Provider::ALL {
            assert_eq!(provider.models().iter().filter(|m| m.is_main).count(), 1);
            assert!(provider.supports_model(provider.main_model()));
        }
    }
}
