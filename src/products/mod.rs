pub mod ebay;
pub mod google_shopping;
pub mod mock;
pub mod multi_store;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::config::Config;
use crate::images::ImageResolver;
use crate::queries::GiftQuery;
use crate::settings::ProductSource;

pub use ebay::EbayScraper;
pub use google_shopping::GoogleShoppingResolver;
pub use mock::MockCatalog;
pub use multi_store::MultiStoreResolver;

/// Tag identifying which strategy produced a gift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GiftSource {
    MultiStore,
    GoogleShopping,
    GoogleShoppingFallback,
    Mock,
    EbayScraping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformLinks {
    pub amazon: String,
    pub ebay: String,
    pub etsy: String,
    pub walmart: String,
    pub target: String,
}

/// One shoppable card returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gift {
    pub title: String,
    pub price: String,
    pub image: String,
    pub link: String,
    pub reason: String,
    pub search_query: String,
    pub source: GiftSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_links: Option<PlatformLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Gift {
    /// A card with only the fields every strategy fills in.
    pub fn basic(
        query: &GiftQuery,
        source: GiftSource,
        title: String,
        price: String,
        image: String,
        link: String,
    ) -> Self {
        Gift {
            title,
            price,
            image,
            link,
            reason: query.reason.clone(),
            search_query: query.query.clone(),
            source,
            category: None,
            platform_links: None,
            snippet: None,
            error: None,
        }
    }
}

/// Upper-cases the first character of every space-separated word.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns one query into one product. Implementations absorb their own
/// failures and return a placeholder card instead.
#[async_trait]
pub trait ProductResolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, query: &GiftQuery) -> Gift;

    /// Pause inserted between two consecutive lookups.
    fn pause(&self) -> Option<Duration> {
        None
    }
}

/// Resolves queries one after another, preserving order.
pub async fn resolve_all(resolver: &dyn ProductResolver, queries: &[GiftQuery]) -> Vec<Gift> {
    tracing::info!("Finding products for {} queries via {}", queries.len(), resolver.name());

    let mut gifts = Vec::with_capacity(queries.len());
    for (i, query) in queries.iter().enumerate() {
        tracing::info!("[{}/{}] {}", i + 1, queries.len(), query.query);
        gifts.push(resolver.resolve(query).await);

        if i + 1 < queries.len() {
            if let Some(pause) = resolver.pause() {
                tracing::debug!("Waiting {:?} before next lookup", pause);
                tokio::time::sleep(pause).await;
            }
        }
    }
    gifts
}

/// One instance of every strategy, built once at startup.
pub struct ResolverSet {
    pub multi_store: MultiStoreResolver,
    pub google_shopping: Option<GoogleShoppingResolver>,
    pub ebay: EbayScraper,
    pub mock: MockCatalog,
}

impl ResolverSet {
    pub fn from_config(config: &Config, client: Client) -> Self {
        let images = ImageResolver::new(client.clone(), config.unsplash_access_key.clone());

        let google_shopping = match (&config.google_search_api_key, &config.google_search_engine_id) {
            (Some(key), Some(cx)) => Some(
                GoogleShoppingResolver::new(client, key.clone(), cx.clone())
                    .with_delay(config.google_delay),
            ),
            _ => None,
        };

        ResolverSet {
            multi_store: MultiStoreResolver::new(Some(images)),
            google_shopping,
            ebay: EbayScraper::new().with_delay(config.scrape_delay.0, config.scrape_delay.1),
            mock: MockCatalog,
        }
    }

    pub fn google_shopping_configured(&self) -> bool {
        self.google_shopping.is_some()
    }

    /// Picks the strategy for a source. Google Shopping without credentials
    /// falls back to multi-store.
    pub fn for_source(&self, source: ProductSource) -> &dyn ProductResolver {
        match source {
            ProductSource::MultiStore => &self.multi_store,
            ProductSource::GoogleShopping => match &self.google_shopping {
                Some(resolver) => resolver,
                None => {
                    tracing::warn!("Google Shopping not configured, falling back to multi-store");
                    &self.multi_store
                }
            },
            ProductSource::Mock => &self.mock,
            ProductSource::EbayScraping => {
                tracing::warn!("Using legacy eBay scraping (may fail)");
                &self.ebay
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProductResolver for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn resolve(&self, query: &GiftQuery) -> Gift {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Gift::basic(
                query,
                GiftSource::Mock,
                format!("#{} {}", n, query.query),
                "$1".to_string(),
                String::new(),
                "#".to_string(),
            )
        }

        fn pause(&self) -> Option<Duration> {
            Some(Duration::from_millis(1))
        }
    }

    #[tokio::test]
    async fn resolve_all_preserves_order_and_reasons() {
        let resolver = Counting { calls: AtomicUsize::new(0) };
        let queries: Vec<GiftQuery> = (0..4)
            .map(|i| GiftQuery::new(format!("q{}", i), format!("r{}", i)))
            .collect();

        let gifts = resolve_all(&resolver, &queries).await;
        assert_eq!(gifts.len(), 4);
        for (i, gift) in gifts.iter().enumerate() {
            assert_eq!(gift.title, format!("#{} q{}", i, i));
            assert_eq!(gift.reason, format!("r{}", i));
            assert_eq!(gift.search_query, format!("q{}", i));
        }
    }

    #[test]
    fn title_case_keeps_spacing() {
        assert_eq!(title_case("fly fishing  reel"), "Fly Fishing  Reel");
        assert_eq!(title_case("iPhone case"), "IPhone Case");
    }

    #[test]
    fn unconfigured_google_shopping_uses_multi_store() {
        let set = ResolverSet::from_config(&Config::default(), Client::new());
        assert!(!set.google_shopping_configured());
        assert_eq!(set.for_source(ProductSource::GoogleShopping).name(), "multi-store");
        assert_eq!(set.for_source(ProductSource::Mock).name(), "mock");
        assert_eq!(set.for_source(ProductSource::EbayScraping).name(), "ebay-scraping");
    }

    #[test]
    fn gift_serializes_camel_case_without_empty_optionals() {
        let query = GiftQuery::new("fly fishing reel", "He fishes every weekend.");
        let gift = Gift::basic(
            &query,
            GiftSource::GoogleShoppingFallback,
            "Fly Fishing Reel".to_string(),
            "Price varies".to_string(),
            String::new(),
            "#".to_string(),
        );
        let json = serde_json::to_value(&gift).unwrap();
        assert_eq!(json["searchQuery"], "fly fishing reel");
        assert_eq!(json["source"], "google-shopping-fallback");
        assert!(json.get("platformLinks").is_none());
        assert!(json.get("error").is_none());
    }
}
