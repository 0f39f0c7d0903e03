use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{title_case, Gift, GiftSource, ProductResolver};
use crate::error::{AppError, Result};
use crate::placeholders::FALLBACK_IMAGE;
use crate::queries::GiftQuery;

const CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const PRICE_VARIES: &str = "Price varies";

static PRICE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\$[\d,]+\.?\d*",
        r"€[\d,]+\.?\d*",
        r"£[\d,]+\.?\d*",
        r"(?i)USD?\s*[\d,]+\.?\d*",
        r"(?i)[\d,]+\.?\d*\s*dollars?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid price regex"))
    .collect()
});

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    image: Option<ItemImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemImage {
    context_link: Option<String>,
}

/// Finds the first product image result for each query through the Google
/// Custom Search API.
pub struct GoogleShoppingResolver {
    client: Client,
    api_key: String,
    engine_id: String,
    endpoint: String,
    delay: Duration,
}

impl GoogleShoppingResolver {
    pub fn new(client: Client, api_key: String, engine_id: String) -> Self {
        Self {
            client,
            api_key,
            engine_id,
            endpoint: CUSTOM_SEARCH_URL.to_string(),
            delay: Duration::from_millis(500),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn search(&self, query: &str) -> Result<Option<SearchItem>> {
        tracing::info!("Searching Google Shopping for \"{}\"", query);

        let res = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("searchType", "image"),
                ("num", "1"),
                ("safe", "active"),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(AppError::FetchError(format!("Google API returned {}", res.status())));
        }

        let data: SearchResponse = res.json().await?;
        Ok(data.items.into_iter().next())
    }
}

#[async_trait]
impl ProductResolver for GoogleShoppingResolver {
    fn name(&self) -> &'static str {
        "google-shopping"
    }

    async fn resolve(&self, query: &GiftQuery) -> Gift {
        match self.search(&query.query).await {
            Ok(Some(item)) => product_from_item(query, item),
            Ok(None) => {
                tracing::warn!("No Google results for \"{}\"", query.query);
                fallback_product(query)
            }
            Err(e) => {
                tracing::error!("Google Shopping error: {}", e);
                fallback_product(query)
            }
        }
    }

    fn pause(&self) -> Option<Duration> {
        Some(self.delay).filter(|d| !d.is_zero())
    }
}

fn google_search_url(query: &str) -> String {
    format!("https://www.google.com/search?q={}", urlencoding::encode(query))
}

fn product_from_item(query: &GiftQuery, item: SearchItem) -> Gift {
    let snippet = item.snippet.unwrap_or_default();
    let price = extract_price(&snippet).unwrap_or_else(|| PRICE_VARIES.to_string());
    let image = item.link.clone().unwrap_or_else(|| FALLBACK_IMAGE.to_string());
    let link = item
        .image
        .and_then(|i| i.context_link)
        .or(item.link)
        .unwrap_or_else(|| google_search_url(&query.query));
    let title = item
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| query.query.clone());

    let mut gift = Gift::basic(query, GiftSource::GoogleShopping, title, price, image, link);
    gift.snippet = Some(snippet);
    gift
}

fn fallback_product(query: &GiftQuery) -> Gift {
    Gift::basic(
        query,
        GiftSource::GoogleShoppingFallback,
        title_case(&query.query),
        PRICE_VARIES.to_string(),
        FALLBACK_IMAGE.to_string(),
        format!(
            "https://www.google.com/search?tbm=shop&q={}",
            urlencoding::encode(&query.query)
        ),
    )
}

/// First price-looking fragment of the text, tried pattern by pattern.
pub fn extract_price(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    PRICE_PATTERNS
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_prices_by_pattern_priority() {
        assert_eq!(extract_price("Now only $1,299.99 with free shipping").as_deref(), Some("$1,299.99"));
        assert_eq!(extract_price("Ab €25,50 erhältlich").as_deref(), Some("€25,50"));
        assert_eq!(extract_price("£30 in store").as_deref(), Some("£30"));
        assert_eq!(extract_price("usd 45.00 each").as_deref(), Some("usd 45.00"));
        assert_eq!(extract_price("about 20 dollars").as_deref(), Some("20 dollars"));
        assert_eq!(extract_price("€10 or $12").as_deref(), Some("$12"));
        assert_eq!(extract_price("no price here"), None);
        assert_eq!(extract_price(""), None);
    }

    #[test]
    fn item_fields_map_onto_gift() {
        let query = GiftQuery::new("fly fishing reel", "He fishes every weekend.");
        let item = SearchItem {
            title: Some("Orvis Clearwater Reel".to_string()),
            link: Some("https://img.example.com/reel.jpg".to_string()),
            snippet: Some("Large arbor reel $89.00".to_string()),
            image: Some(ItemImage { context_link: Some("https://shop.example.com/reel".to_string()) }),
        };

        let gift = product_from_item(&query, item);
        assert_eq!(gift.source, GiftSource::GoogleShopping);
        assert_eq!(gift.price, "$89.00");
        assert_eq!(gift.image, "https://img.example.com/reel.jpg");
        assert_eq!(gift.link, "https://shop.example.com/reel");
        assert_eq!(gift.reason, "He fishes every weekend.");
    }

    #[test]
    fn sparse_item_uses_defaults() {
        let query = GiftQuery::new("tackle box", "Keeps lures tidy.");
        let item = SearchItem { title: None, link: None, snippet: None, image: None };

        let gift = product_from_item(&query, item);
        assert_eq!(gift.title, "tackle box");
        assert_eq!(gift.price, PRICE_VARIES);
        assert_eq!(gift.image, FALLBACK_IMAGE);
        assert_eq!(gift.link, "https://www.google.com/search?q=tackle%20box");
    }

    #[tokio::test]
    async fn failed_search_yields_fallback_product() {
        let resolver = GoogleShoppingResolver::new(Client::new(), "key".into(), "cx".into())
            .with_endpoint("http://127.0.0.1:9/customsearch/v1")
            .with_delay(Duration::ZERO);
        let query = GiftQuery::new("fly fishing reel", "He fishes every weekend.");

        let gift = resolver.resolve(&query).await;
        assert_eq!(gift.source, GiftSource::GoogleShoppingFallback);
        assert_eq!(gift.title, "Fly Fishing Reel");
        assert_eq!(gift.link, "https://www.google.com/search?tbm=shop&q=fly%20fishing%20reel");
        assert!(resolver.pause().is_none());
    }
}
