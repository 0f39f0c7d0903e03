use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::placeholders::FALLBACK_IMAGE;

const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";

static MARKETING_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)vintage|antique|retro|modern|premium|luxury").expect("valid marketing-word regex")
});

/// Looks up a representative photo for a gift query on Unsplash.
#[derive(Clone)]
pub struct ImageResolver {
    client: Client,
    access_key: Option<String>,
    endpoint: String,
}

impl ImageResolver {
    pub fn new(client: Client, access_key: Option<String>) -> Self {
        Self {
            client,
            access_key: access_key.filter(|k| !k.trim().is_empty()),
            endpoint: UNSPLASH_SEARCH_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.access_key.is_some()
    }

    /// Never fails: any problem yields the static fallback image.
    pub async fn fetch(&self, query: &str) -> String {
        let Some(access_key) = self.access_key.as_deref() else {
            tracing::debug!("Unsplash not configured, using fallback image");
            return FALLBACK_IMAGE.to_string();
        };

        match self.search(access_key, query).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                tracing::warn!("No Unsplash results for \"{}\", using fallback", query);
                FALLBACK_IMAGE.to_string()
            }
            Err(e) => {
                tracing::error!("Unsplash fetch error: {}", e);
                FALLBACK_IMAGE.to_string()
            }
        }
    }

    async fn search(&self, access_key: &str, query: &str) -> Result<Option<String>> {
        let search_query = clean_query(query);
        tracing::info!("Fetching Unsplash image for \"{}\"", search_query);

        let res = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("query", search_query.as_str()),
                ("per_page", "1"),
                ("orientation", "squarish"),
            ])
            .header("Authorization", format!("Client-ID {}", access_key))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(AppError::FetchError(format!("Unsplash API returned {}", res.status())));
        }

        let json: serde_json::Value = res.json().await?;
        Ok(first_photo_url(&json))
    }
}

/// Regular-size URL of the first search hit, if any.
pub fn first_photo_url(json: &serde_json::Value) -> Option<String> {
    json["results"][0]["urls"]["regular"]
        .as_str()
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// Drops marketing adjectives that tend to skew photo search results.
pub fn clean_query(query: &str) -> String {
    let stripped = MARKETING_WORDS.replace_all(query, "");
    let cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        query.trim().to_string()
    } else {
        cleaned
    }
}
