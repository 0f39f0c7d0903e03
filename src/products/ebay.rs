//! Legacy eBay search-page scraper. Fragile against markup changes and bot
//! detection; prefer the multi-store or Google Shopping sources.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use super::{Gift, GiftSource, ProductResolver};
use crate::http::fetch_html;
use crate::placeholders;
use crate::queries::GiftQuery;

const EBAY_SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Failed to parse selector")
}

static RESULTS_SELECTOR: Lazy<Selector> = Lazy::new(|| selector(".s-item, .srp-results"));
static ITEM_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector(".s-item"),
        selector(".srp-results .s-item"),
        selector(r#"[data-view="mi:1686|iid:1"]"#),
    ]
});
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| selector(".s-item__title"));
static PRICE_SELECTOR: Lazy<Selector> = Lazy::new(|| selector(".s-item__price"));
static IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| selector(".s-item__image-img, img"));
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| selector(".s-item__link, a"));

/// Fields pulled out of the first real search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub title: String,
    pub price: String,
    pub image: String,
    pub link: String,
}

pub struct EbayScraper {
    search_url: String,
    min_delay: Duration,
    max_delay: Duration,
}

impl Default for EbayScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl EbayScraper {
    pub fn new() -> Self {
        Self {
            search_url: EBAY_SEARCH_URL.to_string(),
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(4),
        }
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max.max(min);
        self
    }

    fn search_link(&self, keyword: &str) -> String {
        format!("{}?_nkw={}", self.search_url, urlencoding::encode(keyword))
    }
}

#[async_trait]
impl ProductResolver for EbayScraper {
    fn name(&self) -> &'static str {
        "ebay-scraping"
    }

    async fn resolve(&self, query: &GiftQuery) -> Gift {
        let keyword = &query.query;
        let url = self.search_link(keyword);
        tracing::info!("Scraping eBay: {}", url);

        match fetch_html(&url).await {
            Ok(html) => match parse_listing(&html) {
                Some(listing) => {
                    tracing::info!("Scraped product: {}", listing.title);
                    let link = absolute_link(&url, &listing.link);
                    Gift::basic(
                        query,
                        GiftSource::EbayScraping,
                        listing.title,
                        listing.price,
                        listing.image,
                        link,
                    )
                }
                None => {
                    tracing::warn!("No eBay product found for \"{}\"", keyword);
                    Gift::basic(
                        query,
                        GiftSource::EbayScraping,
                        format!("No results found for \"{}\"", keyword),
                        "N/A".to_string(),
                        placeholders::NO_RESULTS.to_string(),
                        url,
                    )
                }
            },
            Err(e) => {
                tracing::error!("Scraper error: {}", e);
                let mut gift = Gift::basic(
                    query,
                    GiftSource::EbayScraping,
                    format!("Error: Could not fetch results for \"{}\"", keyword),
                    "N/A".to_string(),
                    placeholders::SCRAPE_ERROR.to_string(),
                    url,
                );
                gift.error = Some(e.to_string());
                gift
            }
        }
    }

    fn pause(&self) -> Option<Duration> {
        if self.max_delay.is_zero() {
            return None;
        }
        let ms = rand::thread_rng()
            .gen_range(self.min_delay.as_millis() as u64..=self.max_delay.as_millis() as u64);
        Some(Duration::from_millis(ms))
    }
}

/// Extracts the first search result that is not eBay's "Shop on eBay" banner.
pub fn parse_listing(html: &str) -> Option<Listing> {
    let document = Html::parse_document(html);

    if document.select(&RESULTS_SELECTOR).next().is_none() {
        tracing::warn!("Results section not found, attempting to extract anyway");
    }

    let items: Vec<ElementRef> = ITEM_SELECTORS
        .iter()
        .map(|sel| document.select(sel).collect::<Vec<_>>())
        .find(|items| !items.is_empty())?;

    let item = items.into_iter().find(|item| {
        item.select(&TITLE_SELECTOR)
            .next()
            .is_some_and(|t| !element_text(t).contains("Shop on eBay"))
    })?;

    let title = item
        .select(&TITLE_SELECTOR)
        .next()
        .map(element_text)
        .unwrap_or_else(|| "No title".to_string());

    let price = item
        .select(&PRICE_SELECTOR)
        .next()
        .map(element_text)
        .unwrap_or_else(|| "Price not available".to_string());

    let image = item
        .select(&IMAGE_SELECTOR)
        .next()
        .and_then(|img| {
            let el = img.value();
            el.attr("src")
                .filter(|s| !s.is_empty())
                .or_else(|| el.attr("data-src"))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| placeholders::NO_IMAGE.to_string());

    let link = item
        .select(&LINK_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("href"))
        .unwrap_or("#")
        .to_string();

    Some(Listing { title, price, image, link })
}

/// Resolves a listing href against the page it was scraped from. The `#`
/// placeholder is left alone.
pub fn absolute_link(page_url: &str, href: &str) -> String {
    if href == "#" {
        return href.to_string();
    }
    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <ul class="srp-results">
            <li class="s-item">
              <div class="s-item__title">Shop on eBay</div>
              <span class="s-item__price">$20.00</span>
            </li>
            <li class="s-item">
              <img class="s-item__image-img" src="" data-src="https://i.ebayimg.com/reel.jpg">
              <a class="s-item__link" href="https://www.ebay.com/itm/123">
                <div class="s-item__title"> Pflueger President Spinning Reel </div>
              </a>
              <span class="s-item__price">$54.95</span>
            </li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn skips_banner_and_reads_first_listing() {
        let listing = parse_listing(RESULTS_PAGE).unwrap();
        assert_eq!(listing.title, "Pflueger President Spinning Reel");
        assert_eq!(listing.price, "$54.95");
        assert_eq!(listing.image, "https://i.ebayimg.com/reel.jpg");
        assert_eq!(listing.link, "https://www.ebay.com/itm/123");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let html = r#"<div class="s-item"><span class="s-item__title">Tackle Box</span></div>"#;
        let listing = parse_listing(html).unwrap();
        assert_eq!(listing.price, "Price not available");
        assert_eq!(listing.image, placeholders::NO_IMAGE);
        assert_eq!(listing.link, "#");
    }

    #[test]
    fn relative_links_resolve_against_search_page() {
        let page = "https://www.ebay.com/sch/i.html?_nkw=fishing%20reel";
        assert_eq!(absolute_link(page, "/itm/123?hash=abc"), "https://www.ebay.com/itm/123?hash=abc");
        assert_eq!(absolute_link(page, "https://www.ebay.com/itm/456"), "https://www.ebay.com/itm/456");
        assert_eq!(absolute_link(page, "#"), "#");
    }

    #[test]
    fn page_without_results_yields_none() {
        assert!(parse_listing("<html><body><p>Captcha</p></body></html>").is_none());
    }

    #[tokio::test]
    async fn fetch_failure_yields_error_placeholder() {
        let scraper = EbayScraper::new()
            .with_search_url("http://127.0.0.1:9/sch/i.html")
            .with_delay(Duration::ZERO, Duration::ZERO);
        let query = GiftQuery::new("spinning reel", "For weekend trips.");

        let gift = scraper.resolve(&query).await;
        assert_eq!(gift.source, GiftSource::EbayScraping);
        assert_eq!(gift.title, "Error: Could not fetch results for \"spinning reel\"");
        assert_eq!(gift.image, placeholders::SCRAPE_ERROR);
        assert!(gift.error.is_some());
        assert!(scraper.pause().is_none());
    }

    #[test]
    fn pause_stays_within_bounds() {
        let scraper = EbayScraper::new();
        for _ in 0..20 {
            let pause = scraper.pause().unwrap();
            assert!(pause >= Duration::from_secs(2) && pause <= Duration::from_secs(4));
        }
    }
}
