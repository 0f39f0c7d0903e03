use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{title_case, Gift, GiftSource, PlatformLinks, ProductResolver};
use crate::images::ImageResolver;
use crate::placeholders;
use crate::queries::GiftQuery;

fn keyword_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid keyword regex")
}

static CATEGORY_RULES: Lazy<Vec<(Regex, Category)>> = Lazy::new(|| {
    vec![
        (keyword_regex("tech|gadget|electronic|computer|phone|headphone|speaker|smartwatch"), Category::Tech),
        (keyword_regex("book|reading|novel|magazine|kindle"), Category::Books),
        (keyword_regex("home|decor|furniture|kitchen|cookware|garden"), Category::Home),
        (keyword_regex("food|coffee|tea|chocolate|wine|gourmet|cooking"), Category::Food),
        (keyword_regex("fashion|clothing|jewelry|accessory|watch|bag|shoes"), Category::Fashion),
    ]
});

static PRICE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (keyword_regex("luxury|premium|designer|gold|silver|diamond|high-end|professional"), "$50-150"),
        (keyword_regex("budget|affordable|cheap|basic|simple"), "$10-30"),
        (keyword_regex("tech|electronic|gadget|smartwatch|tablet"), "$40-120"),
        (keyword_regex("jewelry|watch|bag|fashion"), "$30-80"),
        (keyword_regex("book|dvd|cd|magazine"), "$15-40"),
    ]
});

const DEFAULT_PRICE_RANGE: &str = "$25-60";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Tech,
    Books,
    Home,
    Food,
    Fashion,
    Default,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tech => "tech",
            Category::Books => "books",
            Category::Home => "home",
            Category::Food => "food",
            Category::Fashion => "fashion",
            Category::Default => "default",
        }
    }

    pub fn image(&self) -> &'static str {
        match self {
            Category::Tech => placeholders::CATEGORY_TECH,
            Category::Books => placeholders::CATEGORY_BOOKS,
            Category::Home => placeholders::CATEGORY_HOME,
            Category::Food => placeholders::CATEGORY_FOOD,
            Category::Fashion => placeholders::CATEGORY_FASHION,
            Category::Default => placeholders::CATEGORY_DEFAULT,
        }
    }
}

pub fn detect_category(query: &str) -> Category {
    let query = query.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(re, _)| re.is_match(&query))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Default)
}

pub fn estimate_price_range(query: &str) -> &'static str {
    let query = query.to_lowercase();
    PRICE_RULES
        .iter()
        .find(|(re, _)| re.is_match(&query))
        .map(|(_, range)| *range)
        .unwrap_or(DEFAULT_PRICE_RANGE)
}

pub fn platform_links(query: &str) -> PlatformLinks {
    let encoded = urlencoding::encode(query);
    PlatformLinks {
        amazon: format!("https://www.amazon.com/s?k={}", encoded),
        ebay: format!("https://www.ebay.com/sch/i.html?_nkw={}", encoded),
        etsy: format!("https://www.etsy.com/search?q={}", encoded),
        walmart: format!("https://www.walmart.com/search?q={}", encoded),
        target: format!("https://www.target.com/s?searchTerm={}", encoded),
    }
}

/// Builds search links for five stores from the query text alone, with an
/// optional photo lookup per query.
pub struct MultiStoreResolver {
    images: Option<ImageResolver>,
}

impl MultiStoreResolver {
    pub fn new(images: Option<ImageResolver>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl ProductResolver for MultiStoreResolver {
    fn name(&self) -> &'static str {
        "multi-store"
    }

    async fn resolve(&self, query: &GiftQuery) -> Gift {
        let category = detect_category(&query.query);
        let links = platform_links(&query.query);

        let image = match &self.images {
            Some(images) if images.is_configured() => images.fetch(&query.query).await,
            _ => category.image().to_string(),
        };

        let mut gift = Gift::basic(
            query,
            GiftSource::MultiStore,
            title_case(&query.query),
            estimate_price_range(&query.query).to_string(),
            image,
            links.amazon.clone(),
        );
        gift.category = Some(category.as_str().to_string());
        gift.platform_links = Some(links);
        gift
    }
}
