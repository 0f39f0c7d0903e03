use async_trait::async_trait;
use rand::Rng;

use super::{Gift, GiftSource, ProductResolver};
use crate::placeholders;
use crate::queries::GiftQuery;

/// Offline stand-in that answers every query with one of three canned products.
pub struct MockCatalog;

impl MockCatalog {
    fn product(&self, query: &GiftQuery, pick: usize) -> Gift {
        let keyword = &query.query;
        let (title, price, image, link) = match pick {
            0 => (
                format!("Premium {} - Limited Edition", keyword),
                "$29.99",
                placeholders::MOCK_GIFT_1,
                "https://www.ebay.com/itm/mock-product-1",
            ),
            1 => (
                format!("Best Selling {} Gift Set", keyword),
                "$45.00",
                placeholders::MOCK_GIFT_2,
                "https://www.ebay.com/itm/mock-product-2",
            ),
            _ => (
                format!("Handcrafted {} Collection", keyword),
                "$67.50",
                placeholders::MOCK_GIFT_3,
                "https://www.ebay.com/itm/mock-product-3",
            ),
        };
        Gift::basic(
            query,
            GiftSource::Mock,
            title,
            price.to_string(),
            image.to_string(),
            link.to_string(),
        )
    }
}

#[async_trait]
impl ProductResolver for MockCatalog {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn resolve(&self, query: &GiftQuery) -> Gift {
        let pick = rand::thread_rng().gen_range(0..3);
        tracing::debug!("Returning mock product {} for \"{}\"", pick + 1, query.query);
        self.product(query, pick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_products_embed_keyword() {
        let query = GiftQuery::new("tea sampler", "She drinks tea daily.");
        let titles: Vec<String> = (0..3).map(|i| MockCatalog.product(&query, i).title).collect();
        assert_eq!(
            titles,
            [
                "Premium tea sampler - Limited Edition",
                "Best Selling tea sampler Gift Set",
                "Handcrafted tea sampler Collection",
            ]
        );
    }

    #[tokio::test]
    async fn resolve_tags_mock_source() {
        let query = GiftQuery::new("tea sampler", "She drinks tea daily.");
        let gift = MockCatalog.resolve(&query).await;
        assert_eq!(gift.source, GiftSource::Mock);
        assert_eq!(gift.reason, "She drinks tea daily.");
        assert!(gift.link.starts_with("https://www.ebay.com/itm/mock-product-"));
        assert!(MockCatalog.pause().is_none());
    }
}
