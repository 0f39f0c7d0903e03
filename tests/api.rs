use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use gift_recommender::api::routes::create_router;
use gift_recommender::config::Config;
use gift_recommender::error::Result;
use gift_recommender::llm::{CompletionClient, CompletionRequest};
use gift_recommender::products::{
    EbayScraper, GoogleShoppingResolver, MockCatalog, MultiStoreResolver, ResolverSet,
};
use gift_recommender::queries::fallback_queries;
use gift_recommender::settings::ProductSource;
use gift_recommender::AppState;

const UNREACHABLE: &str = "http://127.0.0.1:9";

struct StubCompletions {
    reply: String,
    calls: AtomicUsize,
}

impl StubCompletions {
    fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { reply: reply.into(), calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for StubCompletions {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

fn fishing_queries() -> Vec<(&'static str, &'static str)> {
    vec![
        ("fly fishing tackle box", "Keeps his flies and lures organized on the water."),
        ("waterproof fishing jacket", "Stays dry on rainy early-morning trips."),
        ("classic fishing memoir book", "A good read between seasons."),
        ("hand-carved wooden fishing lures", "Handmade and entirely screen-free."),
        ("folding camp chair", "Comfort on long afternoons by the lake."),
        ("personalized fishing journal", "Record every catch the old-fashioned way."),
    ]
}

fn fishing_reply() -> String {
    let items: Vec<Value> = fishing_queries()
        .into_iter()
        .map(|(query, reason)| json!({ "query": query, "reason": reason }))
        .collect();
    format!("```json\n{}\n```", Value::Array(items))
}

fn resolvers() -> ResolverSet {
    ResolverSet {
        multi_store: MultiStoreResolver::new(None),
        google_shopping: Some(
            GoogleShoppingResolver::new(reqwest::Client::new(), "key".into(), "cx".into())
                .with_endpoint(format!("{}/customsearch/v1", UNREACHABLE))
                .with_delay(Duration::ZERO),
        ),
        ebay: EbayScraper::new()
            .with_search_url(format!("{}/sch/i.html", UNREACHABLE))
            .with_delay(Duration::ZERO, Duration::ZERO),
        mock: MockCatalog,
    }
}

fn app_with(source: ProductSource, completions: Arc<StubCompletions>) -> Router {
    let config = Config {
        api_key: "AIzaSyTestKey123".to_string(),
        product_source: source,
        ..Config::default()
    };
    create_router(AppState::with_parts(config, completions, resolvers()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn recommend(app: &Router, description: &str) -> (StatusCode, Value) {
    send(app, "POST", "/api/recommend", Some(json!({ "description": description }))).await
}

#[tokio::test]
async fn multi_store_recommendation_links_every_store() {
    let completions = StubCompletions::new(fishing_reply());
    let app = app_with(ProductSource::MultiStore, completions.clone());

    let (status, body) = recommend(&app, "My dad who loves fishing and hates technology").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["description"], "My dad who loves fishing and hates technology");
    assert_eq!(body["data"]["totalResults"], 6);
    assert_eq!(body["data"]["usedFallbackQueries"], false);
    assert_eq!(completions.calls(), 1);

    let gifts = body["data"]["gifts"].as_array().unwrap();
    assert_eq!(gifts.len(), 6);
    for (gift, (query, reason)) in gifts.iter().zip(fishing_queries()) {
        assert_eq!(gift["source"], "multi-store");
        assert_eq!(gift["searchQuery"], query);
        assert_eq!(gift["reason"], reason);

        let encoded = urlencoding::encode(query).into_owned();
        for store in ["amazon", "ebay", "etsy", "walmart", "target"] {
            let link = gift["platformLinks"][store].as_str().unwrap();
            assert!(link.contains(&encoded), "{} link {} lacks {}", store, link, encoded);
        }
    }
}

#[tokio::test]
async fn invalid_descriptions_are_rejected_before_any_lookup() {
    let completions = StubCompletions::new(fishing_reply());
    let app = app_with(ProductSource::MultiStore, completions.clone());

    let too_long = "a".repeat(501);
    let cases = [
        ("", "Description is required"),
        ("   ", "Description is required"),
        ("abcd", "Description too short"),
        (too_long.as_str(), "Description too long"),
    ];
    for (description, error) in cases {
        let (status, body) = recommend(&app, description).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], error);
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    let (status, body) = send(&app, "POST", "/api/recommend", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Description is required");

    assert_eq!(completions.calls(), 0);
}

#[tokio::test]
async fn malformed_ai_reply_uses_fallback_queries() {
    for reply in ["I'd suggest a nice fishing rod!", r#"[{"query": "rod", "reason": "fun"}]"#] {
        let app = app_with(ProductSource::MultiStore, StubCompletions::new(reply));

        let (status, body) = recommend(&app, "My dad who loves fishing").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["usedFallbackQueries"], true);

        let gifts = body["data"]["gifts"].as_array().unwrap();
        let expected = fallback_queries();
        assert_eq!(gifts.len(), expected.len());
        for (gift, query) in gifts.iter().zip(expected) {
            assert_eq!(gift["searchQuery"], query.query.as_str());
            assert_eq!(gift["reason"], query.reason.as_str());
        }
    }
}

#[tokio::test]
async fn every_product_source_tags_its_gifts() {
    let cases = [
        (ProductSource::MultiStore, "multi-store"),
        (ProductSource::GoogleShopping, "google-shopping-fallback"),
        (ProductSource::Mock, "mock"),
        (ProductSource::EbayScraping, "ebay-scraping"),
    ];

    for (source, tag) in cases {
        let app = app_with(source, StubCompletions::new(fishing_reply()));
        let (status, body) = recommend(&app, "A friend who loves the outdoors").await;
        assert_eq!(status, StatusCode::OK, "{:?}", source);

        let gifts = body["data"]["gifts"].as_array().unwrap();
        assert_eq!(gifts.len(), 6, "{:?}", source);
        for (gift, (_, reason)) in gifts.iter().zip(fishing_queries()) {
            assert_eq!(gift["source"], tag);
            assert_eq!(gift["reason"], reason);
        }
    }
}

#[tokio::test]
async fn health_reports_product_source() {
    let app = app_with(ProductSource::Mock, StubCompletions::new(fishing_reply()));
    let (status, body) = send(&app, "GET", "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["productSource"], "mock");
    assert_eq!(body["legacyMockMode"], true);
    assert_eq!(body["googleShoppingConfigured"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn config_is_served_with_redacted_key() {
    let app = app_with(ProductSource::MultiStore, StubCompletions::new(fishing_reply()));
    let (status, body) = send(&app, "GET", "/api/config", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["provider"], "gemini");
    assert_eq!(body["config"]["model"], "gemini-2.5-flash-lite");
    assert_eq!(body["config"]["productSource"], "multi-store");
    assert_eq!(body["config"]["apiKeyConfigured"], true);
    assert_eq!(body["config"]["apiKeyPreview"], "AIzaSyTe...");
    assert!(!body.to_string().contains("AIzaSyTestKey123"));
    assert_eq!(body["availableModels"]["groq"].as_array().unwrap().len(), 3);
    assert_eq!(body["availableModels"]["gemini"][0]["isMain"], true);
}

#[tokio::test]
async fn config_update_applies_and_defaults_model() {
    let app = app_with(ProductSource::MultiStore, StubCompletions::new(fishing_reply()));

    let (status, body) = send(
        &app,
        "POST",
        "/api/config",
        Some(json!({ "provider": "groq", "apiKey": "gsk_abcdefghijkl", "productSource": "google-shopping" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["model"], "llama-3.3-70b-versatile");
    assert_eq!(body["config"]["apiKeyPreview"], "gsk_abcd...");

    let (_, body) = send(&app, "GET", "/api/config", None).await;
    assert_eq!(body["config"]["provider"], "groq");
    assert_eq!(body["config"]["productSource"], "google-shopping");
}

#[tokio::test]
async fn config_update_without_product_source_resets_to_multi_store() {
    let app = app_with(ProductSource::GoogleShopping, StubCompletions::new(fishing_reply()));
    let (_, body) = send(&app, "GET", "/api/config", None).await;
    assert_eq!(body["config"]["productSource"], "google-shopping");

    let (status, body) = send(
        &app,
        "POST",
        "/api/config",
        Some(json!({ "provider": "gemini", "apiKey": "AIzaSyOtherKey99", "model": "gemini-2.5-flash-lite" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["productSource"], "multi-store");

    let (_, body) = send(&app, "GET", "/api/config", None).await;
    assert_eq!(body["config"]["productSource"], "multi-store");
}

#[tokio::test]
async fn invalid_config_updates_leave_settings_unchanged() {
    let app = app_with(ProductSource::MultiStore, StubCompletions::new(fishing_reply()));
    let (_, before) = send(&app, "GET", "/api/config", None).await;

    let bad_updates = [
        json!({ "apiKey": "new-key-123456" }),
        json!({ "provider": "groq" }),
        json!({ "provider": "groq", "apiKey": "   " }),
        json!({ "provider": "openai", "apiKey": "sk-123456789" }),
        json!({ "provider": "groq", "apiKey": "gsk_123456789", "model": "gemini-2.0-flash" }),
        json!({ "provider": "groq", "apiKey": "gsk_123456789", "productSource": "ebay-scraping" }),
        json!({ "provider": "groq", "apiKey": "gsk_123456789", "productSource": "amazon" }),
    ];
    for update in bad_updates {
        let (status, body) = send(&app, "POST", "/api/config", Some(update.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", update);
        assert_eq!(body["success"], false);
    }

    let (_, after) = send(&app, "GET", "/api/config", None).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn models_are_listed_per_provider() {
    let app = app_with(ProductSource::MultiStore, StubCompletions::new(fishing_reply()));

    let (status, body) = send(&app, "GET", "/api/models/groq", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "groq");
    assert_eq!(body["models"][0]["id"], "llama-3.3-70b-versatile");

    let (status, body) = send(&app, "GET", "/api/models/openai", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
