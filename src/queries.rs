use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::settings::Settings;

pub const QUERY_COUNT: usize = 6;

/// A search phrase produced by the AI together with why it suits the person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftQuery {
    pub query: String,
    pub reason: String,
}

impl GiftQuery {
    pub fn new(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            reason: reason.into(),
        }
    }
}

/// Result of query generation. Generation never fails outright; a failed
/// attempt degrades to the static list and records what went wrong.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Generated(Vec<GiftQuery>),
    Fallback { queries: Vec<GiftQuery>, cause: String },
}

impl QueryOutcome {
    pub fn queries(&self) -> &[GiftQuery] {
        match self {
            QueryOutcome::Generated(queries) => queries,
            QueryOutcome::Fallback { queries, .. } => queries,
        }
    }

    pub fn into_queries(self) -> Vec<GiftQuery> {
        match self {
            QueryOutcome::Generated(queries) => queries,
            QueryOutcome::Fallback { queries, .. } => queries,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, QueryOutcome::Fallback { .. })
    }
}

pub async fn generate_gift_queries(
    client: &dyn CompletionClient,
    settings: &Settings,
    description: &str,
) -> QueryOutcome {
    match try_generate(client, settings, description).await {
        Ok(queries) => {
            tracing::info!("Generated {} gift queries with {}", queries.len(), settings.provider);
            QueryOutcome::Generated(queries)
        }
        Err(e) => {
            tracing::error!("AI query generation failed: {}", e);
            tracing::warn!("Using fallback queries");
            QueryOutcome::Fallback {
                queries: fallback_queries(),
                cause: e.to_string(),
            }
        }
    }
}

async fn try_generate(
    client: &dyn CompletionClient,
    settings: &Settings,
    description: &str,
) -> Result<Vec<GiftQuery>> {
    if !settings.is_configured() {
        return Err(AppError::ConfigError(
            "API key not configured. Please set up your API key in settings.".to_string(),
        ));
    }

    tracing::info!("Requesting gift ideas from {} ({})", settings.provider, settings.model);
    let request = CompletionRequest {
        provider: settings.provider,
        api_key: settings.api_key.clone(),
        model: settings.model.clone(),
        prompt: build_prompt(description),
    };

    let text = client.complete(&request).await?;
    tracing::debug!("Raw AI response: {}", text);

    parse_queries(&text)
}

pub fn build_prompt(description: &str) -> String {
    let mut prompt = String::with_capacity(description.len() + 1200);
    prompt.push_str("You are a gift recommendation expert. Analyze this person description and generate exactly 6 unique, specific search queries for finding gifts.\n\n");
    prompt.push_str(&format!("Person Description: \"{}\"\n\n", description));
    prompt.push_str("IMPORTANT: Respond ONLY with a valid JSON array. No markdown, no explanations, just the JSON array.\n\n");
    prompt.push_str("Format:\n[\n");

    let examples = [
        ("specific search term", "why this gift matches the person (1-2 sentences)"),
        ("another specific search term", "why this gift is perfect"),
        ("third unique search term", "why they'll love this"),
        ("fourth creative search term", "why this is a great match"),
        ("fifth unique search term", "why this gift works"),
        ("sixth special search term", "why this is perfect for them"),
    ];
    for (i, (query, reason)) in examples.iter().enumerate() {
        prompt.push_str(&format!(
            "  {{\n    \"query\": \"{}\",\n    \"reason\": \"{}\"\n  }}",
            query, reason
        ));
        prompt.push_str(if i + 1 < examples.len() { ",\n" } else { "\n" });
    }

    prompt.push_str("]\n\nMake the queries creative, specific, and tailored to the person's interests. Include a mix of practical and creative gifts. Avoid generic terms.");
    prompt
}

/// Removes a surrounding markdown code fence, with or without a `json` tag.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let inner = if let Some(rest) = text.strip_prefix("```json") {
        rest
    } else if let Some(rest) = text.strip_prefix("```") {
        rest
    } else {
        return text;
    };
    let inner = inner.trim();
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[derive(Deserialize)]
struct RawQuery {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

pub fn parse_queries(text: &str) -> Result<Vec<GiftQuery>> {
    let raw: Vec<RawQuery> = serde_json::from_str(strip_code_fence(text))?;

    if raw.len() != QUERY_COUNT {
        return Err(AppError::ParseError(format!(
            "AI did not return exactly {} queries (got {})",
            QUERY_COUNT,
            raw.len()
        )));
    }

    raw.into_iter()
        .enumerate()
        .map(|(index, q)| match (q.query, q.reason) {
            (Some(query), Some(reason)) if !query.is_empty() && !reason.is_empty() => {
                Ok(GiftQuery { query, reason })
            }
            _ => Err(AppError::ParseError(format!(
                "Query {} is missing 'query' or 'reason' field",
                index + 1
            ))),
        })
        .collect()
}

pub fn fallback_queries() -> Vec<GiftQuery> {
    vec![
        GiftQuery::new(
            "unique personalized gifts",
            "AI service temporarily unavailable. This is a generic search to help you get started.",
        ),
        GiftQuery::new("best seller gifts", "Popular gift items that many people enjoy."),
        GiftQuery::new("creative gift ideas", "Unique and creative options for any occasion."),
        GiftQuery::new("handmade artisan gifts", "Handcrafted items with a personal touch."),
        GiftQuery::new("premium gift sets", "Curated gift collections for special occasions."),
        GiftQuery::new("experience gifts", "Memorable experiences and activities."),
    ]
}
