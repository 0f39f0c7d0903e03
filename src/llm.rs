use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use crate::error::{Result, AppError};
use crate::settings::Provider;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// One prompt addressed to a specific provider and model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub prompt: String,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the raw text produced by the model.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

/// Talks to Gemini or Groq over HTTPS depending on the request's provider.
pub struct HttpCompletionClient {
    client: Client,
}

impl HttpCompletionClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match request.provider {
            Provider::Gemini => call_gemini(&self.client, &request.api_key, &request.model, &request.prompt).await,
            Provider::Groq => call_groq(&self.client, &request.api_key, &request.model, &request.prompt).await,
        }
    }
}

pub async fn call_gemini(client: &Client, api_key: &str, model: &str, prompt: &str) -> Result<String> {
    let body = serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }]
    });

    let res = client
        .post(format!("{}/{}:generateContent", GEMINI_API_BASE, model))
        .query(&[("key", api_key)])
        .json(&body)
        .send()
        .await?;

    if !res.status().is_success() {
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        return Err(AppError::LlmError(format!("Gemini API returned {}: {}", status, text)));
    }

    let json: serde_json::Value = res.json().await?;
    let reply = json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| AppError::LlmError("Invalid response format from Gemini".to_string()))?
        .to_string();

    Ok(reply)
}

pub async fn call_groq(client: &Client, api_key: &str, model: &str, prompt: &str) -> Result<String> {
    let body = ChatRequest {
        model: model.into(),
        messages: vec![
            Message {
                role: "user".into(),
                content: prompt.into(),
            }
        ],
        temperature: 0.7,
        max_tokens: 1024,
    };

    let res = client
        .post(GROQ_API_URL)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?;

    if !res.status().is_success() {
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        return Err(AppError::LlmError(format!("Groq API returned {}: {}", status, text)));
    }

    let json: serde_json::Value = res.json().await?;
    let reply = json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    Ok(reply)
}
