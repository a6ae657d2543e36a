use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::QuotaError;
use crate::gate::QuotaGate;
use crate::store::KvStore;
use crate::time::Clock;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// OpenAI-compatible `/chat/completions` client (Groq by default).
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    http: Client,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Message,
}

impl ChatResponse {
    pub fn into_content(self) -> Result<String, QuotaError> {
        self.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| QuotaError::MalformedResponse("chat response has no choices".into()))
    }
}

impl ChatClient {
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_tokens,
            http: Client::new(),
        }
    }

    pub fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message { role: "system".into(), content: SYSTEM_PROMPT.into() },
                Message { role: "user".into(), content: prompt.into() },
            ],
            max_tokens: self.max_tokens,
            stream: false,
        }
    }

    /// Ends at a 2xx status; the body is still unread.
    pub async fn send(&self, prompt: &str) -> Result<Response, QuotaError> {
        let url = format!("{}/chat/completions", self.base_url);
        info!(model = %self.model, max_tokens = self.max_tokens, "chat.request");

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QuotaError::Api { status: status.as_u16(), body });
        }

        Ok(resp)
    }

    pub async fn read_content(resp: Response) -> Result<String, QuotaError> {
        let parsed: ChatResponse = resp.json().await?;
        parsed.into_content()
    }

    /// The call is charged once the provider answers 2xx, even if the body
    /// then fails to decode.
    pub async fn ask<S: KvStore, C: Clock>(
        &self,
        gate: &QuotaGate<S, C>,
        prompt: &str,
    ) -> Result<String, QuotaError> {
        let resp = gate.run(|| self.send(prompt)).await?;
        Self::read_content(resp).await
    }
}

/// Trims and rejects blank prompts before the quota is consulted.
pub fn normalize_prompt(prompt: &str) -> Result<&str, QuotaError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(QuotaError::EmptyPrompt);
    }
    Ok(prompt)
}
