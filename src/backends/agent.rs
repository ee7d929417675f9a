//! Primary remote backend: a chat LLM.
//!
//! OpenAI-compatible endpoints are called directly with reqwest; Gemini goes
//! through rstructor.

use super::{non_empty, snippet, BackendError, SummaryBackend};
use crate::config::Config;
use crate::summary::BackendKind;
use async_trait::async_trait;
use reqwest::Client;
use rstructor::{GeminiClient, GeminiModel, LLMClient};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

enum Provider {
    OpenAi {
        client: Client,
        base_url: String,
        api_key: String,
    },
    Gemini {
        api_key: String,
    },
}

pub struct AgentBackend {
    provider: Provider,
    model: String,
    persona: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl fmt::Debug for AgentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let provider = match self.provider {
            Provider::OpenAi { .. } => "openai",
            Provider::Gemini { .. } => "gemini",
        };
        f.debug_struct("AgentBackend")
            .field("provider", &provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl AgentBackend {
    /// Build the primary backend; `None` when no key is configured for the provider
    pub fn from_config(config: &Config) -> Result<Option<Self>, BackendError> {
        let Some(api_key) = config.primary_key() else {
            return Ok(None);
        };
        let timeout = config.summarizer.timeout();

        let provider = match config.agent.provider.as_str() {
            "openai" => Provider::OpenAi {
                client: Client::builder().timeout(timeout).build()?,
                base_url: config.agent.base_url.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
            },
            "gemini" => Provider::Gemini {
                api_key: api_key.to_string(),
            },
            other => return Err(BackendError::Config(format!("unknown provider: {}", other))),
        };

        Ok(Some(Self {
            provider,
            model: config.agent.model.clone(),
            persona: config.agent.persona.clone(),
            max_tokens: config.agent.max_tokens,
            temperature: config.agent.temperature,
            timeout,
        }))
    }

    fn user_prompt(text: &str) -> String {
        format!("Please summarize the following article: {}", text)
    }

    async fn summarize_openai(
        &self,
        client: &Client,
        base_url: &str,
        api_key: &str,
        text: &str,
    ) -> Result<Option<String>, BackendError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.persona.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(text),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = client
            .post(format!("{}/chat/completions", base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(self.timeout)
                } else {
                    BackendError::from(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }
        Ok(parse_chat_response(&body))
    }

    async fn summarize_gemini(&self, api_key: &str, text: &str) -> Result<Option<String>, BackendError> {
        let client = GeminiClient::new(api_key)
            .map_err(|e| BackendError::Config(e.to_string()))?
            .model(parse_gemini_model(&self.model));

        let prompt = format!("{}\n\n{}", self.persona, Self::user_prompt(text));

        let result = tokio::time::timeout(self.timeout, client.generate_with_metadata(&prompt))
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))?
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(non_empty(Some(result.text.to_string())))
    }
}

#[async_trait]
impl SummaryBackend for AgentBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::PrimaryRemote
    }

    fn name(&self) -> &str {
        match self.provider {
            Provider::OpenAi { .. } => "openai",
            Provider::Gemini { .. } => "gemini",
        }
    }

    async fn try_summarize(&self, text: &str) -> Result<Option<String>, BackendError> {
        match &self.provider {
            Provider::OpenAi {
                client,
                base_url,
                api_key,
            } => self.summarize_openai(client, base_url, api_key, text).await,
            Provider::Gemini { api_key } => self.summarize_gemini(api_key, text).await,
        }
    }
}

/// First choice's content, or `None` when the body has another shape
fn parse_chat_response(body: &str) -> Option<String> {
    let response: ChatResponse = serde_json::from_str(body).ok()?;
    let content = response.choices.into_iter().next()?.message.content;
    non_empty(content)
}

/// Parse a model string into a GeminiModel
fn parse_gemini_model(model: &str) -> GeminiModel {
    match model {
        "gemini-2.0-flash" => GeminiModel::Gemini20Flash,
        "gemini-2.5-flash" => GeminiModel::Gemini25Flash,
        "gemini-2.5-pro" => GeminiModel::Gemini25Pro,
        _ => GeminiModel::Gemini20Flash, // Default
    }
}
