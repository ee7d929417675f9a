//! Local model fallback.
//!
//! Talks to an Ollama-compatible server on the same host (`POST /api/generate`),
//! so the secondary path keeps working when the hosted API is down.

use super::{non_empty, snippet, BackendError, SummaryBackend};
use crate::config::Config;
use crate::summary::BackendKind;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output bound for local generations, in tokens
const NUM_PREDICT: u32 = 150;

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug)]
pub struct LocalModelBackend {
    client: Client,
    url: String,
    model: String,
}

impl LocalModelBackend {
    pub fn new(url: &str, model: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: format!("{}/api/generate", url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    /// Build the local fallback; `None` when no server URL is configured
    pub fn from_config(config: &Config) -> Result<Option<Self>, BackendError> {
        match &config.local.url {
            Some(url) => {
                Self::new(url, config.local.model.clone(), config.summarizer.timeout()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn request(&self, text: &str) -> GenerateRequest<'_> {
        GenerateRequest {
            model: &self.model,
            prompt: format!(
                "Summarize the following text in a few sentences. Reply with the summary only.\n\n{}",
                text
            ),
            stream: false,
            // Deterministic output
            options: GenerateOptions {
                num_predict: NUM_PREDICT,
                temperature: 0.0,
            },
        }
    }
}

#[async_trait]
impl SummaryBackend for LocalModelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalModel
    }

    fn name(&self) -> &str {
        &self.model
    }

    async fn try_summarize(&self, text: &str) -> Result<Option<String>, BackendError> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.request(text))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let parsed = serde_json::from_str::<GenerateResponse>(&body)
            .ok()
            .and_then(|r| r.response);
        Ok(non_empty(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_url() {
        assert!(LocalModelBackend::from_config(&Config::default()).unwrap().is_none());
    }

    #[test]
    fn url_and_request_shape() {
        let mut config = Config::default();
        config.local.url = Some("http://localhost:11434/".into());
        let backend = LocalModelBackend::from_config(&config).unwrap().unwrap();

        assert_eq!(backend.url, "http://localhost:11434/api/generate");
        let value = serde_json::to_value(backend.request("Some text")).unwrap();
        assert_eq!(value["model"], "llama3");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 150);
        assert!(value["prompt"].as_str().unwrap().ends_with("Some text"));
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let backend = LocalModelBackend::new("http://127.0.0.1:9", "llama3", Duration::from_secs(5)).unwrap();
        assert!(backend.try_summarize("text").await.is_err());
    }
}
