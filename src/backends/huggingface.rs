//! Secondary remote backend: hosted inference API for seq2seq summarizers.

use super::{non_empty, snippet, BackendError, SummaryBackend};
use crate::config::{Config, RECOMMENDED_MODELS};
use crate::summary::BackendKind;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const MAX_LENGTH: u32 = 250;

#[derive(Serialize, Debug, PartialEq)]
struct Parameters {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<&'static str>,
}

#[derive(Serialize, Debug)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

/// One generated output; models use either key
#[derive(Deserialize, Debug)]
struct Generated {
    summary_text: Option<String>,
    generated_text: Option<String>,
}

/// Shapes the inference API answers with
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum InferenceResponse {
    List(Vec<Generated>),
    Single(Generated),
}

impl InferenceResponse {
    fn into_summary(self) -> Option<String> {
        match self {
            InferenceResponse::List(items) => {
                let first = items.into_iter().next()?;
                non_empty(first.summary_text).or_else(|| non_empty(first.generated_text))
            }
            // Bare objects only carry `summary_text`; anything else is an error payload
            InferenceResponse::Single(item) => non_empty(item.summary_text),
        }
    }
}

pub struct HuggingFaceBackend {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl fmt::Debug for HuggingFaceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuggingFaceBackend")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl HuggingFaceBackend {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let model = model.into();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            endpoint: format!("{}{}", base_url, model),
            model,
        })
    }

    /// Build the secondary backend; `None` when no key is configured
    pub fn from_config(config: &Config) -> Result<Option<Self>, BackendError> {
        let Some(api_key) = config.secondary_key() else {
            return Ok(None);
        };
        let model = &config.inference.model;

        match RECOMMENDED_MODELS.iter().find(|(name, _)| *name == model.as_str()) {
            Some((_, description)) => {
                tracing::info!(%model, "using inference model: {}", description)
            }
            None => tracing::warn!(%model, "using custom model (not in recommended list)"),
        }

        Self::new(
            api_key,
            &config.inference.base_url,
            model.clone(),
            config.summarizer.timeout(),
        )
        .map(Some)
    }

    fn request<'a>(&self, text: &'a str) -> InferenceRequest<'a> {
        InferenceRequest {
            inputs: text,
            parameters: parameters_for(&self.model),
        }
    }
}

/// T5-family models need an explicit task and accept shorter outputs
fn parameters_for(model: &str) -> Parameters {
    if model.to_lowercase().contains("t5") {
        Parameters {
            max_length: MAX_LENGTH,
            min_length: 40,
            do_sample: false,
            task: Some("summarization"),
        }
    } else {
        Parameters {
            max_length: MAX_LENGTH,
            min_length: 50,
            do_sample: false,
            task: None,
        }
    }
}

/// Normalize any response body to an optional summary
fn parse_response(body: &str) -> Option<String> {
    serde_json::from_str::<InferenceResponse>(body)
        .ok()
        .and_then(InferenceResponse::into_summary)
}

#[async_trait]
impl SummaryBackend for HuggingFaceBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SecondaryRemote
    }

    fn name(&self) -> &str {
        &self.model
    }

    async fn try_summarize(&self, text: &str) -> Result<Option<String>, BackendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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
        Ok(parse_response(&body))
    }
}
