//! Summarization strategies.
//!
//! Each backend turns text into an optional summary. The engine walks an
//! ordered list of them and takes the first non-empty answer, so a backend
//! reports "no usable result" as `Ok(None)` and transport or API failures as
//! [`BackendError`]; both mean "try the next one".

pub mod agent;
pub mod extractive;
pub mod huggingface;
pub mod local;

pub use agent::AgentBackend;
pub use extractive::ExtractiveBackend;
pub use huggingface::HuggingFaceBackend;
pub use local::LocalModelBackend;

use crate::summary::BackendKind;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        BackendError::Request(error.to_string())
    }
}

#[async_trait]
pub trait SummaryBackend: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// Short name for logs
    fn name(&self) -> &str;

    async fn try_summarize(&self, text: &str) -> Result<Option<String>, BackendError>;
}

/// Keep only answers with visible content
pub(crate) fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Error bodies can be whole HTML pages; keep logs readable
pub(crate) fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
