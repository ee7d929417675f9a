//! Summarization engine: an ordered fallback chain of backends.
//!
//! The chain is chosen once from [`Config`] and never changes afterwards, so a
//! single engine can be shared (behind an `Arc`) by any number of concurrent
//! pipeline runs. The last backend in every chain is the extractive one, which
//! always produces an answer for non-blank text.

use crate::backends::{
    AgentBackend, BackendError, ExtractiveBackend, HuggingFaceBackend, LocalModelBackend,
    SummaryBackend,
};
use crate::config::Config;
use crate::summary::{chunk_text, truncate_chars, BackendKind, Chunk, SummaryResult};
use futures::future::join_all;
use thiserror::Error;

pub const DEFAULT_MAX_INPUT_LENGTH: usize = 1500;
pub const DEFAULT_CHUNK_SIZE: usize = 3000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummarizationError {
    #[error("nothing to summarize: article text is empty")]
    EmptyInput,
    #[error("every summarization backend failed for chunk {chunk}")]
    Exhausted { chunk: usize },
}

/// How text is handed to the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// One request with the whole (truncated) text
    Whole,
    /// Fixed-size windows summarized independently and joined in order
    Chunked { chunk_size: usize },
}

#[derive(Debug)]
pub struct SummarizationEngine {
    chain: Vec<Box<dyn SummaryBackend>>,
    dispatch: Dispatch,
    max_input_length: usize,
}

impl SummarizationEngine {
    /// Build an engine over `chain`, appending the extractive backend unless it is already last
    pub fn new(mut chain: Vec<Box<dyn SummaryBackend>>, dispatch: Dispatch) -> Self {
        let terminal = chain
            .last()
            .map(|b| b.kind() == BackendKind::Extractive)
            .unwrap_or(false);
        if !terminal {
            chain.push(Box::new(ExtractiveBackend::new()));
        }
        Self {
            chain,
            dispatch,
            max_input_length: DEFAULT_MAX_INPUT_LENGTH,
        }
    }

    /// Extractive-only engine used when no remote backend is configured
    pub fn mock() -> Self {
        Self::new(Vec::new(), Dispatch::Whole)
    }

    pub fn with_max_input_length(mut self, max_input_length: usize) -> Self {
        self.max_input_length = max_input_length;
        self
    }

    /// Select backends from configured credentials.
    ///
    /// Primary key: primary then extractive, whole text. Otherwise a secondary
    /// key: secondary, optional local model, extractive, chunked. Otherwise
    /// extractive only.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let engine = if let Some(primary) = AgentBackend::from_config(config)? {
            tracing::info!(backend = primary.name(), "using primary remote backend for summarization");
            Self::new(vec![Box::new(primary)], Dispatch::Whole)
        } else if let Some(secondary) = HuggingFaceBackend::from_config(config)? {
            tracing::info!(model = secondary.name(), "using inference API for summarization");
            let mut chain: Vec<Box<dyn SummaryBackend>> = vec![Box::new(secondary)];
            match LocalModelBackend::from_config(config)? {
                Some(local) => {
                    tracing::info!(model = local.name(), "local model fallback enabled");
                    chain.push(Box::new(local));
                }
                None => tracing::warn!("no local model configured, falling back to extractive summaries"),
            }
            Self::new(
                chain,
                Dispatch::Chunked {
                    chunk_size: config.summarizer.chunk_size,
                },
            )
        } else {
            tracing::warn!("no API keys found for a remote backend, using extractive summarizer");
            Self::mock()
        };

        Ok(engine.with_max_input_length(config.summarizer.max_input_length))
    }

    /// Backend kinds in fallback order
    pub fn backends(&self) -> Vec<BackendKind> {
        self.chain.iter().map(|b| b.kind()).collect()
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    pub fn max_input_length(&self) -> usize {
        self.max_input_length
    }

    /// Summarize `text`, truncated to the configured maximum input length
    pub async fn summarize(&self, text: &str) -> Result<String, SummarizationError> {
        self.summarize_with(text, self.max_input_length).await
    }

    /// Summarize with an explicit truncation limit
    pub async fn summarize_with(
        &self,
        text: &str,
        max_input_length: usize,
    ) -> Result<String, SummarizationError> {
        if text.trim().is_empty() {
            return Err(SummarizationError::EmptyInput);
        }
        let text = truncate_chars(text, max_input_length);

        match self.dispatch {
            Dispatch::Whole => {
                let chunk = Chunk {
                    index: 0,
                    text: text.to_string(),
                };
                Ok(self.summarize_chunk(&chunk).await?.text)
            }
            Dispatch::Chunked { chunk_size } => {
                let chunks: Vec<Chunk> = chunk_text(text, chunk_size)
                    .into_iter()
                    .filter(|c| !c.text.trim().is_empty())
                    .collect();
                tracing::debug!(chunks = chunks.len(), chunk_size, "summarizing in chunks");

                // join_all yields results in input order, whatever order they finish in
                let results = join_all(chunks.iter().map(|c| self.summarize_chunk(c))).await;
                let summaries = results.into_iter().collect::<Result<Vec<_>, _>>()?;

                let joined = summaries
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(joined.trim().to_string())
            }
        }
    }

    /// Run one chunk through the chain until a backend answers
    pub async fn summarize_chunk(&self, chunk: &Chunk) -> Result<SummaryResult, SummarizationError> {
        for backend in &self.chain {
            match backend.try_summarize(&chunk.text).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    tracing::debug!(chunk = chunk.index, backend = %backend.kind(), "chunk summarized");
                    return Ok(SummaryResult {
                        text,
                        backend: backend.kind(),
                    });
                }
                Ok(_) => {
                    tracing::warn!(chunk = chunk.index, backend = backend.name(), "backend returned no summary");
                }
                Err(e) => {
                    tracing::warn!(chunk = chunk.index, backend = backend.name(), error = %e, "backend failed");
                }
            }
        }
        Err(SummarizationError::Exhausted { chunk: chunk.index })
    }
}
