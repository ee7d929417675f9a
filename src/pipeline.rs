//! Verify → fetch → extract → summarize.
//!
//! Each run is an independent future. The only state shared between runs is
//! the read-only [`SummarizationEngine`], so runs can be spawned freely; dropping
//! a run's future cancels its in-flight requests without touching other runs.

use crate::auth::{self, AuthError, SignatureVerifier};
use crate::config::Config;
use crate::engine::{SummarizationEngine, SummarizationError};
use crate::scraper::{ContentFetcher, FetchError, HttpTransport, ReqwestTransport};
use crate::storage::{NewSummary, StorageError, StoredSummary, SummaryStore};
use crate::summary::ArticleContent;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

/// Progress of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unverified,
    Verified,
    Fetched,
    Extracted,
    Summarized,
    Done,
}

impl Stage {
    fn advance(self) -> Stage {
        let next = match self {
            Stage::Unverified => Stage::Verified,
            Stage::Verified => Stage::Fetched,
            Stage::Fetched => Stage::Extracted,
            Stage::Extracted => Stage::Summarized,
            Stage::Summarized | Stage::Done => Stage::Done,
        };
        tracing::debug!(from = ?self, to = ?next, "pipeline stage");
        next
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("signature verification failed: {0}")]
    Auth(#[from] AuthError),
    #[error("invalid signature for wallet {0}")]
    InvalidSignature(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("summarization failed: {0}")]
    Summarization(#[from] SummarizationError),
    #[error("failed to persist summary: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to initialize pipeline: {0}")]
    Setup(String),
}

impl PipelineError {
    /// The last stage reached before the failure
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Auth(_) | PipelineError::InvalidSignature(_) | PipelineError::Setup(_) => {
                Stage::Unverified
            }
            PipelineError::Fetch(_) => Stage::Verified,
            PipelineError::Summarization(_) => Stage::Extracted,
            PipelineError::Storage(_) => Stage::Summarized,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, PipelineError::Auth(_) | PipelineError::InvalidSignature(_))
    }

    /// HTTP status an API layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Auth(_) | PipelineError::InvalidSignature(_) => 401,
            PipelineError::Fetch(e) if e.is_client_error() => 400,
            PipelineError::Fetch(_) => 500,
            PipelineError::Summarization(_) | PipelineError::Storage(_) | PipelineError::Setup(_) => 500,
        }
    }
}

/// Result of a successful run, ready to hand to a [`SummaryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub wallet_address: String,
    pub url: String,
    pub title: Option<String>,
    pub original_text: String,
    pub summary_text: String,
}

impl From<PipelineOutput> for NewSummary {
    fn from(output: PipelineOutput) -> Self {
        NewSummary {
            wallet_address: output.wallet_address,
            article_url: output.url,
            original_content: output.original_text,
            summary_content: output.summary_text,
        }
    }
}

pub struct Pipeline<T = ReqwestTransport> {
    verifier: SignatureVerifier,
    fetcher: ContentFetcher<T>,
    engine: Arc<SummarizationEngine>,
}

impl Pipeline<ReqwestTransport> {
    /// Build the network-backed pipeline; backends are chosen here, once
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let fetcher = ContentFetcher::from_config(&config.fetch)?;
        let engine = SummarizationEngine::from_config(config)
            .map_err(|e| PipelineError::Setup(e.to_string()))?;
        if let Some(provider) = &config.web3.provider_url {
            tracing::debug!(%provider, "web3 provider configured; addresses are checksummed locally");
        }
        Ok(Self::new(SignatureVerifier::new(), fetcher, Arc::new(engine)))
    }
}

impl<T: HttpTransport> Pipeline<T> {
    pub fn new(
        verifier: SignatureVerifier,
        fetcher: ContentFetcher<T>,
        engine: Arc<SummarizationEngine>,
    ) -> Self {
        Self {
            verifier,
            fetcher,
            engine,
        }
    }

    pub fn engine(&self) -> &Arc<SummarizationEngine> {
        &self.engine
    }

    /// The message users sign to authenticate
    pub fn message_to_sign(&self) -> &'static str {
        auth::message_to_sign()
    }

    /// Check the signature only; used when the caller wants extraction without a summary
    pub fn authenticate(&self, wallet_address: &str, signature: &str) -> Result<(), PipelineError> {
        if self.verifier.verify(wallet_address, signature)? {
            Ok(())
        } else {
            tracing::warn!(wallet = wallet_address, "invalid signature");
            Err(PipelineError::InvalidSignature(wallet_address.to_string()))
        }
    }

    /// Authenticate, fetch and extract without summarizing
    pub async fn extract_only(
        &self,
        wallet_address: &str,
        signature: &str,
        url: &str,
    ) -> Result<ArticleContent, PipelineError> {
        self.authenticate(wallet_address, signature)?;
        Ok(self.fetcher.fetch_content(url).await?)
    }

    /// Run every stage for one request
    pub async fn run(
        &self,
        wallet_address: &str,
        signature: &str,
        url: &str,
    ) -> Result<PipelineOutput, PipelineError> {
        let span = tracing::info_span!("pipeline", wallet = wallet_address, url);
        self.run_stages(wallet_address, signature, url)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        wallet_address: &str,
        signature: &str,
        url: &str,
    ) -> Result<PipelineOutput, PipelineError> {
        tracing::info!("summarize request received");
        let stage = Stage::Unverified;

        self.authenticate(wallet_address, signature)?;
        let stage = stage.advance();

        let content = self.fetcher.fetch_content(url).await?;
        let stage = stage.advance().advance();

        tracing::info!(chars = content.text.chars().count(), "generating summary");
        let summary = self.engine.summarize(&content.text).await?;
        let stage = stage.advance();

        let stage = stage.advance();
        tracing::info!(?stage, "pipeline finished");
        Ok(PipelineOutput {
            wallet_address: wallet_address.to_string(),
            url: url.to_string(),
            title: content.title,
            original_text: content.text,
            summary_text: summary,
        })
    }

    /// Run the pipeline and persist the result; nothing is stored on failure
    pub async fn run_and_store<S>(
        &self,
        store: &S,
        wallet_address: &str,
        signature: &str,
        url: &str,
    ) -> Result<StoredSummary, PipelineError>
    where
        S: SummaryStore + ?Sized,
    {
        let output = self.run(wallet_address, signature, url).await?;
        tracing::info!("storing summary");
        let stored = store.store(output.into()).await?;
        tracing::info!(id = stored.id, "summary created");
        Ok(stored)
    }
}
