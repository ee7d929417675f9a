//! # Summa Web3
//!
//! Wallet-authenticated article summarisation.
//!
//! ## Features
//!
//! - **Wallet Auth**: `personal_sign` signatures over a fixed message, recovered with k256
//! - **Resilient Fetching**: bounded, non-blocking retries for timeouts and 5xx responses
//! - **Fallback Summaries**: primary LLM, hosted inference API, local model, extractive heuristic
//! - **Storage**: sled-backed summary history per wallet

pub mod auth;
pub mod backends;
pub mod config;
pub mod engine;
pub mod extract;
pub mod logging;
pub mod pipeline;
pub mod scraper;
pub mod storage;
pub mod summary;

pub use auth::{message_to_sign, SignatureVerifier};
pub use config::Config;
pub use engine::SummarizationEngine;
pub use pipeline::{Pipeline, PipelineError, PipelineOutput, Stage};
pub use storage::{Storage, StoredSummary, SummaryStore};
pub use summary::{ArticleContent, BackendKind};
