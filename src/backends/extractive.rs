//! Extractive fallback: first, middle and last sentence.
//!
//! Deterministic and offline. It also serves as the whole engine when no
//! remote backend is configured.

use super::{BackendError, SummaryBackend};
use crate::summary::BackendKind;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveBackend;

impl ExtractiveBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Pick the first, middle and last sentences when there are more than three.
///
/// Sentences are split on ". " only, so abbreviations and other punctuation
/// are not treated specially.
pub fn summarize(text: &str) -> String {
    let sentences: Vec<&str> = text.split(". ").collect();
    if sentences.len() <= 3 {
        return text.to_string();
    }

    let picked = [
        sentences[0],
        sentences[sentences.len() / 2],
        sentences[sentences.len() - 1],
    ];
    let mut summary = picked.join(". ");
    if !summary.ends_with('.') {
        summary.push('.');
    }
    summary
}

#[async_trait]
impl SummaryBackend for ExtractiveBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Extractive
    }

    fn name(&self) -> &str {
        "extractive"
    }

    async fn try_summarize(&self, text: &str) -> Result<Option<String>, BackendError> {
        Ok(Some(summarize(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_middle_last() {
        assert_eq!(summarize("S1. S2. S3. S4. S5."), "S1. S3. S5.");
        // Even count: floor of the midpoint
        assert_eq!(summarize("A. B. C. D"), "A. C. D.");
    }

    #[test]
    fn short_text_is_unchanged() {
        for text in ["", "One sentence", "One. Two", "One. Two. Three"] {
            assert_eq!(summarize(text), text);
        }
    }

    #[test]
    fn result_has_three_sentences_and_trailing_period() {
        let text = (1..=10).map(|i| format!("Sentence {}", i)).collect::<Vec<_>>().join(". ");
        let summary = summarize(&text);
        assert_eq!(summary, "Sentence 1. Sentence 6. Sentence 10.");
        assert_eq!(summary.split(". ").count(), 3);
    }

    #[tokio::test]
    async fn backend_always_answers() {
        let backend = ExtractiveBackend::new();
        let out = backend.try_summarize("x. y. z. w. v").await.unwrap();
        assert_eq!(out.as_deref(), Some("x. z. v."));
        assert_eq!(backend.kind(), BackendKind::Extractive);
    }
}
