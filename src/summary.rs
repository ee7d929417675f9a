//! Data carried between pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text recovered from a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    /// The original URL
    pub url: String,
    /// Page title, when the page has one
    pub title: Option<String>,
    /// Normalized plain text
    pub text: String,
}

/// A fixed-size window of article text; chunks are joined in `index` order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Which strategy produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    PrimaryRemote,
    SecondaryRemote,
    LocalModel,
    Extractive,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::PrimaryRemote => "primary-remote",
            BackendKind::SecondaryRemote => "secondary-remote",
            BackendKind::LocalModel => "local-model",
            BackendKind::Extractive => "extractive",
        };
        f.write_str(name)
    }
}

/// Summary of one chunk and the backend that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub text: String,
    pub backend: BackendKind,
}

/// Hard cut to the first `max_chars` characters.
///
/// Not sentence aware: the cut may land mid-word.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Split text into consecutive windows of `size` characters, no overlap
pub fn chunk_text(text: &str, size: usize) -> Vec<Chunk> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (byte_idx, _) in text.char_indices() {
        if count == size {
            chunks.push(Chunk {
                index: chunks.len(),
                text: text[start..byte_idx].to_string(),
            });
            start = byte_idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(Chunk {
            index: chunks.len(),
            text: text[start..].to_string(),
        });
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_exact_prefix() {
        let text = "a".repeat(2000);
        assert_eq!(truncate_chars(&text, 1500).len(), 1500);
        assert_eq!(truncate_chars("short", 1500), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let text = "é".repeat(10);
        let cut = truncate_chars(&text, 4);
        assert_eq!(cut.chars().count(), 4);
        assert_eq!(cut, "éééé");
    }

    #[test]
    fn chunks_are_fixed_windows_in_order() {
        let text = format!("{}{}{}", "a".repeat(3000), "b".repeat(3000), "c".repeat(10));
        let chunks = chunk_text(&text, 3000);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].index, 0);
        assert!(chunks[0].text.chars().all(|c| c == 'a'));
        assert_eq!(chunks[1].text.len(), 3000);
        assert_eq!(chunks[2].text, "c".repeat(10));

        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rejoined, text);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("", 3000).is_empty());
        assert_eq!(chunk_text("abc", 3000).len(), 1);
    }
}
