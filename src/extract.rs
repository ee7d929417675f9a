//! HTML to plain text.
//!
//! Uses scraper for parsing. Noise elements are skipped while walking the tree,
//! the main content region is picked from a priority list of selectors, and the
//! visible text is normalized line by line. Extraction never fails; malformed
//! markup yields whatever text the parser recovered.

use crate::summary::ArticleContent;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Node, Selector};

/// Subtrees that never contribute article text
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "header", "aside", "iframe",
];

/// Elements that end a line of text
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "tr",
    "section", "figcaption",
];

/// Main-content candidates, most specific first
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    ".article-body",
    ".article-content",
    ".post-content",
    ".entry-content",
    ".content",
    "#content",
    ".post",
    ".article",
];

lazy_static! {
    static ref CANDIDATES: Vec<Selector> = CONTENT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect();
    static ref TITLE: Option<Selector> = Selector::parse("title").ok();
    static ref H1: Option<Selector> = Selector::parse("h1").ok();
    static ref BODY: Option<Selector> = Selector::parse("body").ok();
}

/// Reduce raw HTML to an [`ArticleContent`]
pub fn extract(url: &str, html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    ArticleContent {
        url: url.to_string(),
        title: extract_title(&document),
        text: extract_text(&document),
    }
}

/// Extract the page title from <title> or <h1>
pub fn extract_title(document: &Html) -> Option<String> {
    [TITLE.as_ref(), H1.as_ref()]
        .into_iter()
        .flatten()
        .filter_map(|selector| document.select(selector).next())
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|title| !title.is_empty())
}

/// Extract readable text from the best content region
pub fn extract_text(document: &Html) -> String {
    for selector in CANDIDATES.iter() {
        if let Some(element) = document.select(selector).next() {
            let text = normalize(&visible_text(element));
            if !text.is_empty() {
                tracing::debug!(region = ?selector, "content region selected");
                return text;
            }
        }
    }

    // Fall back to the body, then to the whole document
    if let Some(body) = BODY.as_ref().and_then(|s| document.select(s).next()) {
        let text = normalize(&visible_text(body));
        if !text.is_empty() {
            return text;
        }
    }
    normalize(&visible_text(document.root_element()))
}

/// Concatenate text nodes under `element`, skipping noise subtrees and breaking after blocks
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if NOISE_TAGS.contains(&el.name()) => {}
            Node::Element(el) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
                if BLOCK_TAGS.contains(&el.name()) {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Trim each line, split on double spaces, and keep non-empty fragments one per line
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
