//! HTML to text cleaning
//!
//! Turns raw page HTML into the plain text that is handed to the model:
//! boilerplate subtrees are dropped, each text node becomes one or more
//! lines, lines are trimmed and internal whitespace runs collapsed, and
//! blank lines are removed.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// Subtrees dropped before page text is collected
pub const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript",
];

/// Subtrees dropped by the body-only cleaner
pub const CODE_TAGS: &[&str] = &["script", "style"];

fn inline_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s\u{a0}]+").expect("static regex"))
}

/// Content cleaning functionality
pub struct ContentCleaner;

impl ContentCleaner {
    /// Clean a full page: drop boilerplate, keep readable text
    #[instrument(skip(html), fields(html_len = html.len()))]
    pub fn clean(html: &str) -> String {
        let text = Self::text_without(html, BOILERPLATE_TAGS);
        debug!("Cleaned {} bytes of HTML into {} chars", html.len(), text.len());
        text
    }

    /// The `<body>` element's outer HTML, or an empty string
    pub fn extract_body(html: &str) -> String {
        let document = Html::parse_document(html);
        let body = Selector::parse("body").expect("static selector");
        document
            .select(&body)
            .next()
            .map(|el| el.html())
            .unwrap_or_default()
    }

    /// Body text with only scripts and styles removed
    pub fn clean_body(html: &str) -> String {
        let body = Self::extract_body(html);
        if body.is_empty() {
            return String::new();
        }
        Self::text_without(&body, CODE_TAGS)
    }

    /// Normalize already-extracted text the same way page text is normalized
    pub fn normalize_text(text: &str) -> String {
        let mut lines = Vec::new();
        push_lines(&mut lines, text);
        lines.join("\n")
    }

    fn text_without(html: &str, skipped: &[&str]) -> String {
        let document = Html::parse_document(html);
        let mut lines = Vec::new();

        for node in document.tree.root().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let inside_skipped = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| skipped.contains(&el.name()))
            });
            if !inside_skipped {
                push_lines(&mut lines, text);
            }
        }

        lines.join("\n")
    }
}

fn push_lines(lines: &mut Vec<String>, text: &str) {
    for line in text.lines() {
        let collapsed = inline_whitespace().replace_all(line.trim(), " ");
        let collapsed = collapsed.trim();
        if !collapsed.is_empty() {
            lines.push(collapsed.to_string());
        }
    }
}
