//! Link extraction
//!
//! This module extracts labelled links from page HTML and classifies them
//! relative to the page they were found on.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Type of link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Internal link (same host)
    Internal,
    /// External link (different host)
    External,
    /// Anchor link (same page)
    Anchor,
    /// mailto: link
    Email,
    /// tel: link
    Phone,
    /// JavaScript link
    JavaScript,
    /// Other/unknown
    Other,
}

impl LinkType {
    /// Classify an href as found on the page at `base`
    pub fn classify(href: &str, base: Option<&Url>) -> Self {
        let lower = href.trim().to_ascii_lowercase();
        if lower.starts_with('#') {
            return LinkType::Anchor;
        }
        if lower.starts_with("mailto:") {
            return LinkType::Email;
        }
        if lower.starts_with("tel:") {
            return LinkType::Phone;
        }
        if lower.starts_with("javascript:") {
            return LinkType::JavaScript;
        }

        let resolved = match base {
            Some(base) => base.join(href.trim()),
            None => Url::parse(href.trim()),
        };
        match resolved {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                match (base.and_then(Url::host_str), url.host_str()) {
                    (Some(page_host), Some(host)) if page_host.eq_ignore_ascii_case(host) => {
                        LinkType::Internal
                    }
                    (_, Some(_)) => LinkType::External,
                    _ => LinkType::Other,
                }
            }
            _ => LinkType::Other,
        }
    }
}

/// An extracted link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLink {
    /// The href as written in the page
    pub href: String,
    /// The href resolved against the page URL when possible
    pub url: String,
    /// Link text content
    pub text: String,
    /// Title attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Type of link
    pub link_type: LinkType,
    /// Whether it opens in a new tab
    pub new_tab: bool,
    /// Position among the reported links
    pub position: usize,
}

/// Link extraction functionality
pub struct LinkExtractor;

impl LinkExtractor {
    /// Extract every `a[href]` that has both a non-empty href and visible text
    pub fn extract(html: &str, base: Option<&Url>) -> Vec<ExtractedLink> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("a[href]").expect("static selector");

        let links: Vec<ExtractedLink> = document
            .select(&selector)
            .filter_map(|el| {
                let href = el.value().attr("href")?.trim();
                let text = el.text().collect::<String>();
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if href.is_empty() || text.is_empty() {
                    return None;
                }
                let link_type = LinkType::classify(href, base);
                let url = match (link_type, base) {
                    (LinkType::Internal | LinkType::External | LinkType::Other, Some(base)) => base
                        .join(href)
                        .map(|u| u.to_string())
                        .unwrap_or_else(|_| href.to_string()),
                    _ => href.to_string(),
                };
                Some(ExtractedLink {
                    href: href.to_string(),
                    url,
                    text,
                    title: el
                        .value()
                        .attr("title")
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from),
                    link_type,
                    new_tab: el.value().attr("target") == Some("_blank"),
                    position: 0,
                })
            })
            .enumerate()
            .map(|(position, link)| ExtractedLink { position, ..link })
            .collect();

        debug!("Extracted {} links", links.len());
        links
    }

    /// Only links of the given type
    pub fn extract_of_type(html: &str, base: Option<&Url>, link_type: LinkType) -> Vec<ExtractedLink> {
        Self::extract(html, base)
            .into_iter()
            .filter(|l| l.link_type == link_type)
            .collect()
    }
}
