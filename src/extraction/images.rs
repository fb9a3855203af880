//! Image extraction

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// An `<img>` found in the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// `src` as written
    pub src: String,
    /// `src` resolved against the page URL when possible
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

/// Image extraction functionality
pub struct ImageExtractor;

impl ImageExtractor {
    /// Every `img[src]` in document order
    pub fn extract(html: &str, base: Option<&Url>) -> Vec<ExtractedImage> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("img[src]").expect("static selector");
        let attr = |el: &scraper::ElementRef<'_>, name: &str| {
            el.value()
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        document
            .select(&selector)
            .filter_map(|el| {
                let src = attr(&el, "src")?;
                let url = base
                    .and_then(|b| b.join(&src).ok())
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| src.clone());
                Some(ExtractedImage {
                    url,
                    alt: attr(&el, "alt"),
                    title: attr(&el, "title"),
                    width: attr(&el, "width"),
                    height: attr(&el, "height"),
                    src,
                })
            })
            .collect()
    }
}
