//! Scraping service
//!
//! Fetch, analyze, and clean one page, or a batch of pages with bounded
//! parallelism. Failures never escape as `Err`: they come back as a
//! [`ScrapeResult`] with `success == false` and an error message.

use crate::browser::UrlValidator;
use crate::config::Config;
use crate::error::{Error, ExtractionError, Result};
use crate::extraction::{
    ContentCleaner, DomAnalysis, DomAnalyzer, ExtractedImage, ExtractedLink, ImageExtractor,
    LinkExtractor,
};
use crate::fetch::{BrowserFetcher, FetchMethod, HttpFetcher, PageFetcher};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Per-request scraping options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeOptions {
    /// Fetch with a browser instead of a plain GET
    #[serde(default)]
    pub method: FetchMethod,
    /// Include labelled links in the result
    #[serde(default)]
    pub extract_links: bool,
    /// Include images in the result
    #[serde(default)]
    pub extract_images: bool,
}

impl ScrapeOptions {
    /// Options using the given fetch method
    pub fn with_method(method: FetchMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }
}

/// Size summary of a successful scrape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeMetadata {
    /// Characters of cleaned text
    pub content_length: usize,
    /// Characters of raw HTML
    pub raw_length: usize,
    pub elements_count: usize,
    pub links_count: usize,
    pub images_count: usize,
}

/// Outcome of scraping one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub success: bool,
    pub url: String,
    /// Cleaned page text
    pub content: String,
    /// HTML as fetched
    pub raw_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_analysis: Option<DomAnalysis>,
    pub extracted_links: Vec<ExtractedLink>,
    pub extracted_images: Vec<ExtractedImage>,
    /// Wall time in seconds
    pub processing_time: f64,
    pub method: FetchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ScrapeMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResult {
    /// Failed result for `url`
    pub fn failure(url: &str, method: FetchMethod, error: &Error, started: Instant) -> Self {
        Self {
            success: false,
            url: url.to_string(),
            content: String::new(),
            raw_content: String::new(),
            dom_analysis: None,
            extracted_links: Vec::new(),
            extracted_images: Vec::new(),
            processing_time: started.elapsed().as_secs_f64(),
            method,
            metadata: None,
            error: Some(error.to_string()),
        }
    }
}

/// Static description of the scraping service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingInfo {
    pub status: String,
    pub methods: Vec<FetchMethod>,
    pub features: Vec<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
}

/// Scraping service
#[derive(Clone)]
pub struct ScrapingService {
    http: Arc<dyn PageFetcher>,
    browser: Arc<dyn PageFetcher>,
    user_agent: String,
    timeout_secs: u64,
}

impl ScrapingService {
    /// Service with the real HTTP and browser fetchers
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = HttpFetcher::from_config(config)?;
        let browser = BrowserFetcher::from_config(config);
        info!("Scraping service initialized");
        Ok(Self {
            http: Arc::new(http),
            browser: Arc::new(browser),
            user_agent: config.user_agent.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Service with caller-supplied fetchers
    pub fn with_fetchers(
        http: Arc<dyn PageFetcher>,
        browser: Arc<dyn PageFetcher>,
        config: &Config,
    ) -> Self {
        Self {
            http,
            browser,
            user_agent: config.user_agent.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    fn fetcher(&self, method: FetchMethod) -> &Arc<dyn PageFetcher> {
        match method {
            FetchMethod::Browser => &self.browser,
            FetchMethod::Http | FetchMethod::None => &self.http,
        }
    }

    /// Scrape one URL
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn scrape(&self, url: &str, options: &ScrapeOptions) -> ScrapeResult {
        let started = Instant::now();
        let url = url.trim();

        let parsed = match UrlValidator::validate(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                let e = Error::from(e);
                error!("Failed to scrape {:?}: {}", url, e);
                return ScrapeResult::failure(url, FetchMethod::None, &e, started);
            }
        };

        let fetcher = self.fetcher(options.method);
        let method = fetcher.method();

        let raw = match fetcher.fetch(parsed.as_str()).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to scrape {}: {}", url, e);
                return ScrapeResult::failure(url, method, &e, started);
            }
        };

        let content = ContentCleaner::clean(&raw);
        if content.is_empty() {
            let e = Error::from(ExtractionError::NoContent(url.to_string()));
            error!("Failed to scrape {}: {}", url, e);
            return ScrapeResult::failure(url, method, &e, started);
        }

        let dom = DomAnalyzer::analyze(&raw);
        let extracted_links = if options.extract_links {
            LinkExtractor::extract(&raw, Some(&parsed))
        } else {
            Vec::new()
        };
        let extracted_images = if options.extract_images {
            ImageExtractor::extract(&raw, Some(&parsed))
        } else {
            Vec::new()
        };

        let metadata = ScrapeMetadata {
            content_length: content.chars().count(),
            raw_length: raw.chars().count(),
            elements_count: dom.total_elements,
            links_count: dom.links,
            images_count: dom.images,
        };
        let processing_time = started.elapsed().as_secs_f64();

        info!(
            "Successfully scraped {} in {:.2}s using {}",
            url, processing_time, method
        );

        ScrapeResult {
            success: true,
            url: url.to_string(),
            content,
            raw_content: raw,
            dom_analysis: Some(dom),
            extracted_links,
            extracted_images,
            processing_time,
            method,
            metadata: Some(metadata),
            error: None,
        }
    }

    /// Scrape several URLs, at most `max_concurrent` at a time; results keep
    /// input order
    #[instrument(skip(self, urls, options), fields(count = urls.len()))]
    pub async fn scrape_many(
        &self,
        urls: &[String],
        options: &ScrapeOptions,
        max_concurrent: usize,
    ) -> Vec<ScrapeResult> {
        let results: Vec<ScrapeResult> = stream::iter(urls.to_vec())
            .map(|url| async move { self.scrape(&url, options).await })
            .buffered(max_concurrent.max(1))
            .collect()
            .await;

        let ok = results.iter().filter(|r| r.success).count();
        info!("Batch finished: {}/{} succeeded", ok, results.len());
        results
    }

    /// Static description of the service
    pub fn info(&self) -> ScrapingInfo {
        ScrapingInfo {
            status: "operational".to_string(),
            methods: vec![FetchMethod::Http, FetchMethod::Browser],
            features: [
                "dom_analysis",
                "content_cleaning",
                "link_extraction",
                "image_extraction",
                "structure_quality_assessment",
                "batch_scraping",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            user_agent: self.user_agent.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}
