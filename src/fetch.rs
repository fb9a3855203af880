//! Page fetching
//!
//! Two ways to get a page's HTML: a plain HTTP GET for static sites and a
//! headless browser for pages rendered client-side. Both sit behind
//! [`PageFetcher`] so the scraping service can be driven by either.

use crate::browser::{BrowserConfig, BrowserController, UrlValidator};
use crate::config::Config;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// How a page was (or should be) fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    /// Static HTTP GET
    #[default]
    Http,
    /// Headless browser over CDP
    Browser,
    /// Nothing was fetched (failed before fetching)
    None,
}

impl std::fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FetchMethod::Http => "http",
            FetchMethod::Browser => "browser",
            FetchMethod::None => "none",
        };
        f.write_str(s)
    }
}

/// Source of raw page HTML
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Method reported in scrape results
    fn method(&self) -> FetchMethod;

    /// Fetch the page at `url` and return its HTML
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Static fetcher backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the given user agent and timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// Fetcher configured from the application config
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.user_agent, config.timeout())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn method(&self) -> FetchMethod {
        FetchMethod::Http
    }

    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = UrlValidator::validate(url)?;
        debug!("GET {}", parsed);

        let response = self.client.get(parsed.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout.as_secs())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} answered {}", parsed, status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: parsed.to_string(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        debug!("Fetched {} bytes from {}", body.len(), parsed);
        Ok(body)
    }
}

/// Browser fetcher: one browser per fetch, always closed afterwards
#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    config: BrowserConfig,
}

impl BrowserFetcher {
    /// Create a browser fetcher
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Fetcher configured from the application config
    pub fn from_config(config: &Config) -> Self {
        Self::new(BrowserConfig::from_app_config(config))
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn method(&self) -> FetchMethod {
        FetchMethod::Browser
    }

    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        UrlValidator::validate(url)?;

        let controller = BrowserController::launch(self.config.clone()).await?;
        let html = controller.render(url).await;

        if let Err(e) = controller.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }

        let html = html?;
        info!("Rendered {} bytes from {}", html.len(), url);
        Ok(html)
    }
}
