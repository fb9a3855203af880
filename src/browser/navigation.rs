//! Page navigation functionality
//!
//! Navigation with timeout and retry handling, plus the URL checks shared
//! with the static HTTP fetcher.

use crate::browser::PageHandle;
use crate::error::{Error, NavigationError, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Maximum URL length accepted for scraping
pub const MAX_URL_LENGTH: usize = 2048;

/// Options for page navigation
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// How long to wait for the `body` element (default: 10000)
    pub ready_timeout_ms: u64,
    /// Extra delay after `body` appears, for client-side rendering (default: 2000)
    pub settle_ms: u64,
    /// Number of retry attempts (default: 1)
    pub retries: u32,
    /// Delay between retries in ms (default: 1000)
    pub retry_delay_ms: u64,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            ready_timeout_ms: 10000,
            settle_ms: 2000,
            retries: 1,
            retry_delay_ms: 1000,
        }
    }
}

/// Result of a navigation operation
#[derive(Debug)]
pub struct NavigationResult {
    /// Final URL after any redirects
    pub final_url: String,
    /// Page title
    pub title: Option<String>,
    /// Navigation duration in milliseconds
    pub duration_ms: u64,
}

/// URL validation utilities
pub struct UrlValidator;

impl UrlValidator {
    /// Validate a URL for scraping and return it parsed
    pub fn validate(url: &str) -> std::result::Result<url::Url, NavigationError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(NavigationError::InvalidUrl("URL cannot be empty".to_string()));
        }

        if trimmed.len() > MAX_URL_LENGTH {
            return Err(NavigationError::InvalidUrl(format!(
                "URL exceeds maximum length of {} characters",
                MAX_URL_LENGTH
            )));
        }

        let parsed = url::Url::parse(trimmed)
            .map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(NavigationError::InvalidUrl(format!(
                    "unsupported scheme '{}', expected http or https",
                    other
                )))
            }
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(NavigationError::InvalidUrl(format!(
                "{}: missing host",
                trimmed
            )));
        }

        Ok(parsed)
    }
}

/// Page navigator
pub struct PageNavigator;

impl PageNavigator {
    /// Navigate to a URL and wait until the page body is present
    #[instrument(skip(page, options))]
    pub async fn goto(
        page: &PageHandle,
        url: &str,
        options: Option<NavigationOptions>,
    ) -> Result<NavigationResult> {
        let opts = options.unwrap_or_default();
        let start = Instant::now();

        UrlValidator::validate(url)?;

        info!("Navigating to: {}", url);

        let mut last_error = None;
        for attempt in 0..=opts.retries {
            if attempt > 0 {
                warn!("Navigation retry attempt {} of {}", attempt, opts.retries);
                tokio::time::sleep(Duration::from_millis(opts.retry_delay_ms)).await;
            }

            match Self::navigate_once(&page.page, url, &opts).await {
                Ok(mut result) => {
                    result.duration_ms = start.elapsed().as_millis() as u64;
                    return Ok(result);
                }
                Err(e) => {
                    warn!("Navigation attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            NavigationError::LoadFailed("Navigation failed after all retries".to_string()).into()
        }))
    }

    async fn navigate_once(
        page: &chromiumoxide::Page,
        url: &str,
        opts: &NavigationOptions,
    ) -> Result<NavigationResult> {
        let timeout = Duration::from_millis(opts.timeout_ms);

        tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| NavigationError::Timeout(opts.timeout_ms))?
            .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

        Self::wait_for_selector(page, "body", opts.ready_timeout_ms).await?;

        if opts.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(opts.settle_ms)).await;
        }

        let final_url = page
            .url()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .unwrap_or_else(|| url.to_string());

        let title = page.get_title().await.ok().flatten();

        debug!("Navigation complete: {} -> {}", url, final_url);

        Ok(NavigationResult {
            final_url,
            title,
            duration_ms: 0,
        })
    }

    /// Poll until `selector` matches an element or the timeout elapses
    pub async fn wait_for_selector(
        page: &chromiumoxide::Page,
        selector: &str,
        timeout_ms: u64,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(NavigationError::Timeout(timeout_ms).into());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Serialized HTML of the rendered page
    #[instrument(skip(page))]
    pub async fn html(page: &PageHandle) -> Result<String> {
        page.page
            .content()
            .await
            .map_err(|e| Error::cdp(e.to_string()))
    }
}
