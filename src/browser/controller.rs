//! Launching and shutting down Chromium

use crate::config::Config;
use crate::error::{BrowserError, Error, Result};
use super::navigation::{NavigationOptions, PageNavigator};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width (default: 1920)
    pub width: u32,
    /// Browser window height (default: 1080)
    pub height: u32,
    /// Enable sandbox (default: false, most scraping hosts are containers)
    pub sandbox: bool,
    /// User agent string (None = use default)
    pub user_agent: Option<String>,
    /// Navigation timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1920,
            height: 1080,
            sandbox: false,
            user_agent: None,
            timeout_ms: 30000,
            chrome_path: None,
            extra_args: vec![
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Browser settings derived from the application config
    pub fn from_app_config(config: &Config) -> Self {
        Self::builder()
            .headless(config.headless)
            .user_agent(config.user_agent.clone())
            .timeout_ms(config.timeout_secs * 1000)
            .build()
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set user agent
    pub fn user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    /// Set navigation timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// An open tab in a [`BrowserController`]
pub struct PageHandle {
    pub(crate) page: Page,
}

/// A launched Chromium process and the task draining its CDP events
pub struct BrowserController {
    browser: Browser,
    handler: JoinHandle<()>,
    config: BrowserConfig,
}

impl BrowserController {
    /// Launch a browser configured by `config`
    #[instrument(skip(config), fields(headless = config.headless))]
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let cdp_config = cdp_config(&config)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("Browser handler event error");
                    break;
                }
            }
            debug!("Browser handler finished");
        });

        info!("Browser launched");
        Ok(Self {
            browser,
            handler,
            config,
        })
    }

    /// Open a blank tab
    pub async fn new_page(&self) -> Result<PageHandle> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
        Ok(PageHandle { page })
    }

    /// Open a tab and load `url` into it
    #[instrument(skip(self))]
    pub async fn navigate(&self, url: &str) -> Result<PageHandle> {
        let page = self.new_page().await?;
        let options = NavigationOptions {
            timeout_ms: self.config.timeout_ms,
            ..Default::default()
        };
        PageNavigator::goto(&page, url, Some(options)).await?;
        Ok(page)
    }

    /// Load `url` and return the rendered HTML
    pub async fn render(&self, url: &str) -> Result<String> {
        let page = self.navigate(url).await?;
        PageNavigator::html(&page).await
    }

    /// Shut the browser down, waiting briefly for the event task
    #[instrument(skip(self))]
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        if tokio::time::timeout(Duration::from_secs(5), self.handler)
            .await
            .is_err()
        {
            warn!("Browser handler did not stop within 5s");
        }

        info!("Browser closed");
        Ok(())
    }
}

fn cdp_config(config: &BrowserConfig) -> Result<CdpBrowserConfig> {
    let mut builder = CdpBrowserConfig::builder()
        .viewport(Viewport {
            width: config.width,
            height: config.height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(config.width, config.height)
        .request_timeout(Duration::from_millis(config.timeout_ms));

    // chromiumoxide launches headless unless asked for a window
    if !config.headless {
        builder = builder.with_head();
    }
    if !config.sandbox {
        builder = builder.no_sandbox();
    }
    if let Some(ua) = &config.user_agent {
        builder = builder.arg(format!("--user-agent={}", ua));
    }
    if let Some(path) = &config.chrome_path {
        builder = builder.chrome_executable(path);
    }
    for arg in &config.extra_args {
        builder = builder.arg(arg.as_str());
    }

    builder
        .build()
        .map_err(|e| BrowserError::ConfigError(e).into())
}
