//! Browser module tests
//!
//! Configuration, navigation options, and URL validation. Launching a real
//! browser needs Chrome/Chromium, so those paths are only covered by the
//! ignored test at the bottom.

use scrapewise::browser::{BrowserConfig, NavigationOptions, NavigationResult, UrlValidator};
use scrapewise::config::Config;

#[test]
fn test_browser_config_default() {
    let config = BrowserConfig::default();
    assert!(config.headless);
    assert_eq!(config.width, 1920);
    assert_eq!(config.height, 1080);
    assert!(!config.sandbox);
    assert_eq!(config.timeout_ms, 30000);
    assert!(config.user_agent.is_none());
    assert!(config.chrome_path.is_none());
    assert!(config.extra_args.contains(&"--disable-dev-shm-usage".to_string()));
}

#[test]
fn test_browser_config_builder() {
    let config = BrowserConfig::builder()
        .headless(false)
        .viewport(1280, 720)
        .sandbox(true)
        .user_agent("TestBot/1.0")
        .timeout_ms(60000)
        .chrome_path("/usr/bin/chromium")
        .arg("--no-first-run")
        .build();

    assert!(!config.headless);
    assert_eq!(config.width, 1280);
    assert_eq!(config.height, 720);
    assert!(config.sandbox);
    assert_eq!(config.user_agent.as_deref(), Some("TestBot/1.0"));
    assert_eq!(config.timeout_ms, 60000);
    assert_eq!(config.chrome_path.as_deref(), Some("/usr/bin/chromium"));
    assert_eq!(config.extra_args.last().map(String::as_str), Some("--no-first-run"));
}

#[test]
fn test_browser_config_from_app_config() {
    let app = Config {
        headless: false,
        timeout_secs: 12,
        user_agent: "Scraper/2.0".to_string(),
        ..Config::default()
    };
    let config = BrowserConfig::from_app_config(&app);

    assert!(!config.headless);
    assert_eq!(config.timeout_ms, 12_000);
    assert_eq!(config.user_agent.as_deref(), Some("Scraper/2.0"));
}

#[test]
fn test_navigation_options_default() {
    let opts = NavigationOptions::default();
    assert_eq!(opts.timeout_ms, 30000);
    assert_eq!(opts.ready_timeout_ms, 10000);
    assert_eq!(opts.settle_ms, 2000);
    assert_eq!(opts.retries, 1);
    assert_eq!(opts.retry_delay_ms, 1000);
}

#[test]
fn test_navigation_result_structure() {
    let result = NavigationResult {
        final_url: "https://example.com/redirected".to_string(),
        title: Some("Example Page".to_string()),
        duration_ms: 1500,
    };

    assert_eq!(result.final_url, "https://example.com/redirected");
    assert_eq!(result.title.as_deref(), Some("Example Page"));
    assert_eq!(result.duration_ms, 1500);
}

#[test]
fn test_url_validator_accepts_web_urls() {
    let url = UrlValidator::validate("  https://example.com/products?page=2 ").unwrap();
    assert_eq!(url.host_str(), Some("example.com"));
    assert!(UrlValidator::validate("http://localhost:8000/").is_ok());
}

#[test]
fn test_url_validator_rejects() {
    for bad in [
        "",
        "   ",
        "example.com",
        "ftp://example.com/file",
        "file:///etc/passwd",
        "javascript:alert(1)",
        "http://",
    ] {
        assert!(UrlValidator::validate(bad).is_err(), "{bad:?} should be rejected");
    }

    let long = format!("https://example.com/{}", "a".repeat(2100));
    let err = UrlValidator::validate(&long).unwrap_err();
    assert!(err.to_string().contains("maximum length"));
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium"]
async fn test_browser_fetch_renders_page() {
    use scrapewise::fetch::{BrowserFetcher, PageFetcher};

    let fetcher = BrowserFetcher::new(BrowserConfig::default());
    let html = fetcher.fetch("https://example.com").await.unwrap();
    assert!(html.contains("Example Domain"));
}
