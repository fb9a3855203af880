//! Scrapewise - AI-assisted web scraping
//!
//! Fetch a page over plain HTTP or through a headless browser, strip it down
//! to readable text, and ask a locally hosted language model (Ollama) to pull
//! out whatever a natural-language instruction asks for.
//!
//! # Features
//!
//! - **Fetching**: static HTTP via `reqwest`, rendered pages via ChromiumOxide (CDP)
//! - **Cleaning**: boilerplate removal, DOM analysis, link and image extraction
//! - **Extraction**: chunked prompts against a local model with confidence scoring
//! - **Surfaces**: CLI, REST API, and a small web UI
//!
//! # Architecture
//!
//! ```text
//! URL ──▶ ScrapingService ──▶ ContentCleaner ──▶ Chunker ──▶ LanguageModel
//!              │                                                  │
//!        HttpFetcher |                                            ▼
//!        BrowserFetcher                                  ExtractionResult
//!                                                               │
//!                     CLI JSON | REST JSON | Web UI  ◀──────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scrapewise::config::Config;
//! use scrapewise::llm::OllamaClient;
//! use scrapewise::service::{ExtractionService, Pipeline, ScrapeOptions, ScrapingService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let model = Arc::new(OllamaClient::from_config(&config)?);
//!     let pipeline = Pipeline::new(
//!         ScrapingService::from_config(&config)?,
//!         ExtractionService::from_config(model, &config),
//!     );
//!
//!     let result = pipeline
//!         .run("https://example.com", "the page title", &ScrapeOptions::default())
//!         .await;
//!     println!("{}", result.content);
//!     Ok(())
//! }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod chunking;
pub mod config;
pub mod cors;
pub mod error;
pub mod extraction;
pub mod fetch;
pub mod handlers;
pub mod llm;
pub mod service;

// Re-exports for convenience
pub use chunking::Chunker;
pub use config::Config;
pub use error::{Error, Result};
pub use extraction::{ContentCleaner, DomAnalyzer, ImageExtractor, LinkExtractor};
pub use fetch::{FetchMethod, PageFetcher};
pub use llm::{LanguageModel, OllamaClient};
pub use service::{
    ExtractionResult, ExtractionService, Pipeline, PipelineResult, ScrapeOptions, ScrapeResult,
    ScrapingService,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
