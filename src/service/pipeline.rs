//! Scrape-then-extract pipeline

use super::ai::{ExtractionResult, ExtractionService};
use super::scraping::{ScrapeOptions, ScrapeResult, ScrapingService};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Combined outcome of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub url: String,
    pub instructions: String,
    pub scrape: ScrapeResult,
    /// Absent when the scrape failed and the model was never called
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionResult>,
    /// Extracted text on success, empty otherwise
    pub content: String,
    /// Total wall time in seconds
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Scraping followed by model extraction
#[derive(Clone)]
pub struct Pipeline {
    scraping: ScrapingService,
    extraction: ExtractionService,
}

impl Pipeline {
    pub fn new(scraping: ScrapingService, extraction: ExtractionService) -> Self {
        Self {
            scraping,
            extraction,
        }
    }

    pub fn scraping(&self) -> &ScrapingService {
        &self.scraping
    }

    pub fn extraction(&self) -> &ExtractionService {
        &self.extraction
    }

    /// Scrape `url`, then apply `instructions` to its cleaned text
    #[instrument(skip(self, instructions, options))]
    pub async fn run(
        &self,
        url: &str,
        instructions: &str,
        options: &ScrapeOptions,
    ) -> PipelineResult {
        let started = Instant::now();
        let scrape = self.scraping.scrape(url, options).await;

        if !scrape.success {
            warn!("Pipeline stopped after scrape of {}", scrape.url);
            return PipelineResult {
                success: false,
                url: scrape.url.clone(),
                instructions: instructions.to_string(),
                error: scrape.error.clone(),
                scrape,
                extraction: None,
                content: String::new(),
                processing_time: started.elapsed().as_secs_f64(),
            };
        }

        let extraction = self.extraction.extract(&scrape.content, instructions).await;
        let processing_time = started.elapsed().as_secs_f64();
        info!(
            "Pipeline for {} finished in {:.2}s (success: {})",
            scrape.url, processing_time, extraction.success
        );

        PipelineResult {
            success: extraction.success,
            url: scrape.url.clone(),
            instructions: instructions.to_string(),
            content: extraction.content.clone(),
            error: extraction.error.clone(),
            scrape,
            extraction: Some(extraction),
            processing_time,
        }
    }
}
