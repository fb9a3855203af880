//! Services behind the CLI and the REST API
//!
//! - [`ScrapingService`]: fetch and clean pages
//! - [`ExtractionService`]: chunked model extraction over text
//! - [`Pipeline`]: both, in sequence

pub mod ai;
pub mod pipeline;
pub mod scraping;

pub use ai::{
    combine_results, ExtractionInfo, ExtractionMetadata, ExtractionResult, ExtractionService,
    HealthReport, HealthStatus,
};
pub use pipeline::{Pipeline, PipelineResult};
pub use scraping::{ScrapeMetadata, ScrapeOptions, ScrapeResult, ScrapingInfo, ScrapingService};
