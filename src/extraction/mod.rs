//! HTML processing
//!
//! Static-HTML helpers built on `scraper`: cleaning page text, analyzing
//! DOM structure, and pulling out links and images.

pub mod content;
pub mod dom;
pub mod images;
pub mod links;

pub use content::ContentCleaner;
pub use dom::{DomAnalysis, DomAnalyzer, StructureQuality};
pub use images::{ExtractedImage, ImageExtractor};
pub use links::{ExtractedLink, LinkExtractor, LinkType};
