//! DOM structure analysis
//!
//! Element counts, class and id inventories, and a coarse structure score
//! for a fetched page.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cap on class and id names reported
pub const MAX_NAMES: usize = 50;

/// Coarse rating of how much semantic structure a page has
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureQuality {
    /// Score below 3
    Poor,
    /// Score 3-4
    Fair,
    /// Score 5-6
    Good,
    /// Score 7 or more
    Excellent,
}

impl StructureQuality {
    /// Map a raw score to a rating
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 7 => StructureQuality::Excellent,
            s if s >= 5 => StructureQuality::Good,
            s if s >= 3 => StructureQuality::Fair,
            _ => StructureQuality::Poor,
        }
    }
}

/// Result of analyzing a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomAnalysis {
    pub total_elements: usize,
    /// h1..h6 counts, keyed "h1".."h6"
    pub headings: BTreeMap<String, usize>,
    pub links: usize,
    pub images: usize,
    pub forms: usize,
    pub tables: usize,
    pub divs: usize,
    pub paragraphs: usize,
    /// `ul` plus `ol`
    pub lists: usize,
    pub scripts: usize,
    pub styles: usize,
    /// Sorted, unique, at most [`MAX_NAMES`]
    pub classes: Vec<String>,
    /// Sorted, unique, at most [`MAX_NAMES`]
    pub ids: Vec<String>,
    /// Characters of all text, scripts included
    pub text_length: usize,
    pub word_count: usize,
    pub structure_quality: StructureQuality,
}

impl DomAnalysis {
    /// Score used for [`StructureQuality`]
    pub fn structure_score(&self) -> u32 {
        let mut score = 0;
        if self.headings.get("h1").copied().unwrap_or(0) > 0 {
            score += 2;
        }
        for present in [
            self.paragraphs > 0,
            self.links > 0,
            self.images > 0,
            self.divs > 0,
            self.tables > 0,
            !self.ids.is_empty(),
            !self.classes.is_empty(),
        ] {
            if present {
                score += 1;
            }
        }
        score
    }
}

/// DOM analysis functionality
pub struct DomAnalyzer;

impl DomAnalyzer {
    /// Analyze an HTML document
    pub fn analyze(html: &str) -> DomAnalysis {
        let document = Html::parse_document(html);

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut classes = BTreeSet::new();
        let mut ids = BTreeSet::new();
        let mut total_elements = 0;

        for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
            total_elements += 1;
            let value = element.value();
            *counts.entry(value.name().to_string()).or_default() += 1;
            classes.extend(value.classes().map(str::to_string));
            if let Some(id) = value.id().filter(|id| !id.is_empty()) {
                ids.insert(id.to_string());
            }
        }

        let count = |tag: &str| counts.get(tag).copied().unwrap_or(0);

        let headings = (1..=6)
            .map(|level| {
                let tag = format!("h{}", level);
                let n = count(&tag);
                (tag, n)
            })
            .collect();

        let text: String = document.root_element().text().collect();

        let mut analysis = DomAnalysis {
            total_elements,
            headings,
            links: count("a"),
            images: count("img"),
            forms: count("form"),
            tables: count("table"),
            divs: count("div"),
            paragraphs: count("p"),
            lists: count("ul") + count("ol"),
            scripts: count("script"),
            styles: count("style"),
            classes: classes.into_iter().take(MAX_NAMES).collect(),
            ids: ids.into_iter().take(MAX_NAMES).collect(),
            text_length: text.chars().count(),
            word_count: text.split_whitespace().count(),
            structure_quality: StructureQuality::Poor,
        };
        analysis.structure_quality = StructureQuality::from_score(analysis.structure_score());
        analysis
    }
}
