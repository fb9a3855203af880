//! Model-backed extraction service
//!
//! Splits cleaned page text into chunks, asks the model to apply the
//! instruction to each chunk, and merges the answers.

use crate::chunking::Chunker;
use crate::config::Config;
use crate::error::{Error, ExtractionError};
use crate::llm::{LanguageModel, ModelHealth, PromptTemplate, NO_DATA};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Settings recorded with a successful extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Characters of input content
    pub content_length: usize,
    pub chunk_size: usize,
    pub temperature: f32,
}

/// Outcome of one extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub content: String,
    /// Fraction of chunks the model answered, 0.0..=1.0
    pub confidence: f64,
    /// Wall time in seconds
    pub processing_time: f64,
    pub chunks_processed: usize,
    pub successful_chunks: usize,
    pub model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExtractionMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Overall extraction health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Result of [`ExtractionService::health_check`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub model: String,
    /// Seconds taken by the probe extraction
    pub response_time: f64,
    pub endpoint: ModelHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

/// Static description of the extraction service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionInfo {
    pub model: String,
    pub temperature: f32,
    pub chunk_size: usize,
    pub status: String,
    pub features: Vec<String>,
}

/// Extraction service
#[derive(Clone)]
pub struct ExtractionService {
    model: Arc<dyn LanguageModel>,
    chunker: Chunker,
    template: PromptTemplate,
    concurrency: usize,
}

/// Chunk outcome before merging
enum ChunkAnswer {
    Text(String),
    Failed(Error),
}

impl ExtractionService {
    /// Create a service over `model`, chunking at `chunk_size` characters
    pub fn new(model: Arc<dyn LanguageModel>, chunk_size: usize) -> Self {
        info!("Extraction service initialized with model: {}", model.name());
        Self {
            model,
            chunker: Chunker::new(chunk_size),
            template: PromptTemplate::default(),
            concurrency: 1,
        }
    }

    /// Create a service using the configured chunk size and concurrency
    pub fn from_config(model: Arc<dyn LanguageModel>, config: &Config) -> Self {
        Self::new(model, config.chunk_size).with_concurrency(config.max_concurrent)
    }

    /// Use a different prompt template
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Allow up to `n` chunks in flight at once (default 1)
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Name of the underlying model
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Apply `instructions` to `content`
    #[instrument(skip(self, content, instructions), fields(content_len = content.len()))]
    pub async fn extract(&self, content: &str, instructions: &str) -> ExtractionResult {
        let started = Instant::now();

        if content.trim().is_empty() {
            return self.failure(
                ExtractionError::EmptyInput("Empty content provided".to_string()).to_string(),
                0,
                started,
            );
        }
        if instructions.trim().is_empty() {
            return self.failure(
                ExtractionError::EmptyInput("No extraction instructions provided".to_string())
                    .to_string(),
                0,
                started,
            );
        }

        let chunks = self.chunker.split(content);
        let total = chunks.len();
        info!("Processing {} chunks for extraction", total);

        let answers: Vec<ChunkAnswer> = stream::iter(chunks.into_iter().enumerate())
            .map(|(i, chunk)| async move {
                self.process_chunk(&chunk, instructions, i + 1, total)
                    .await
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut texts = Vec::with_capacity(total);
        let mut successful = 0;
        let mut last_error = None;
        for answer in answers {
            match answer {
                ChunkAnswer::Text(text) => {
                    if !text.is_empty() {
                        successful += 1;
                    }
                    texts.push(text);
                }
                ChunkAnswer::Failed(e) => last_error = Some(e),
            }
        }

        if texts.is_empty() {
            let message = last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "No content to process".to_string());
            error!("Extraction failed: {}", message);
            return self.failure(message, total, started);
        }

        let combined = combine_results(&texts);
        let processing_time = started.elapsed().as_secs_f64();
        let confidence = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64
        };

        info!(
            "Extraction completed in {:.2}s with {:.2} confidence",
            processing_time, confidence
        );

        ExtractionResult {
            success: true,
            content: combined,
            confidence,
            processing_time,
            chunks_processed: total,
            successful_chunks: successful,
            model_used: self.model.name().to_string(),
            metadata: Some(ExtractionMetadata {
                content_length: content.chars().count(),
                chunk_size: self.chunker.chunk_size(),
                temperature: self.model.temperature(),
            }),
            error: None,
        }
    }

    async fn process_chunk(
        &self,
        chunk: &str,
        instructions: &str,
        n: usize,
        total: usize,
    ) -> ChunkAnswer {
        let prompt = self.template.render(chunk, instructions);
        match self.model.generate(&prompt).await {
            Ok(text) => {
                debug!("Processed chunk {}/{}", n, total);
                ChunkAnswer::Text(text.trim().to_string())
            }
            Err(e) => {
                warn!("Failed to process chunk {}: {}", n, e);
                ChunkAnswer::Failed(e)
            }
        }
    }

    fn failure(&self, message: String, chunks: usize, started: Instant) -> ExtractionResult {
        ExtractionResult {
            success: false,
            content: String::new(),
            confidence: 0.0,
            processing_time: started.elapsed().as_secs_f64(),
            chunks_processed: chunks,
            successful_chunks: 0,
            model_used: self.model.name().to_string(),
            metadata: None,
            error: Some(message),
        }
    }

    /// Reachability of the model endpoint, without generating
    pub async fn model_health(&self) -> ModelHealth {
        self.model.health().await
    }

    /// Probe the model with a tiny extraction
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthReport {
        let endpoint = self.model.health().await;
        let probe = self
            .extract("Test content for health check", "Extract any text")
            .await;

        let status = match (probe.success, probe.confidence >= 1.0) {
            (true, true) => HealthStatus::Healthy,
            (true, false) => HealthStatus::Degraded,
            (false, _) => HealthStatus::Unhealthy,
        };

        HealthReport {
            status,
            model: self.model.name().to_string(),
            response_time: probe.processing_time,
            endpoint,
            error: probe.error,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Static description of the service
    pub fn info(&self) -> ExtractionInfo {
        ExtractionInfo {
            model: self.model.name().to_string(),
            temperature: self.model.temperature(),
            chunk_size: self.chunker.chunk_size(),
            status: "operational".to_string(),
            features: ["chunking", "error_handling", "confidence_scoring", "performance_monitoring"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Merge chunk answers: drop empties and repeats (first occurrence wins),
/// separate with a blank line
pub fn combine_results<S: AsRef<str>>(results: &[S]) -> String {
    let mut seen = HashSet::new();
    let unique: Vec<&str> = results
        .iter()
        .map(|r| r.as_ref().trim())
        .filter(|r| !r.is_empty())
        .filter(|r| seen.insert(*r))
        .collect();

    if unique.is_empty() {
        NO_DATA.to_string()
    } else {
        unique.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LlmError, Result};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    /// Answers from a script, one per call; `None` fails the call
    struct ScriptedModel {
        answers: Mutex<Vec<Option<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(answers: Vec<Option<&str>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into_iter().rev().map(|a| a.map(String::from)).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn temperature(&self) -> f32 {
            0.1
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            match self.answers.lock().pop().flatten() {
                Some(answer) => Ok(answer),
                None => Err(LlmError::Unavailable("connection refused".to_string()).into()),
            }
        }

        async fn health(&self) -> ModelHealth {
            ModelHealth::Available
        }
    }

    #[test]
    fn test_combine_dedupes_in_order() {
        let combined = combine_results(&["b", "", "a", "b ", "  ", "c"]);
        assert_eq!(combined, "b\n\na\n\nc");
    }

    #[test]
    fn test_combine_nothing() {
        assert_eq!(combine_results(&["", " "]), NO_DATA);
        assert_eq!(combine_results::<&str>(&[]), NO_DATA);
    }

    #[tokio::test]
    async fn test_extract_single_chunk() {
        let model = ScriptedModel::new(vec![Some("Widget: $10")]);
        let service = ExtractionService::new(model.clone(), 6000);
        let result = service.extract("Widget - $10", "prices").await;

        assert!(result.success);
        assert_eq!(result.content, "Widget: $10");
        assert_eq!(result.chunks_processed, 1);
        assert_eq!(result.successful_chunks, 1);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.model_used, "scripted");
        assert_eq!(result.metadata.unwrap().chunk_size, 6000);

        let prompts = model.prompts.lock();
        assert!(prompts[0].contains("Widget - $10"));
        assert!(prompts[0].contains("prices"));
    }

    #[tokio::test]
    async fn test_extract_partial_failure() {
        let model = ScriptedModel::new(vec![Some("A"), None, Some("A"), Some("")]);
        let service = ExtractionService::new(model, 5);
        let result = service
            .extract("one\n\ntwo\n\nthree\n\nfour", "letters")
            .await;

        assert!(result.success);
        assert_eq!(result.chunks_processed, 4);
        assert_eq!(result.successful_chunks, 2);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.content, "A");
    }

    #[tokio::test]
    async fn test_extract_all_chunks_failed() {
        let model = ScriptedModel::new(vec![None, None]);
        let service = ExtractionService::new(model, 5);
        let result = service.extract("one\n\ntwo", "x").await;

        assert!(!result.success);
        assert!(result.content.is_empty());
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_extract_empty_answers_report_no_data() {
        let model = ScriptedModel::new(vec![Some("   ")]);
        let service = ExtractionService::new(model, 100);
        let result = service.extract("text", "find nothing").await;
        assert!(result.success);
        assert_eq!(result.content, NO_DATA);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_extract_rejects_blank_input() {
        let service = ExtractionService::new(ScriptedModel::new(vec![]), 100);

        let result = service.extract("  ", "x").await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Empty content provided"));

        let result = service.extract("text", "").await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("No extraction instructions provided")
        );
    }

    /// Answers with the prompt in upper case
    struct ShoutingModel;

    #[async_trait]
    impl LanguageModel for ShoutingModel {
        fn name(&self) -> &str {
            "shout"
        }

        fn temperature(&self) -> f32 {
            0.0
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            tokio::task::yield_now().await;
            Ok(prompt.to_uppercase())
        }

        async fn health(&self) -> ModelHealth {
            ModelHealth::Available
        }
    }

    #[tokio::test]
    async fn test_concurrent_chunks_keep_order() {
        let service = ExtractionService::new(Arc::new(ShoutingModel), 5)
            .with_template(PromptTemplate::new("{content}"))
            .with_concurrency(4);
        let result = service.extract("aaaa\n\nbbbb\n\ncccc", "x").await;
        assert_eq!(result.content, "AAAA\n\nBBBB\n\nCCCC");
        assert_eq!(result.successful_chunks, 3);
    }

    #[test]
    fn test_from_config_uses_max_concurrent() {
        let config = Config {
            chunk_size: 250,
            max_concurrent: 3,
            ..Config::default()
        };
        let service = ExtractionService::from_config(ScriptedModel::new(vec![]), &config);
        assert_eq!(service.concurrency, 3);
        assert_eq!(service.info().chunk_size, 250);
        assert_eq!(ExtractionService::new(Arc::new(ShoutingModel), 10).concurrency, 1);
    }

    #[tokio::test]
    async fn test_health_check() {
        let healthy = ExtractionService::new(ScriptedModel::new(vec![Some("ok")]), 100);
        assert_eq!(healthy.health_check().await.status, HealthStatus::Healthy);

        let down = ExtractionService::new(ScriptedModel::new(vec![None]), 100);
        let report = down.health_check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.error.is_some());
    }

    #[test]
    fn test_info() {
        let service = ExtractionService::new(ScriptedModel::new(vec![]), 1234);
        let info = service.info();
        assert_eq!(info.chunk_size, 1234);
        assert_eq!(info.model, "scripted");
    }
}
