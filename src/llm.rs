//! Language model access
//!
//! The model is an external service. [`OllamaClient`] talks to a local
//! Ollama server over its HTTP API; anything else can be plugged in by
//! implementing [`LanguageModel`].

use crate::config::Config;
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Default extraction prompt. `{content}` and `{instructions}` are filled in
/// per chunk.
pub const DEFAULT_TEMPLATE: &str = "\
You extract structured information from web page text.

TASK: Extract exactly the information requested below from the page content.

CONTENT:
{content}

INSTRUCTIONS:
{instructions}

RULES:
1. Return only the requested information, without explanations.
2. Keep values exactly as they appear in the content.
3. If nothing in the content matches, answer: No relevant data found
4. Use a clear, consistent layout (one item per line, or key: value pairs).

OUTPUT:
";

/// Answer the model is told to give when nothing matches
pub const NO_DATA: &str = "No relevant data found";

/// Prompt template with `{content}` and `{instructions}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Use a custom template
    pub fn new<S: Into<String>>(template: S) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Fill in both placeholders
    pub fn render(&self, content: &str, instructions: &str) -> String {
        // Instructions first so page text containing "{instructions}" is left alone.
        self.template
            .replace("{instructions}", instructions.trim())
            .replacen("{content}", content, 1)
    }
}

/// Reachability of a model endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ModelHealth {
    /// Endpoint answers and has the configured model
    Available,
    /// Endpoint answers but the model has not been pulled
    MissingModel {
        /// Models the endpoint does have
        installed: Vec<String>,
    },
    /// Endpoint could not be reached
    Unreachable {
        /// Transport error
        error: String,
    },
}

/// A text-in, text-out language model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier reported in results
    fn name(&self) -> &str;

    /// Sampling temperature, for reporting
    fn temperature(&self) -> f32;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check the endpoint without generating
    async fn health(&self) -> ModelHealth;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Client for a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    /// Create a client; local models can be slow, so the timeout is generous
    pub fn new<S: Into<String>>(base_url: S, model: S, temperature: f32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
        })
    }

    /// Client configured from the application config
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Self::new(config.ollama_url.clone(), config.ai_model.clone(), config.ai_temperature)?;
        info!("Model client ready: {} at {}", client.model, client.base_url);
        Ok(client)
    }

    /// Models installed on the server
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Model API returned {}: {}", status, message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        debug!(
            "Model answered {} chars in {:?}",
            body.response.len(),
            start.elapsed()
        );
        Ok(body.response.trim().to_string())
    }

    async fn health(&self) -> ModelHealth {
        match self.list_models().await {
            Ok(installed) => {
                let wanted = self.model.as_str();
                let present = installed.iter().any(|name| {
                    name == wanted || name.strip_suffix(":latest") == Some(wanted)
                });
                if present {
                    ModelHealth::Available
                } else {
                    ModelHealth::MissingModel { installed }
                }
            }
            Err(e) => ModelHealth::Unreachable {
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_render_template() {
        let template = PromptTemplate::new("C={content};I={instructions}");
        assert_eq!(template.render("page", " prices "), "C=page;I=prices");
    }

    #[test]
    fn test_render_leaves_placeholders_in_content() {
        let template = PromptTemplate::new("C={content};I={instructions}");
        assert_eq!(
            template.render("x {instructions} y", "names"),
            "C=x {instructions} y;I=names"
        );
    }

    #[test]
    fn test_default_template_mentions_fallback() {
        let prompt = PromptTemplate::default().render("CONTENT_HERE", "INSTR_HERE");
        assert!(prompt.contains("CONTENT_HERE"));
        assert!(prompt.contains("INSTR_HERE"));
        assert!(prompt.contains(NO_DATA));
    }

    #[tokio::test]
    async fn test_generate_posts_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::PartialJson(json!({
                "model": "llama3.2:1b",
                "prompt": "hello",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"llama3.2:1b","response":"  world \n","done":true}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(server.url(), "llama3.2:1b".to_string(), 0.1).unwrap();
        let out = client.generate("hello").await.unwrap();
        assert_eq!(out, "world");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_maps_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(404)
            .with_body(r#"{"error":"model 'nope' not found"}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(server.url(), "nope".to_string(), 0.1).unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_health_reports_missing_model() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"gemma:2b"},{"name":"mistral:latest"}]}"#)
            .create_async()
            .await;

        let missing = OllamaClient::new(server.url(), "llama3.2:1b".to_string(), 0.1).unwrap();
        assert_eq!(
            missing.health().await,
            ModelHealth::MissingModel {
                installed: vec!["gemma:2b".to_string(), "mistral:latest".to_string()]
            }
        );

        let present = OllamaClient::new(server.url(), "mistral".to_string(), 0.1).unwrap();
        assert_eq!(present.health().await, ModelHealth::Available);
    }

    #[tokio::test]
    async fn test_health_unreachable() {
        let client = OllamaClient::new("http://127.0.0.1:9", "m", 0.0).unwrap();
        assert!(matches!(client.health().await, ModelHealth::Unreachable { .. }));
    }
}
