//! Runtime configuration
//!
//! Every tunable is a plain environment variable with a default. A `.env`
//! file in the working directory is loaded first when present.

use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

/// Desktop Chrome user agent sent by both fetchers
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Ollama model tag (`AI_MODEL`)
    pub ai_model: String,
    /// Sampling temperature (`AI_TEMPERATURE`)
    pub ai_temperature: f32,
    /// Maximum characters per model call (`CHUNK_SIZE`)
    pub chunk_size: usize,
    /// Base URL of the Ollama server (`OLLAMA_URL`)
    pub ollama_url: String,
    /// Run the browser without a window (`HEADLESS`)
    pub headless: bool,
    /// Fetch timeout in seconds (`TIMEOUT`)
    pub timeout_secs: u64,
    /// User agent for HTTP and browser fetches (`USER_AGENT`)
    pub user_agent: String,
    /// Verbose logging (`DEBUG`)
    pub debug: bool,
    /// Log level when not in debug mode (`LOG_LEVEL`)
    pub log_level: String,
    /// REST bind host (`API_HOST`)
    pub api_host: String,
    /// REST bind port (`API_PORT`)
    pub api_port: u16,
    /// Web UI port (`UI_PORT`)
    pub ui_port: u16,
    /// Batch scraping parallelism (`MAX_CONCURRENT`)
    pub max_concurrent: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai_model: "llama3.2:1b".to_string(),
            ai_temperature: 0.1,
            chunk_size: 6000,
            ollama_url: "http://localhost:11434".to_string(),
            headless: true,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            debug: false,
            log_level: "INFO".to_string(),
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            ui_port: 8501,
            max_concurrent: 5,
        }
    }
}

impl Config {
    /// Load from `.env` (if any) and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let chunk_size = parse_or(&get, "CHUNK_SIZE", defaults.chunk_size)?;
        if chunk_size == 0 {
            return Err(invalid("CHUNK_SIZE", "0", "must be greater than zero"));
        }

        let ai_temperature: f32 = parse_or(&get, "AI_TEMPERATURE", defaults.ai_temperature)?;
        if !ai_temperature.is_finite() || ai_temperature < 0.0 {
            return Err(invalid(
                "AI_TEMPERATURE",
                &ai_temperature.to_string(),
                "must be a non-negative number",
            ));
        }

        let max_concurrent = parse_or(&get, "MAX_CONCURRENT", defaults.max_concurrent)?;
        if max_concurrent == 0 {
            return Err(invalid("MAX_CONCURRENT", "0", "must be greater than zero"));
        }

        Ok(Self {
            ai_model: get("AI_MODEL").unwrap_or(defaults.ai_model),
            ai_temperature,
            chunk_size,
            ollama_url: get("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            headless: get("HEADLESS").map_or(defaults.headless, |v| flag(&v)),
            timeout_secs: parse_or(&get, "TIMEOUT", defaults.timeout_secs)?,
            user_agent: get("USER_AGENT").unwrap_or(defaults.user_agent),
            debug: get("DEBUG").map_or(defaults.debug, |v| flag(&v)),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            api_host: get("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_or(&get, "API_PORT", defaults.api_port)?,
            ui_port: parse_or(&get, "UI_PORT", defaults.ui_port)?,
            max_concurrent,
        })
    }

    /// Fetch timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `tracing` filter directive derived from `DEBUG` and `LOG_LEVEL`
    pub fn log_filter(&self) -> String {
        if self.debug {
            "debug".to_string()
        } else {
            self.log_level.to_lowercase()
        }
    }
}

/// Only the literal "true" (any case) enables a flag
fn flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
        None => Ok(default),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
