//! Error types for Scrapewise
//!
//! One `thiserror` enum per concern, folded into the top-level [`Error`].
//! The services catch these and report them inside result objects, so most
//! callers only ever see the display string.

use thiserror::Error;

/// The main error type for Scrapewise operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Static HTTP fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Content extraction errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Language model errors
    #[error("Model error: {0}")]
    Llm(#[from] LlmError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// Timeout waiting for browser
    #[error("Browser operation timed out after {0}ms")]
    Timeout(u64),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation timeout
    #[error("Page load timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),
}

/// Static HTTP fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Request exceeded the configured timeout
    #[error("HTTP request timed out after {0}s")]
    Timeout(u64),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },
}

/// Content extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Input was empty or blank
    #[error("{0}")]
    EmptyInput(String),

    /// Invalid selector
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Page yielded no usable text
    #[error("No textual content found at {0}")]
    NoContent(String),
}

/// Language model errors
#[derive(Error, Debug)]
pub enum LlmError {
    /// Model endpoint could not be reached
    #[error("Model endpoint unavailable: {0}")]
    Unavailable(String),

    /// Model endpoint answered with an error status
    #[error("Model API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error body returned by the endpoint
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("Unexpected model response: {0}")]
    InvalidResponse(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable was set to a value that cannot be used
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type alias for Scrapewise operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}
