//! Sumi-Crawl: a bounded-concurrency crawl orchestrator
//!
//! This crate drives a [`crawler::Source`] through a dynamic frontier of fetch
//! requests, retries transient failures, and routes extracted records through an
//! ordered chain of [`pipeline::Stage`]s.

pub mod config;
pub mod crawler;
pub mod model;
pub mod pipeline;
pub mod state;

use thiserror::Error;

/// Main error type for a crawl run
///
/// Per-request failures ([`FetchError`], [`ParseError`]) never surface here; they
/// are absorbed by the retry policy. Only stage and invariant failures end a run.
#[derive(Debug, Error)]
pub enum SumiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid engine state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::EngineState,
        to: state::EngineState,
    },

    #[error("Engine invariant violated: {0}")]
    InvariantViolation(String),

    #[error("A crawl is already running on this engine")]
    AlreadyRunning,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// Failure to obtain a response for a request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Fetch failed for {url}: {message}")]
    Other { url: String, message: String },
}

impl FetchError {
    /// Convenience constructor for sources that fail outside of HTTP
    pub fn other(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Failure while consuming a source's parse output
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("Invalid URL in parse output: {0}")]
    InvalidUrl(#[from] ::url::ParseError),
}

impl ParseError {
    pub fn malformed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Failure raised by a processing stage
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Stage '{stage}' failed: {message}")]
    Failed { stage: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StageError {
    pub fn failed(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for crawl runs
pub type Result<T> = std::result::Result<T, SumiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, CrawlerSettings};
pub use crawler::{Engine, EngineHandle, Source, StatsSnapshot};
pub use model::{FetchRequest, FetchResponse, Method, ParseYield, Record};
pub use pipeline::{Stage, StageChain};
pub use state::EngineState;
