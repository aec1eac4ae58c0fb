//! Configuration module for Sumi-Crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; an empty file yields the engine defaults.
//!
//! # Example
//!
//! ```no_run
//! use sumi_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Concurrency limit: {}", config.crawler.concurrency_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerSettings, OutputConfig, OutputFormat, SourceConfig, UserAgentConfig,
    DEFAULT_CONCURRENCY_LIMIT, DEFAULT_DELAY_JITTER_FRACTION, DEFAULT_DELAY_SECONDS,
    DEFAULT_RETRY_LIMIT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_crawler_settings, validate_domain_pattern};
