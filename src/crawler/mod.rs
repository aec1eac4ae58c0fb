//! Crawler module for orchestrating fetch, parse and record processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier queue and the bounded-concurrency engine
//! - Per-request retry policy and run statistics
//! - The `Source` collaborator trait
//! - HTTP fetching, HTML extraction and a link-following source

mod engine;
mod fetcher;
mod frontier;
mod link_source;
mod parser;
mod retry;
mod scope;
mod source;
mod stats;


pub use engine::{Engine, EngineHandle};
pub use fetcher::{build_http_client, HttpFetcher};
pub use frontier::Frontier;
pub use link_source::LinkSource;
pub use parser::{parse_html, ParsedPage};
pub use retry::{RetryDecision, RetryPolicy};
pub use scope::DomainScope;
pub use source::{ParseStream, Source};
pub use stats::{print_statistics, CrawlStats, StatsSnapshot};

use crate::config::Config;
use crate::pipeline::{JsonWriterStage, Stage, TextWriterStage, ValidationStage};
use crate::SumiError;
use std::sync::Arc;

/// Builds the stage chain described by the `[output]` section
///
/// Validation always runs first, followed by the JSON and/or text writer.
pub fn stages_from_config(config: &Config) -> Vec<Box<dyn Stage>> {
    let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(ValidationStage::new())];

    if config.output.format.writes_json() {
        stages.push(Box::new(JsonWriterStage::new(&config.output.directory)));
    }
    if config.output.format.writes_text() {
        stages.push(Box::new(TextWriterStage::new(&config.output.directory)));
    }

    stages
}

/// Runs a complete crawl of `source`
///
/// This is the quick-start entry point. It will:
/// 1. Build the stage chain from the output configuration
/// 2. Construct an engine from the crawler settings
/// 3. Crawl until the frontier is exhausted
///
/// # Returns
///
/// * `Ok(StatsSnapshot)` - Final statistics of the run
/// * `Err(SumiError)` - Invalid settings or a fatal stage failure
pub async fn run_source<S: Source>(source: S, config: &Config) -> Result<StatsSnapshot, SumiError> {
    let mut engine = Engine::new(config.crawler.clone(), stages_from_config(config))?;
    engine.crawl(Arc::new(source)).await
}
