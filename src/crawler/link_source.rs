//! Link-following source
//!
//! Fetches pages over HTTP, emits one record per HTML page and follows the page's
//! links within the configured domain scope until the depth limit is reached.

use crate::config::{Config, SourceConfig, UserAgentConfig};
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::parser::parse_html;
use crate::crawler::scope::DomainScope;
use crate::crawler::{ParseStream, Source};
use crate::model::{FetchRequest, FetchResponse, ParseYield, Record};
use crate::{ConfigError, FetchError, ParseError, SumiError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

/// A [`Source`] that crawls HTML pages by following links
#[derive(Debug, Clone)]
pub struct LinkSource {
    name: String,
    seeds: Vec<Url>,
    max_depth: u32,
    scope: DomainScope,
    fetcher: HttpFetcher,
}

impl LinkSource {
    /// Builds the source from its config section
    ///
    /// When no allowed domains are configured, links are limited to the seed hosts.
    ///
    /// # Arguments
    ///
    /// * `config` - Name, seeds, maximum depth and allowed domain patterns
    /// * `user_agent` - Identity sent with every fetch
    ///
    /// # Returns
    ///
    /// * `Ok(LinkSource)` - Ready to crawl
    /// * `Err(SumiError)` - A seed URL is invalid or the HTTP client could not be built
    pub fn new(config: &SourceConfig, user_agent: &UserAgentConfig) -> Result<Self, SumiError> {
        let seeds = config
            .seeds
            .iter()
            .map(|seed| {
                Url::parse(seed)
                    .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let scope = if config.allowed_domains.is_empty() {
            DomainScope::from_hosts(&seeds)
        } else {
            DomainScope::new(&config.allowed_domains)
        };

        Ok(Self {
            name: config.name.clone(),
            seeds,
            max_depth: config.max_depth,
            scope,
            fetcher: HttpFetcher::new(user_agent)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SumiError> {
        Self::new(&config.source, &config.user_agent)
    }

    pub fn seeds(&self) -> &[Url] {
        &self.seeds
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn scope(&self) -> &DomainScope {
        &self.scope
    }

    /// Record plus follow-up requests for one page
    fn page_yields(&self, response: &FetchResponse) -> Vec<Result<ParseYield, ParseError>> {
        let depth = response.request.depth();
        let page = parse_html(&response.body, &response.url);

        let record = Record::new()
            .with_field("url", response.url.as_str())
            .with_field("title", page.title.clone().unwrap_or_default())
            .with_field("content", page.text.clone())
            .with_field(
                "links",
                Value::Array(page.links.iter().cloned().map(Value::String).collect()),
            )
            .with_field("depth", depth)
            .with_field("fetched_at", chrono::Utc::now().to_rfc3339())
            .require("url")
            .require("title")
            .require("content");

        let mut yields = vec![Ok(ParseYield::Record(record))];

        if depth < self.max_depth {
            let mut seen = HashSet::new();
            for link in &page.links {
                if !seen.insert(link.as_str()) {
                    continue;
                }
                match Url::parse(link) {
                    Ok(url) if self.scope.allows(&url) => {
                        yields.push(Ok(ParseYield::Request(
                            FetchRequest::new(url).with_depth(depth + 1),
                        )));
                    }
                    Ok(url) => tracing::trace!("Out of scope: {}", url),
                    Err(e) => yields.push(Err(ParseError::InvalidUrl(e))),
                }
            }
        }

        tracing::debug!(
            "Parsed {} (depth {}): {} links, {} follow-ups",
            response.url,
            depth,
            page.links.len(),
            yields.len() - 1
        );
        yields
    }
}

fn is_html(response: &FetchResponse) -> bool {
    match response.header("content-type") {
        Some(content_type) => content_type.to_ascii_lowercase().contains("html"),
        None => true,
    }
}

#[async_trait]
impl Source for LinkSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn initial_requests(&self) -> Vec<FetchRequest> {
        self.seeds
            .iter()
            .map(|url| FetchRequest::new(url.clone()).with_depth(0))
            .collect()
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.fetcher.fetch(request).await
    }

    fn parse<'a>(&'a self, response: FetchResponse) -> ParseStream<'a> {
        if !is_html(&response) {
            tracing::debug!("Skipping non-HTML response from {}", response.url);
            return stream::empty().boxed();
        }

        stream::iter(self.page_yields(&response)).boxed()
    }

    async fn closed(&self) {
        tracing::info!("Source '{}' closed", self.name);
    }
}
