//! HTTP fetcher implementation
//!
//! This module handles HTTP requests for sources that crawl the web:
//! - Building HTTP clients with proper user agent strings
//! - Sending a [`FetchRequest`] with its method, headers and body
//! - Error classification into [`FetchError`]

use crate::config::UserAgentConfig;
use crate::model::{FetchRequest, FetchResponse, Method};
use crate::FetchError;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sumi_crawl::config::UserAgentConfig;
/// use sumi_crawl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiCrawl".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs fetches for a [`crate::crawler::Source`]
///
/// Redirects are followed by the client; the response carries the final URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Sends one request
    ///
    /// Redirects are followed; the response carries the final URL.
    ///
    /// # Arguments
    ///
    /// * `request` - Target URL, method, headers and optional body
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResponse)` - A 2xx response with lowercase header names
    /// * `Err(FetchError)` - `Status` for any other status, `Timeout` or `Http` for
    ///   transport failures
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = request.url().as_str();

        let mut builder = self.client.request(reqwest_method(request.method()), url);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("HTTP {} for {}", status.as_u16(), url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(FetchResponse {
            url: final_url,
            body,
            status: status.as_u16(),
            headers,
            request: request.clone(),
        })
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
