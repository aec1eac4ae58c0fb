use serde::Deserialize;

/// Default number of requests allowed in flight at once
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 8;

/// Default fixed delay before each fetch attempt (seconds)
pub const DEFAULT_DELAY_SECONDS: f64 = 0.0;

/// Default jitter fraction applied on top of the fixed delay
pub const DEFAULT_DELAY_JITTER_FRACTION: f64 = 0.5;

/// Default number of re-attempts after the first failure
pub const DEFAULT_RETRY_LIMIT: u32 = 2;

/// Main configuration structure for Sumi-Crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerSettings,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Engine behavior configuration
///
/// Every key is optional; absent keys fall back to the engine defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CrawlerSettings {
    /// Maximum number of fetch tasks in flight
    #[serde(rename = "concurrency-limit")]
    pub concurrency_limit: usize,

    /// Fixed delay before every fetch attempt (seconds)
    #[serde(rename = "delay-seconds")]
    pub delay_seconds: f64,

    /// Fraction of `delay_seconds` added at random on each attempt
    #[serde(rename = "delay-jitter-fraction")]
    pub delay_jitter_fraction: f64,

    /// Maximum additional attempts after the first
    #[serde(rename = "retry-limit")]
    pub retry_limit: u32,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            delay_seconds: DEFAULT_DELAY_SECONDS,
            delay_jitter_fraction: DEFAULT_DELAY_JITTER_FRACTION,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

/// User agent identification for the built-in HTTP fetcher
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiCrawl".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Parameters for the built-in link-following source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Name used in logs and output file names
    pub name: String,

    /// Seed URLs
    pub seeds: Vec<String>,

    /// Links are followed while the current page depth is below this value
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Domain patterns (e.g. "example.com" or "*.example.com") links must match;
    /// empty means the seed hosts
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: "site".to_string(),
            seeds: Vec::new(),
            max_depth: 1,
            allowed_domains: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that writer stages place their files in
    pub directory: String,

    /// Which writer stages to install
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "output".to_string(),
            format: OutputFormat::Json,
        }
    }
}

/// Output writer selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Text,
    Both,
}

impl OutputFormat {
    pub fn writes_json(&self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }

    pub fn writes_text(&self) -> bool {
        matches!(self, Self::Text | Self::Both)
    }
}
