//! Domain scope for link following
//!
//! Two pattern forms are supported:
//! 1. Exact: `example.com` matches only `example.com`
//! 2. Wildcard: `*.example.com` matches `example.com` and any subdomain of it
//!
//! Hosts and patterns are compared case-insensitively; ports are ignored.

use url::Url;

/// Set of domain patterns a URL's host must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainScope {
    patterns: Vec<String>,
}

impl DomainScope {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref().trim().to_ascii_lowercase();
            if !pattern.is_empty() && !normalized.contains(&pattern) {
                normalized.push(pattern);
            }
        }

        Self {
            patterns: normalized,
        }
    }

    /// Scope limited to the exact hosts of the given URLs
    pub fn from_hosts<'a, I>(urls: I) -> Self
    where
        I: IntoIterator<Item = &'a Url>,
    {
        Self::new(urls.into_iter().filter_map(|url| url.host_str()))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// An empty scope allows nothing
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns true if the URL's host matches any pattern
    pub fn allows(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return false,
        };

        self.patterns
            .iter()
            .any(|pattern| matches_pattern(pattern, &host))
    }
}

fn matches_pattern(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => host == pattern,
    }
}
