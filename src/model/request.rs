use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Metadata key the built-in source uses to carry traversal depth
pub const DEPTH_KEY: &str = "depth";

/// HTTP method of a fetch request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound fetch
///
/// Built with consuming `with_*` calls and never mutated once handed to the
/// engine. No equality is defined: two requests for the same URL are distinct work.
#[derive(Debug, Clone, Serialize)]
pub struct FetchRequest {
    url: Url,
    method: Method,
    headers: BTreeMap<String, String>,
    body: Option<String>,
    meta: Map<String, Value>,
}

impl FetchRequest {
    /// Creates a GET request for `url`
    pub fn new(url: Url) -> Self {
        Self {
            url,
            method: Method::Get,
            headers: BTreeMap::new(),
            body: None,
            meta: Map::new(),
        }
    }

    /// Parses `url` and creates a GET request for it
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?))
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Sets the traversal depth metadata
    pub fn with_depth(self, depth: u32) -> Self {
        self.with_meta(DEPTH_KEY, depth)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// Traversal depth from metadata; requests without one are at depth 0
    pub fn depth(&self) -> u32 {
        self.meta
            .get(DEPTH_KEY)
            .and_then(Value::as_u64)
            .and_then(|d| u32::try_from(d).ok())
            .unwrap_or(0)
    }
}
