use crate::model::FetchRequest;
use std::collections::BTreeMap;
use url::Url;

/// The result of fetching a [`FetchRequest`]
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL the body was served from
    pub url: Url,

    /// Raw body text
    pub body: String,

    /// HTTP status code
    pub status: u16,

    /// Response headers (names lowercased)
    pub headers: BTreeMap<String, String>,

    /// The request that produced this response
    pub request: FetchRequest,
}

impl FetchResponse {
    /// Creates a 200 response for `request` with no headers, served from the request URL
    pub fn ok(request: FetchRequest, body: impl Into<String>) -> Self {
        Self {
            url: request.url().clone(),
            body: body.into(),
            status: 200,
            headers: BTreeMap::new(),
            request,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
