//! The source collaborator
//!
//! A source decides what to crawl: it supplies the seed requests, performs each
//! fetch, and turns a response into a lazy stream of records and follow-up
//! requests. The engine drives it but never looks inside a response itself.
//!
//! ## Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use futures::stream::{self, StreamExt};
//! use sumi_crawl::crawler::{ParseStream, Source};
//! use sumi_crawl::{FetchError, FetchRequest, FetchResponse, ParseYield, Record};
//!
//! struct Static;
//!
//! #[async_trait]
//! impl Source for Static {
//!     fn name(&self) -> &str {
//!         "static"
//!     }
//!
//!     fn initial_requests(&self) -> Vec<FetchRequest> {
//!         vec![FetchRequest::get("https://example.com/").unwrap()]
//!     }
//!
//!     async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
//!         Ok(FetchResponse::ok(request.clone(), "hello"))
//!     }
//!
//!     fn parse<'a>(&'a self, response: FetchResponse) -> ParseStream<'a> {
//!         let record = Record::new().with_field("body", response.body);
//!         stream::iter(vec![Ok(ParseYield::Record(record))]).boxed()
//!     }
//! }
//! ```

use crate::model::{FetchRequest, FetchResponse, ParseYield};
use crate::{FetchError, ParseError};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy, finite, non-restartable parse output
///
/// An `Err` item ends consumption of the stream and counts as a failed attempt.
pub type ParseStream<'a> = BoxStream<'a, Result<ParseYield, ParseError>>;

/// Defines what to fetch and how to interpret responses
#[async_trait]
pub trait Source: Send + Sync + 'static {
    /// Name used in logs and by writer stages for output file names
    fn name(&self) -> &str;

    /// Seed requests, enqueued in order at the start of a run
    fn initial_requests(&self) -> Vec<FetchRequest>;

    /// Performs one fetch attempt
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;

    /// Turns a response into records and follow-up requests
    fn parse<'a>(&'a self, response: FetchResponse) -> ParseStream<'a>;

    /// Called exactly once per run, after the stage chain has been closed
    async fn closed(&self) {}
}
