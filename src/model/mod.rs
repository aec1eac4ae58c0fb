//! Value types flowing through a crawl
//!
//! - `FetchRequest`: an outbound fetch plus opaque metadata (e.g. traversal depth)
//! - `FetchResponse`: the result of a fetch, produced and consumed by the source
//! - `Record`: one extracted result, routed through the stage chain
//! - `ParseYield`: one item of a source's lazy parse output

mod record;
mod request;
mod response;

pub use record::Record;
pub use request::{FetchRequest, Method, DEPTH_KEY};
pub use response::FetchResponse;

/// One value yielded while parsing a response
///
/// The variant is chosen by the source at the yield site.
#[derive(Debug, Clone)]
pub enum ParseYield {
    /// An extracted result to route through the stage chain
    Record(Record),

    /// A newly discovered request to append to the frontier
    Request(FetchRequest),
}

impl From<Record> for ParseYield {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<FetchRequest> for ParseYield {
    fn from(request: FetchRequest) -> Self {
        Self::Request(request)
    }
}
