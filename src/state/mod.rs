//! State module for tracking engine lifecycle
//!
//! - `EngineState`: the `idle → running → draining → stopped` lifecycle of a crawl run

mod engine_state;

pub use engine_state::EngineState;
