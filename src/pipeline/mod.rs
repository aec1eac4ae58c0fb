//! Record processing pipeline
//!
//! This module handles:
//! - The `Stage` contract (open / process / close)
//! - Ordered chaining of stages with drop short-circuiting
//! - Built-in stages for validation and JSON / text output

mod chain;
mod json_writer;
mod text_writer;
mod traits;
mod validation;

pub use chain::{ChainOutcome, StageChain};
pub use json_writer::JsonWriterStage;
pub use text_writer::TextWriterStage;
pub use traits::{Stage, StageResult};
pub use validation::ValidationStage;

use chrono::Utc;
use std::path::{Path, PathBuf};

/// Builds `<directory>/<source-name>-<timestamp>.<extension>`
///
/// The timestamp is UTC with `:` and `.` replaced so the name is portable.
pub(crate) fn output_file_path(directory: &Path, source_name: &str, extension: &str) -> PathBuf {
    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
    directory.join(format!("{}-{}.{}", source_name, timestamp, extension))
}
