//! JSON output stage
//!
//! Buffers every record it sees and writes them as one pretty-printed JSON array
//! when the run closes.

use crate::crawler::Source;
use crate::model::Record;
use crate::pipeline::output_file_path;
use crate::pipeline::traits::{Stage, StageResult};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

/// Collects records and writes `<source-name>-<timestamp>.json` on close
#[derive(Debug)]
pub struct JsonWriterStage {
    directory: PathBuf,
    records: Vec<Record>,
    last_output: Option<PathBuf>,
}

impl JsonWriterStage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            records: Vec::new(),
            last_output: None,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file written by the most recent `close`
    pub fn last_output(&self) -> Option<&Path> {
        self.last_output.as_deref()
    }
}

#[async_trait]
impl Stage for JsonWriterStage {
    fn name(&self) -> &str {
        "json-writer"
    }

    async fn open(&mut self, source: &dyn Source) -> StageResult<()> {
        fs::create_dir_all(&self.directory)?;
        self.records.clear();
        tracing::debug!(
            "[{}] JSON writer ready in {}",
            source.name(),
            self.directory.display()
        );
        Ok(())
    }

    async fn process(&mut self, record: Record, _source: &dyn Source) -> StageResult<Option<Record>> {
        self.records.push(record.clone());
        Ok(Some(record))
    }

    async fn close(&mut self, source: &dyn Source) -> StageResult<()> {
        let path = output_file_path(&self.directory, source.name(), "json");
        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(&path, json)?;

        tracing::info!("Saved {} records to {}", self.records.len(), path.display());
        self.records.clear();
        self.last_output = Some(path);
        Ok(())
    }
}
