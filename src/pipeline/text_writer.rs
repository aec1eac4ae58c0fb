//! Plain-text output stage
//!
//! Produces a human-readable report: a banner, one block per record, and a footer
//! with the completion time.

use crate::crawler::Source;
use crate::model::Record;
use crate::pipeline::output_file_path;
use crate::pipeline::traits::{Stage, StageResult};
use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Strings longer than this are truncated in the report
const LONG_VALUE_CHARS: usize = 1000;

/// Number of characters kept from a truncated string
const TRUNCATED_CHARS: usize = 500;

const RULE_WIDTH: usize = 60;

/// Formats records into a text report written to `<source-name>-<timestamp>.txt`
#[derive(Debug)]
pub struct TextWriterStage {
    directory: PathBuf,
    buffer: String,
    last_output: Option<PathBuf>,
}

impl TextWriterStage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            buffer: String::new(),
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

/// Formats one record as a report block
pub fn format_record_block(record: &Record) -> String {
    let mut block = String::new();
    let _ = writeln!(block, "--- Record {} ---", Local::now().format("%Y-%m-%d %H:%M:%S"));

    for (key, value) in record.fields() {
        match value {
            Value::String(s) if s.chars().count() > LONG_VALUE_CHARS => {
                let head: String = s.chars().take(TRUNCATED_CHARS).collect();
                let _ = writeln!(block, "{}: {}...", key, head);
            }
            Value::String(s) => {
                let _ = writeln!(block, "{}: {}", key, s);
            }
            Value::Array(items) => {
                let _ = writeln!(block, "{}: [", key);
                for (i, item) in items.iter().enumerate() {
                    let _ = writeln!(block, "  {}. {}", i + 1, display_value(item));
                }
                let _ = writeln!(block, "]");
            }
            other => {
                let _ = writeln!(block, "{}: {}", key, other);
            }
        }
    }

    block.push('\n');
    block
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

#[async_trait]
impl Stage for TextWriterStage {
    fn name(&self) -> &str {
        "text-writer"
    }

    async fn open(&mut self, source: &dyn Source) -> StageResult<()> {
        fs::create_dir_all(&self.directory)?;

        self.buffer.clear();
        let _ = writeln!(self.buffer, "{}", rule());
        let _ = writeln!(self.buffer, "Sumi-Crawl results");
        let _ = writeln!(self.buffer, "Source: {}", source.name());
        let _ = writeln!(self.buffer, "Started: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(self.buffer, "{}\n", rule());
        Ok(())
    }

    async fn process(&mut self, record: Record, _source: &dyn Source) -> StageResult<Option<Record>> {
        self.buffer.push_str(&format_record_block(&record));
        Ok(Some(record))
    }

    async fn close(&mut self, source: &dyn Source) -> StageResult<()> {
        let _ = writeln!(self.buffer, "{}", rule());
        let _ = writeln!(self.buffer, "Finished: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(self.buffer, "{}", rule());

        let path = output_file_path(&self.directory, source.name(), "txt");
        fs::write(&path, &self.buffer)?;
        tracing::info!("Saved text report to {}", path.display());

        self.buffer.clear();
        self.last_output = Some(path);
        Ok(())
    }
}
