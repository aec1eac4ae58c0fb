use crate::crawler::Source;
use crate::model::Record;
use crate::StageError;
use async_trait::async_trait;

/// Result type for stage operations
pub type StageResult<T> = Result<T, StageError>;

/// One link in the record processing chain
///
/// `open` runs once per crawl before any record, `close` runs once per crawl after
/// the last one, even when the run ends in failure. Errors from any method are
/// not retried and end the current crawl.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name used in logs and error messages; must be non-empty and unique
    /// within a chain
    fn name(&self) -> &str;

    /// Prepares the stage for a run
    async fn open(&mut self, _source: &dyn Source) -> StageResult<()> {
        Ok(())
    }

    /// Transforms a record, or returns `Ok(None)` to drop it
    async fn process(&mut self, record: Record, source: &dyn Source) -> StageResult<Option<Record>>;

    /// Flushes buffered output at the end of a run
    async fn close(&mut self, _source: &dyn Source) -> StageResult<()> {
        Ok(())
    }
}
