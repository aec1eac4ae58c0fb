use crate::crawler::Source;
use crate::model::Record;
use crate::pipeline::traits::{Stage, StageResult};
use async_trait::async_trait;

/// Drops records whose required fields are missing or empty
#[derive(Debug, Default)]
pub struct ValidationStage {
    rejected: u64,
}

impl ValidationStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records rejected since the last `open`
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &str {
        "validation"
    }

    async fn open(&mut self, _source: &dyn Source) -> StageResult<()> {
        self.rejected = 0;
        Ok(())
    }

    async fn process(&mut self, record: Record, source: &dyn Source) -> StageResult<Option<Record>> {
        if record.is_valid() {
            return Ok(Some(record));
        }

        self.rejected += 1;
        tracing::warn!(
            "[{}] Record failed validation (required: {:?}), dropping: {}",
            source.name(),
            record.required(),
            record.to_json()
        );
        Ok(None)
    }

    async fn close(&mut self, source: &dyn Source) -> StageResult<()> {
        if self.rejected > 0 {
            tracing::info!("[{}] Validation rejected {} records", source.name(), self.rejected);
        }
        Ok(())
    }
}
