//! Ordered stage chain
//!
//! Records pass through stages strictly in order. The first stage to return
//! `None` ends the record's lifecycle and later stages never see it.

use crate::crawler::Source;
use crate::model::Record;
use crate::pipeline::traits::Stage;
use crate::{ConfigError, StageError};
use std::collections::HashSet;

/// Result of routing one record through the chain
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// Every stage accepted; carries the final transformed record
    Accepted(Record),

    /// Dropped by the named stage
    Dropped { stage: String },
}

/// Validated, ordered list of stages
pub struct StageChain {
    stages: Vec<Box<dyn Stage>>,
    /// Number of leading stages whose `open` succeeded and whose `close` is pending
    opened: usize,
}

impl std::fmt::Debug for StageChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageChain")
            .field("stages", &self.names())
            .field("opened", &self.opened)
            .finish()
    }
}

impl Default for StageChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl StageChain {
    /// Builds a chain, rejecting unnamed or duplicate-named stages
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for (index, stage) in stages.iter().enumerate() {
            let name = stage.name();
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "stage at position {} has an empty name",
                    index
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate stage name '{}'",
                    name
                )));
            }
        }

        Ok(Self { stages, opened: 0 })
    }

    /// A chain with no stages; every record is accepted unchanged
    pub fn empty() -> Self {
        Self {
            stages: Vec::new(),
            opened: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Opens every stage in order
    ///
    /// Stops at the first failure. Stages opened before it stay open so that
    /// [`StageChain::close`] still closes them.
    pub async fn open(&mut self, source: &dyn Source) -> Result<(), StageError> {
        for stage in self.stages.iter_mut().skip(self.opened) {
            tracing::debug!("Opening stage '{}'", stage.name());
            stage.open(source).await?;
            self.opened += 1;
        }
        Ok(())
    }

    /// Routes one record through the stages in order
    pub async fn process(
        &mut self,
        record: Record,
        source: &dyn Source,
    ) -> Result<ChainOutcome, StageError> {
        let mut current = record;
        for stage in self.stages.iter_mut() {
            match stage.process(current, source).await? {
                Some(next) => current = next,
                None => {
                    tracing::debug!("Stage '{}' dropped record", stage.name());
                    return Ok(ChainOutcome::Dropped {
                        stage: stage.name().to_string(),
                    });
                }
            }
        }
        Ok(ChainOutcome::Accepted(current))
    }

    /// Closes every opened stage in order
    ///
    /// A failing `close` does not prevent later stages from closing; the first
    /// error is returned once all have been attempted.
    pub async fn close(&mut self, source: &dyn Source) -> Result<(), StageError> {
        let mut first_error = None;
        for stage in self.stages.iter_mut().take(self.opened) {
            tracing::debug!("Closing stage '{}'", stage.name());
            if let Err(e) = stage.close(source).await {
                tracing::error!("Stage '{}' failed to close: {}", stage.name(), e);
                first_error.get_or_insert(e);
            }
        }
        self.opened = 0;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
