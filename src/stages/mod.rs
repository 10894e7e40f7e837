//! Dataset transformation stages.
//!
//! Each stage consumes a [`Dataset`] and produces a new one with its columns
//! added, rewritten, or removed. Stages are composable: the planner chains
//! them into a [`Pipeline`] which applies them left to right.

use std::fmt;

use anyhow::Result;
use log::debug;

use crate::dataset::Dataset;

pub mod concat;
pub mod convert;
pub mod drop;
pub mod indicator;
pub mod replace;

pub trait Stage {
    fn name(&self) -> &'static str;

    fn apply(&self, data: Dataset) -> Result<Dataset>;
}

/// An ordered chain of stages produced by one pipeline assembly.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub(crate) fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn apply(&self, mut data: Dataset) -> Result<Dataset> {
        for stage in &self.stages {
            debug!(
                "Applying stage '{}' to {} row(s)",
                stage.name(),
                data.row_count()
            );
            data = stage.apply(data)?;
        }
        Ok(data)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
