//! Column-removal stage. Strips the temporary columns a pipeline created so
//! they never appear in the final schema.

use anyhow::Result;

use crate::{dataset::Dataset, stages::Stage};

pub struct DropStage {
    names: Vec<String>,
}

impl DropStage {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl Stage for DropStage {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn apply(&self, mut data: Dataset) -> Result<Dataset> {
        for name in &self.names {
            data.remove_column(name)?;
        }
        Ok(data)
    }
}
