//! Missing-value indicator stage.
//!
//! Appends one boolean column per descriptor, true wherever the source value
//! is missing. Vector sources produce a vector of flags with each row's own
//! slot count.

use anyhow::{Result, anyhow};

use crate::{
    dataset::{Cell, Dataset, Value},
    schema::{ColumnMeta, ColumnType, ItemKind},
    stages::Stage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorColumn {
    /// Name of the boolean column to create.
    pub name: String,
    /// Column whose missing entries are flagged.
    pub source: String,
}

pub struct IndicatorStage {
    columns: Vec<IndicatorColumn>,
}

impl IndicatorStage {
    pub fn new(columns: Vec<IndicatorColumn>) -> Self {
        Self { columns }
    }
}

impl Stage for IndicatorStage {
    fn name(&self) -> &'static str {
        "indicator"
    }

    fn apply(&self, mut data: Dataset) -> Result<Dataset> {
        for descriptor in &self.columns {
            let source_meta = data
                .schema
                .column(&descriptor.source)
                .ok_or_else(|| anyhow!("Column '{}' does not exist", descriptor.source))?;
            let datatype = if source_meta.datatype.is_vector() {
                ColumnType::Vector(ItemKind::Boolean)
            } else {
                ColumnType::Scalar(ItemKind::Boolean)
            };
            let cells = data
                .column_cells(&descriptor.source)
                .ok_or_else(|| anyhow!("Column '{}' does not exist", descriptor.source))?
                .iter()
                .map(|cell| match cell {
                    Cell::Scalar(value) => {
                        Cell::Scalar(Some(Value::Boolean(value.is_none())))
                    }
                    Cell::Vector(slots) => Cell::Vector(
                        slots
                            .iter()
                            .map(|slot| Some(Value::Boolean(slot.is_none())))
                            .collect(),
                    ),
                })
                .collect();
            data.add_column(ColumnMeta::new(descriptor.name.clone(), datatype), cells)?;
        }
        Ok(data)
    }
}
