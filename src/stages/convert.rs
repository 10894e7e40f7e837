//! Boolean column conversion stage.
//!
//! Rewrites a boolean column in place into a numeric item kind so it can be
//! concatenated with a replacement column of that kind. Missing slots stay
//! missing.

use anyhow::{Result, anyhow, bail};

use crate::{
    convert::bool_conversion,
    dataset::{Cell, Dataset, Value},
    schema::{ColumnMeta, ColumnType, ItemKind},
    stages::Stage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertColumn {
    /// Output column name; conversions run in place, so this matches `source`.
    pub name: String,
    pub source: String,
    pub target: ItemKind,
}

pub struct ConvertStage {
    columns: Vec<ConvertColumn>,
}

impl ConvertStage {
    pub fn new(columns: Vec<ConvertColumn>) -> Self {
        Self { columns }
    }
}

fn convert_slot(
    slot: &Option<Value>,
    conversion: crate::convert::BoolConversion,
    column: &str,
) -> Result<Option<Value>> {
    match slot {
        None => Ok(None),
        Some(Value::Boolean(flag)) => Ok(Some(conversion.apply(*flag))),
        Some(other) => bail!(
            "Column '{column}' holds a {} value; conversion expects booleans",
            other.kind()
        ),
    }
}

impl Stage for ConvertStage {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn apply(&self, mut data: Dataset) -> Result<Dataset> {
        for descriptor in &self.columns {
            let conversion = bool_conversion(descriptor.target).ok_or_else(|| {
                anyhow!(
                    "No standard conversion from boolean to {}",
                    descriptor.target
                )
            })?;
            let source_meta = data
                .schema
                .column(&descriptor.source)
                .ok_or_else(|| anyhow!("Column '{}' does not exist", descriptor.source))?;
            let datatype = if source_meta.datatype.is_vector() {
                ColumnType::Vector(descriptor.target)
            } else {
                ColumnType::Scalar(descriptor.target)
            };
            let cells = data
                .column_cells(&descriptor.source)
                .ok_or_else(|| anyhow!("Column '{}' does not exist", descriptor.source))?
                .iter()
                .map(|cell| match cell {
                    Cell::Scalar(value) => {
                        convert_slot(value, conversion, &descriptor.source).map(Cell::Scalar)
                    }
                    Cell::Vector(slots) => slots
                        .iter()
                        .map(|slot| convert_slot(slot, conversion, &descriptor.source))
                        .collect::<Result<Vec<_>>>()
                        .map(Cell::Vector),
                })
                .collect::<Result<Vec<_>>>()?;
            data.replace_column(
                &descriptor.source,
                ColumnMeta::new(descriptor.name.clone(), datatype),
                cells,
            )?;
        }
        Ok(data)
    }
}
