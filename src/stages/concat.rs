//! Concatenation stage.
//!
//! Joins the ordered, tagged inputs of each descriptor into one vector-typed
//! destination column. A scalar input contributes one slot per row, a vector
//! input contributes its own slots. The input tags are recorded as slot tags
//! on the destination's metadata so downstream consumers can tell replaced
//! values apart from indicator flags.
//!
//! When the destination name already exists (the usual case: the handled
//! column keeps its name), the column is rewritten in place and keeps its
//! schema position.

use anyhow::{Result, anyhow, bail};

use crate::{
    dataset::{Cell, Dataset},
    schema::{ColumnMeta, ColumnType, SlotTag},
    stages::Stage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatInput {
    pub tag: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatColumn {
    pub dest: String,
    pub inputs: Vec<ConcatInput>,
}

pub struct ConcatStage {
    columns: Vec<ConcatColumn>,
}

impl ConcatStage {
    pub fn new(columns: Vec<ConcatColumn>) -> Self {
        Self { columns }
    }
}

impl Stage for ConcatStage {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn apply(&self, mut data: Dataset) -> Result<Dataset> {
        for descriptor in &self.columns {
            if descriptor.inputs.is_empty() {
                bail!("Concatenation into '{}' has no inputs", descriptor.dest);
            }
            let mut item = None;
            let mut widths = Vec::with_capacity(descriptor.inputs.len());
            for input in &descriptor.inputs {
                let meta = data
                    .schema
                    .column(&input.source)
                    .ok_or_else(|| anyhow!("Column '{}' does not exist", input.source))?;
                let input_item = meta.datatype.item_kind();
                match item {
                    None => item = Some(input_item),
                    Some(expected) if expected == input_item => {}
                    Some(expected) => bail!(
                        "Cannot concatenate '{}' ({input_item}) into '{}' ({expected})",
                        input.source,
                        descriptor.dest
                    ),
                }
                let width = if meta.datatype.is_vector() {
                    data.column_cells(&input.source)
                        .map(|cells| cells.iter().map(Cell::slot_count).max().unwrap_or(0))
                        .unwrap_or(0)
                } else {
                    1
                };
                widths.push(width);
            }
            let item = item.ok_or_else(|| {
                anyhow!("Concatenation into '{}' has no inputs", descriptor.dest)
            })?;

            let rows = data.row_count();
            let mut cells = Vec::with_capacity(rows);
            for row in 0..rows {
                let mut slots = Vec::new();
                for input in &descriptor.inputs {
                    let column = data
                        .column_cells(&input.source)
                        .ok_or_else(|| anyhow!("Column '{}' does not exist", input.source))?;
                    match &column[row] {
                        Cell::Scalar(value) => slots.push(value.clone()),
                        Cell::Vector(values) => slots.extend(values.iter().cloned()),
                    }
                }
                cells.push(Cell::Vector(slots));
            }

            let mut meta = ColumnMeta::new(descriptor.dest.clone(), ColumnType::Vector(item));
            meta.slot_tags = descriptor
                .inputs
                .iter()
                .zip(&widths)
                .map(|(input, width)| SlotTag {
                    name: input.tag.clone(),
                    width: *width,
                })
                .collect();

            if data.schema.contains(&descriptor.dest) {
                data.replace_column(&descriptor.dest, meta, cells)?;
            } else {
                data.add_column(meta, cells)?;
            }
        }
        Ok(data)
    }
}
