//! Value-replacement stage.
//!
//! Fills missing entries of a source column and writes the result to the
//! descriptor's destination: in place when destination equals source, as a
//! new column otherwise. Statistics-based kinds (mean/min/max) run one
//! observation pass first; vector columns accumulate per slot when
//! `impute_by_slot` is set and pool every slot otherwise.

use anyhow::{Context, Result, anyhow};
use log::debug;

use crate::{
    dataset::{Cell, Dataset, Value},
    request::ReplacementKind,
    schema::ColumnMeta,
    stages::Stage,
    stats::SlotAccumulator,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceColumn {
    pub source: String,
    pub dest: String,
    pub kind: ReplacementKind,
    pub impute_by_slot: bool,
}

pub struct ReplaceStage {
    columns: Vec<ReplaceColumn>,
}

impl ReplaceStage {
    pub fn new(columns: Vec<ReplaceColumn>) -> Self {
        Self { columns }
    }
}

/// Replacement values for one column: one per slot, or a single pooled value.
enum Replacement {
    Pooled(Value),
    PerSlot(Vec<Value>),
}

impl Replacement {
    fn for_slot(&self, index: usize, fallback: &Value) -> Value {
        match self {
            Replacement::Pooled(value) => value.clone(),
            Replacement::PerSlot(values) => {
                values.get(index).cloned().unwrap_or_else(|| fallback.clone())
            }
        }
    }
}

fn statistic(
    accumulator: &SlotAccumulator,
    kind: ReplacementKind,
    item: crate::schema::ItemKind,
) -> Result<Option<Value>> {
    match kind {
        ReplacementKind::Mean => accumulator.mean(item),
        ReplacementKind::Minimum => accumulator.minimum(item),
        ReplacementKind::Maximum => accumulator.maximum(item),
        ReplacementKind::DefaultValue => Ok(Some(Value::default_for(item))),
    }
}

impl Stage for ReplaceStage {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn apply(&self, mut data: Dataset) -> Result<Dataset> {
        for descriptor in &self.columns {
            let meta = data
                .schema
                .column(&descriptor.source)
                .ok_or_else(|| anyhow!("Column '{}' does not exist", descriptor.source))?;
            let datatype = meta.datatype;
            let item = datatype.item_kind();
            let default = Value::default_for(item);
            let cells = data
                .column_cells(&descriptor.source)
                .ok_or_else(|| anyhow!("Column '{}' does not exist", descriptor.source))?;

            let by_slot = descriptor.impute_by_slot && datatype.is_vector();
            let replacement = if descriptor.kind == ReplacementKind::DefaultValue {
                Replacement::Pooled(default.clone())
            } else if by_slot {
                let mut slots: Vec<SlotAccumulator> = Vec::new();
                for cell in cells {
                    if let Cell::Vector(values) = cell {
                        if slots.len() < values.len() {
                            slots.resize_with(values.len(), SlotAccumulator::default);
                        }
                        for (slot, value) in slots.iter_mut().zip(values) {
                            if let Some(value) = value {
                                slot.observe(value);
                            }
                        }
                    }
                }
                let values = slots
                    .iter()
                    .map(|slot| {
                        Ok(statistic(slot, descriptor.kind, item)
                            .with_context(|| {
                                format!("Replacing values in column '{}'", descriptor.source)
                            })?
                            .unwrap_or_else(|| default.clone()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Replacement::PerSlot(values)
            } else {
                let mut pooled = SlotAccumulator::default();
                for cell in cells {
                    match cell {
                        Cell::Scalar(Some(value)) => pooled.observe(value),
                        Cell::Vector(values) => {
                            for value in values.iter().flatten() {
                                pooled.observe(value);
                            }
                        }
                        Cell::Scalar(None) => {}
                    }
                }
                if pooled.count() == 0 {
                    debug!(
                        "Column '{}' has no observed values; falling back to the default",
                        descriptor.source
                    );
                }
                let value = statistic(&pooled, descriptor.kind, item)
                    .with_context(|| {
                        format!("Replacing values in column '{}'", descriptor.source)
                    })?
                    .unwrap_or_else(|| default.clone());
                Replacement::Pooled(value)
            };

            let filled = cells
                .iter()
                .map(|cell| match cell {
                    Cell::Scalar(value) => Cell::Scalar(Some(
                        value
                            .clone()
                            .unwrap_or_else(|| replacement.for_slot(0, &default)),
                    )),
                    Cell::Vector(values) => Cell::Vector(
                        values
                            .iter()
                            .enumerate()
                            .map(|(idx, value)| {
                                Some(value.clone().unwrap_or_else(|| {
                                    replacement.for_slot(idx, &default)
                                }))
                            })
                            .collect(),
                    ),
                })
                .collect();

            let dest_meta = ColumnMeta::new(descriptor.dest.clone(), datatype);
            if descriptor.dest == descriptor.source {
                data.replace_column(&descriptor.source, dest_meta, filled)?;
            } else {
                data.add_column(dest_meta, filled)?;
            }
        }
        Ok(data)
    }
}
