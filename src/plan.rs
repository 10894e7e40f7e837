//! Missing-value pipeline planning.
//!
//! Turns a list of [`ColumnRequest`]s plus [`HandlingDefaults`] into a
//! composed [`Pipeline`] of up to five stages: indicator, conversion,
//! replacement, concatenation, drop. The planner only decides *what* runs —
//! which stages are needed, which temporary columns carry intermediate
//! results, and how indicator slots are tagged — and leaves execution to the
//! stage implementations.
//!
//! Planning is a single pass over the requests in caller order; that order is
//! significant, because it fixes the layout of the output schema. Any
//! per-column failure aborts the whole plan: there is no partial pipeline.

use log::debug;
use thiserror::Error;

use crate::{
    convert::bool_conversion,
    request::{ColumnRequest, HandlingDefaults, ReplacementKind},
    schema::{ItemKind, Schema, TempNameAllocator},
    stages::{
        Pipeline, Stage,
        concat::{ConcatColumn, ConcatInput, ConcatStage},
        convert::{ConvertColumn, ConvertStage},
        drop::DropStage,
        indicator::{IndicatorColumn, IndicatorStage},
        replace::{ReplaceColumn, ReplaceStage},
    },
};

/// Tag prefix for indicator slots and hint for indicator temp names.
pub const INDICATOR_HINT: &str = "IsMissing";
/// Hint for replacement temp names.
pub const REPLACEMENT_HINT: &str = "Replace";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("at least one column request is required")]
    InvalidSpecification,
    #[error("column '{0}' does not exist in the input schema")]
    UnknownColumn(String),
    #[error(
        "column '{name}' holds {item} values, which cannot absorb a boolean missing-value indicator"
    )]
    IncompatibleType { name: String, item: ItemKind },
}

/// A request with every optional field resolved against the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumnPlan {
    pub source: String,
    pub dest: String,
    pub kind: ReplacementKind,
    pub impute_by_slot: bool,
    pub needs_indicator: bool,
}

/// Resolves one request: each unset field falls back to the defaults.
pub fn resolve(request: &ColumnRequest, defaults: &HandlingDefaults) -> ResolvedColumnPlan {
    ResolvedColumnPlan {
        source: request.source.clone(),
        dest: request.dest.clone(),
        kind: request.kind.unwrap_or(defaults.kind),
        impute_by_slot: request.impute_by_slot.unwrap_or(defaults.impute_by_slot),
        needs_indicator: request.concat_indicator.unwrap_or(defaults.concat_indicator),
    }
}

/// How a column's indicator joins its replacement in the concatenated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatShape {
    /// The boolean flag must be converted into the source's item kind first.
    pub needs_conversion: bool,
    pub is_vector: bool,
    pub item: ItemKind,
}

/// Classifies a source column for indicator concatenation.
pub fn classify(schema: &Schema, source: &str) -> Result<ConcatShape, PlanError> {
    let meta = schema
        .column(source)
        .ok_or_else(|| PlanError::UnknownColumn(source.to_string()))?;
    let item = meta.datatype.item_kind();
    let conversion = bool_conversion(item).ok_or(PlanError::IncompatibleType {
        name: source.to_string(),
        item,
    })?;
    Ok(ConcatShape {
        needs_conversion: !conversion.is_identity(),
        is_vector: meta.datatype.is_vector(),
        item,
    })
}

/// Temp columns backing one indicator-bearing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempNamePair {
    pub indicator: String,
    pub replacement: String,
}

/// Stage inputs accumulated while planning, in request order.
#[derive(Debug, Default)]
pub struct StageLists {
    pub indicator: Vec<IndicatorColumn>,
    pub convert: Vec<ConvertColumn>,
    pub replace: Vec<ReplaceColumn>,
    pub concat: Vec<ConcatColumn>,
    pub drop: Vec<String>,
}

/// Plans the stage inputs for every request without constructing stages.
///
/// Temp names are allocated lazily, one [`TempNamePair`] per column that
/// actually needs an indicator; the pair count therefore always equals the
/// number of indicator-bearing plans.
pub fn plan_stages(
    schema: &Schema,
    requests: &[ColumnRequest],
    defaults: &HandlingDefaults,
) -> Result<StageLists, PlanError> {
    if requests.is_empty() {
        return Err(PlanError::InvalidSpecification);
    }
    let mut allocator = TempNameAllocator::new(schema);
    let mut lists = StageLists::default();
    for request in requests {
        let plan = resolve(request, defaults);
        if !plan.needs_indicator {
            lists.replace.push(ReplaceColumn {
                source: plan.source,
                dest: plan.dest,
                kind: plan.kind,
                impute_by_slot: plan.impute_by_slot,
            });
            continue;
        }

        let shape = classify(schema, &plan.source)?;
        let pair = TempNamePair {
            indicator: allocator.allocate(INDICATOR_HINT),
            replacement: allocator.allocate(REPLACEMENT_HINT),
        };

        lists.indicator.push(IndicatorColumn {
            name: pair.indicator.clone(),
            source: plan.source.clone(),
        });
        if shape.needs_conversion {
            lists.convert.push(ConvertColumn {
                name: pair.indicator.clone(),
                source: pair.indicator.clone(),
                target: shape.item,
            });
        }
        lists.replace.push(ReplaceColumn {
            source: plan.source.clone(),
            dest: pair.replacement.clone(),
            kind: plan.kind,
            impute_by_slot: plan.impute_by_slot,
        });

        // Vector outputs reuse a fixed sub-name for the indicator slot group;
        // scalar outputs qualify it with the source so sibling concatenations
        // stay distinguishable.
        let inputs = if shape.is_vector {
            vec![
                ConcatInput {
                    tag: pair.replacement.clone(),
                    source: pair.replacement.clone(),
                },
                ConcatInput {
                    tag: INDICATOR_HINT.to_string(),
                    source: pair.indicator.clone(),
                },
            ]
        } else {
            vec![
                ConcatInput {
                    tag: plan.source.clone(),
                    source: pair.replacement.clone(),
                },
                ConcatInput {
                    tag: format!("{INDICATOR_HINT}.{}", plan.source),
                    source: pair.indicator.clone(),
                },
            ]
        };
        lists.concat.push(ConcatColumn {
            dest: plan.dest,
            inputs,
        });
        lists.drop.push(pair.indicator);
        lists.drop.push(pair.replacement);
    }
    Ok(lists)
}

/// Assembles the composed pipeline, chaining only the stages whose input
/// list is non-empty.
pub fn assemble(
    schema: &Schema,
    requests: &[ColumnRequest],
    defaults: &HandlingDefaults,
) -> Result<Pipeline, PlanError> {
    let lists = plan_stages(schema, requests, defaults)?;
    // A conversion only ever rewrites an indicator column.
    debug_assert!(lists.convert.is_empty() || !lists.indicator.is_empty());

    let has_indicators = !lists.indicator.is_empty();
    let mut stages: Vec<Box<dyn Stage>> = Vec::new();
    if has_indicators {
        stages.push(Box::new(IndicatorStage::new(lists.indicator)));
    }
    if !lists.convert.is_empty() {
        stages.push(Box::new(ConvertStage::new(lists.convert)));
    }
    if !lists.replace.is_empty() {
        stages.push(Box::new(ReplaceStage::new(lists.replace)));
    }
    if has_indicators && !lists.concat.is_empty() {
        stages.push(Box::new(ConcatStage::new(lists.concat)));
    }
    if !lists.drop.is_empty() {
        stages.push(Box::new(DropStage::new(lists.drop)));
    }
    debug!(
        "Assembled missing-value pipeline with {} stage(s) for {} request(s)",
        stages.len(),
        requests.len()
    );
    Ok(Pipeline::new(stages))
}
