//! The narrow type-conversion capability consumed by the pipeline planner.
//!
//! Indicator flags are boolean-valued; to sit alongside a replaced value in
//! one concatenated output they must be coercible into that value's element
//! type. This module answers exactly one question: does a standard conversion
//! from boolean to a given [`ItemKind`] exist, and is it the identity.

use crate::{dataset::Value, schema::ItemKind};

/// A supported boolean-to-item-kind conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolConversion {
    Identity,
    ToInteger,
    ToFloat,
}

impl BoolConversion {
    pub fn is_identity(&self) -> bool {
        matches!(self, BoolConversion::Identity)
    }

    pub fn apply(&self, flag: bool) -> Value {
        match self {
            BoolConversion::Identity => Value::Boolean(flag),
            BoolConversion::ToInteger => Value::Integer(i64::from(flag)),
            BoolConversion::ToFloat => Value::Float(if flag { 1.0 } else { 0.0 }),
        }
    }
}

/// Standard conversion from boolean to `target`, or `None` when no such
/// conversion exists (dates and free text cannot absorb an indicator flag).
pub fn bool_conversion(target: ItemKind) -> Option<BoolConversion> {
    match target {
        ItemKind::Boolean => Some(BoolConversion::Identity),
        ItemKind::Integer => Some(BoolConversion::ToInteger),
        ItemKind::Float => Some(BoolConversion::ToFloat),
        ItemKind::Date | ItemKind::Text => None,
    }
}
