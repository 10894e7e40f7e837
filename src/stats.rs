//! Replacement statistics over typed values.
//!
//! The replacement stage feeds every observed (non-missing) value of a column
//! into a [`SlotAccumulator`] — one per vector slot when imputing by slot,
//! a single pooled one otherwise — and asks for the minimum, maximum, or mean
//! once the pass is complete. Statistics a kind cannot support surface as
//! errors at that point, not earlier.

use std::cmp::Ordering;

use anyhow::{Result, bail};

use crate::{
    dataset::Value,
    schema::ItemKind,
};

/// Orders two values of the same item kind. Heterogeneous pairs cannot occur
/// for cells parsed against one column type and compare as equal.
fn value_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlotAccumulator {
    count: usize,
    sum: f64,
    min: Option<Value>,
    max: Option<Value>,
}

impl SlotAccumulator {
    pub fn observe(&mut self, value: &Value) {
        self.count += 1;
        match value {
            Value::Integer(i) => self.sum += *i as f64,
            Value::Float(f) => self.sum += f,
            _ => {}
        }
        match &self.min {
            Some(current) if value_cmp(value, current) != Ordering::Less => {}
            _ => self.min = Some(value.clone()),
        }
        match &self.max {
            Some(current) if value_cmp(value, current) != Ordering::Greater => {}
            _ => self.max = Some(value.clone()),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean of the observed values; integer columns round half away from zero.
    pub fn mean(&self, kind: ItemKind) -> Result<Option<Value>> {
        match kind {
            ItemKind::Float | ItemKind::Integer => {}
            other => bail!("Mean replacement is not supported for {other} values"),
        }
        if self.count == 0 {
            return Ok(None);
        }
        let mean = self.sum / self.count as f64;
        Ok(Some(match kind {
            ItemKind::Float => Value::Float(mean),
            _ => Value::Integer(mean.round() as i64),
        }))
    }

    pub fn minimum(&self, kind: ItemKind) -> Result<Option<Value>> {
        ensure_ordered_kind(kind)?;
        Ok(self.min.clone())
    }

    pub fn maximum(&self, kind: ItemKind) -> Result<Option<Value>> {
        ensure_ordered_kind(kind)?;
        Ok(self.max.clone())
    }
}

fn ensure_ordered_kind(kind: ItemKind) -> Result<()> {
    match kind {
        ItemKind::Integer | ItemKind::Float | ItemKind::Date => Ok(()),
        other => bail!("Minimum/maximum replacement is not supported for {other} values"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn mean_of_floats() {
        let mut acc = SlotAccumulator::default();
        acc.observe(&Value::Float(1.0));
        acc.observe(&Value::Float(2.0));
        acc.observe(&Value::Float(6.0));
        assert_eq!(acc.mean(ItemKind::Float).unwrap(), Some(Value::Float(3.0)));
    }

    #[test]
    fn integer_mean_rounds() {
        let mut acc = SlotAccumulator::default();
        acc.observe(&Value::Integer(1));
        acc.observe(&Value::Integer(2));
        assert_eq!(
            acc.mean(ItemKind::Integer).unwrap(),
            Some(Value::Integer(2))
        );
    }

    #[test]
    fn min_max_track_dates() {
        let mut acc = SlotAccumulator::default();
        let early = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let late = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        acc.observe(&Value::Date(late));
        acc.observe(&Value::Date(early));
        assert_eq!(
            acc.minimum(ItemKind::Date).unwrap(),
            Some(Value::Date(early))
        );
        assert_eq!(acc.maximum(ItemKind::Date).unwrap(), Some(Value::Date(late)));
    }

    #[test]
    fn mean_of_dates_is_an_error() {
        let acc = SlotAccumulator::default();
        let err = acc.mean(ItemKind::Date).unwrap_err();
        assert!(err.to_string().contains("not supported for Date"));
    }

    #[test]
    fn empty_accumulator_yields_no_statistic() {
        let acc = SlotAccumulator::default();
        assert_eq!(acc.mean(ItemKind::Float).unwrap(), None);
        assert_eq!(acc.minimum(ItemKind::Float).unwrap(), None);
    }
}
