//! Typed in-memory datasets.
//!
//! A [`Dataset`] pairs a [`Schema`] with column-major cell storage. Cells are
//! [`Cell::Scalar`] or [`Cell::Vector`]; a missing value is `None`, per slot
//! for vectors. In CSV form, vector cells are `|`-joined slot lists and an
//! empty field is a missing value.

use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;

use crate::schema::{ColumnMeta, ColumnType, ItemKind, Schema};

pub const VECTOR_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ItemKind {
        match self {
            Value::Boolean(_) => ItemKind::Boolean,
            Value::Integer(_) => ItemKind::Integer,
            Value::Float(_) => ItemKind::Float,
            Value::Date(_) => ItemKind::Date,
            Value::Text(_) => ItemKind::Text,
        }
    }

    /// Zero value of an item kind, used for default-value replacement.
    pub fn default_for(kind: ItemKind) -> Value {
        match kind {
            ItemKind::Boolean => Value::Boolean(false),
            ItemKind::Integer => Value::Integer(0),
            ItemKind::Float => Value::Float(0.0),
            ItemKind::Date => Value::Date(NaiveDate::default()),
            ItemKind::Text => Value::Text(String::new()),
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_item(value: &str, kind: ItemKind) -> Result<Value> {
    let parsed = match kind {
        ItemKind::Text => Value::Text(value.to_string()),
        ItemKind::Integer => {
            let parsed: i64 = value
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as integer"))?;
            Value::Integer(parsed)
        }
        ItemKind::Float => {
            let parsed: f64 = value
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as float"))?;
            Value::Float(parsed)
        }
        ItemKind::Boolean => {
            let lowered = value.to_ascii_lowercase();
            let parsed = match lowered.as_str() {
                "true" | "t" | "yes" | "y" | "1" => true,
                "false" | "f" | "no" | "n" | "0" => false,
                _ => bail!("Failed to parse '{value}' as boolean"),
            };
            Value::Boolean(parsed)
        }
        ItemKind::Date => Value::Date(parse_naive_date(value)?),
    };
    Ok(parsed)
}

/// One row entry of a column: a single optional value, or a slot list.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Scalar(Option<Value>),
    Vector(Vec<Option<Value>>),
}

impl Cell {
    pub fn as_display(&self) -> String {
        match self {
            Cell::Scalar(value) => value.as_ref().map(Value::as_display).unwrap_or_default(),
            Cell::Vector(slots) => slots
                .iter()
                .map(|slot| slot.as_ref().map(Value::as_display).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(&VECTOR_SEPARATOR.to_string()),
        }
    }

    pub fn slot_count(&self) -> usize {
        match self {
            Cell::Scalar(_) => 1,
            Cell::Vector(slots) => slots.len(),
        }
    }
}

pub fn parse_cell(raw: &str, datatype: &ColumnType) -> Result<Cell> {
    match datatype {
        ColumnType::Scalar(kind) => {
            if raw.is_empty() {
                Ok(Cell::Scalar(None))
            } else {
                Ok(Cell::Scalar(Some(parse_item(raw, *kind)?)))
            }
        }
        ColumnType::Vector(kind) => {
            if raw.is_empty() {
                return Ok(Cell::Vector(Vec::new()));
            }
            let slots = raw
                .split(VECTOR_SEPARATOR)
                .map(|slot| {
                    if slot.is_empty() {
                        Ok(None)
                    } else {
                        parse_item(slot, *kind).map(Some)
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Cell::Vector(slots))
        }
    }
}

/// Parses one raw CSV row into typed cells using the schema's column order.
pub fn parse_row(schema: &Schema, raw: &[String]) -> Result<Vec<Cell>> {
    schema
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = raw.get(idx).map(|s| s.as_str()).unwrap_or("");
            parse_cell(value, &column.datatype)
                .with_context(|| format!("Column '{}'", column.name))
        })
        .collect()
}

/// Column-major dataset: one cell vector per schema column, row-aligned.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: Schema,
    columns: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(schema: Schema) -> Self {
        let columns = vec![Vec::new(); schema.columns.len()];
        Self { schema, columns }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn column_cells(&self, name: &str) -> Option<&[Cell]> {
        let idx = self.schema.column_index(name)?;
        Some(&self.columns[idx])
    }

    pub fn push_row(&mut self, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.schema.columns.len() {
            bail!(
                "Row has {} cell(s) but the schema defines {} column(s)",
                cells.len(),
                self.schema.columns.len()
            );
        }
        for (column, cell) in self.columns.iter_mut().zip(cells) {
            column.push(cell);
        }
        Ok(())
    }

    /// Appends a new column; the cell count must match the current row count.
    pub fn add_column(&mut self, meta: ColumnMeta, cells: Vec<Cell>) -> Result<()> {
        if self.schema.contains(&meta.name) {
            bail!("Column '{}' already exists", meta.name);
        }
        if !self.columns.is_empty() && cells.len() != self.row_count() {
            bail!(
                "Column '{}' has {} cell(s) but the dataset has {} row(s)",
                meta.name,
                cells.len(),
                self.row_count()
            );
        }
        self.schema.columns.push(meta);
        self.columns.push(cells);
        Ok(())
    }

    /// Replaces an existing column's metadata and cells in place, keeping its
    /// position in the schema.
    pub fn replace_column(&mut self, name: &str, meta: ColumnMeta, cells: Vec<Cell>) -> Result<()> {
        let idx = self
            .schema
            .column_index(name)
            .ok_or_else(|| anyhow!("Column '{name}' does not exist"))?;
        if cells.len() != self.row_count() {
            bail!(
                "Column '{}' has {} cell(s) but the dataset has {} row(s)",
                meta.name,
                cells.len(),
                self.row_count()
            );
        }
        self.schema.columns[idx] = meta;
        self.columns[idx] = cells;
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Result<()> {
        let idx = self
            .schema
            .column_index(name)
            .ok_or_else(|| anyhow!("Column '{name}' does not exist"))?;
        self.schema.columns.remove(idx);
        self.columns.remove(idx);
        Ok(())
    }

    /// Renders row `index` as display strings in schema column order.
    pub fn render_row(&self, index: usize) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                column
                    .get(index)
                    .map(Cell::as_display)
                    .unwrap_or_default()
            })
            .collect()
    }
}
