//! Column metadata for typed datasets.
//!
//! A [`Schema`] names each column and records its [`ColumnType`]: a scalar or
//! a vector of one [`ItemKind`]. Schemas round-trip through YAML `.meta`
//! files and can be inferred from a CSV sample via [`infer_schema()`].
//!
//! The schema also owns temporary-name generation: [`TempNameAllocator`] hands
//! out names guaranteed absent from the schema and from every name it has
//! already produced, so intermediate pipeline columns never collide.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{dataset, io_utils};

/// Element type of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Boolean,
    Integer,
    Float,
    Date,
    Text,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Boolean => "Boolean",
            ItemKind::Integer => "Integer",
            ItemKind::Float => "Float",
            ItemKind::Date => "Date",
            ItemKind::Text => "Text",
        }
    }
}

impl FromStr for ItemKind {
    type Err = anyhow::Error;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(ItemKind::Boolean),
            "integer" | "int" => Ok(ItemKind::Integer),
            "float" | "double" => Ok(ItemKind::Float),
            "date" => Ok(ItemKind::Date),
            "text" | "string" => Ok(ItemKind::Text),
            other => Err(anyhow!("Unknown item kind '{other}'")),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape and element type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Scalar(ItemKind),
    Vector(ItemKind),
}

impl ColumnType {
    pub fn item_kind(&self) -> ItemKind {
        match self {
            ColumnType::Scalar(kind) | ColumnType::Vector(kind) => *kind,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, ColumnType::Vector(_))
    }

    /// Signature string used in `.meta` files, e.g. `Float` or `Vector<Float>`.
    pub fn signature(&self) -> String {
        match self {
            ColumnType::Scalar(kind) => kind.as_str().to_string(),
            ColumnType::Vector(kind) => format!("Vector<{}>", kind.as_str()),
        }
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(token: &str) -> Result<Self> {
        let trimmed = token.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if let Some(rest) = lowered.strip_prefix("vector<") {
            let inner = rest
                .strip_suffix('>')
                .ok_or_else(|| anyhow!("Unterminated vector signature '{trimmed}'"))?;
            return Ok(ColumnType::Vector(ItemKind::from_str(inner)?));
        }
        Ok(ColumnType::Scalar(ItemKind::from_str(trimmed)?))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.signature())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ColumnType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

/// Named slot group inside a concatenated vector column.
///
/// Concatenation stages record where each input landed in the output vector;
/// the tag names come from the pipeline plan (the replacement input keeps its
/// column name, indicator slots carry an `IsMissing` tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTag {
    pub name: String,
    pub width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub datatype: ColumnType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slot_tags: Vec<SlotTag>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
            slot_tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default = "Schema::default_has_headers")]
    pub has_headers: bool,
}

impl Schema {
    fn default_has_headers() -> bool {
        true
    }

    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self {
            columns,
            schema_version: None,
            has_headers: true,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn validate_headers(&self, headers: &[String]) -> Result<()> {
        if headers.len() != self.columns.len() {
            bail!(
                "Schema defines {} column(s) but the input has {}",
                self.columns.len(),
                headers.len()
            );
        }
        for (column, header) in self.columns.iter().zip(headers) {
            if &column.name != header {
                bail!(
                    "Schema column '{}' does not match input header '{header}'",
                    column.name
                );
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self).context("Serializing schema YAML")?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: Schema = serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        Ok(schema)
    }
}

/// Hands out column names absent from a schema snapshot.
///
/// The allocator is scoped to one pipeline-assembly call; it remembers every
/// name it has returned, so repeated requests with the same hint yield
/// `hint_temp0`, `hint_temp1`, ... with collisions against existing columns
/// skipped over.
#[derive(Debug)]
pub struct TempNameAllocator {
    used: HashSet<String>,
    next: HashMap<String, usize>,
}

impl TempNameAllocator {
    pub fn new(schema: &Schema) -> Self {
        Self {
            used: schema.columns.iter().map(|c| c.name.clone()).collect(),
            next: HashMap::new(),
        }
    }

    pub fn allocate(&mut self, hint: &str) -> String {
        let counter = self.next.entry(hint.to_string()).or_insert(0);
        loop {
            let candidate = format!("{hint}_temp{}", *counter);
            *counter += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Per-column type candidate built up while sampling rows.
#[derive(Debug, Clone, Default)]
struct TypeCandidate {
    vector: bool,
    kind: Option<ItemKind>,
}

impl TypeCandidate {
    fn update(&mut self, raw: &str) {
        let slots: Vec<&str> = if raw.contains(dataset::VECTOR_SEPARATOR) {
            self.vector = true;
            raw.split(dataset::VECTOR_SEPARATOR).collect()
        } else {
            vec![raw]
        };
        for slot in slots {
            let trimmed = slot.trim();
            if trimmed.is_empty() {
                continue;
            }
            let observed = classify_item(trimmed);
            self.kind = Some(match self.kind {
                Some(current) => widen(current, observed),
                None => observed,
            });
        }
    }

    fn decide(&self) -> ColumnType {
        let kind = self.kind.unwrap_or(ItemKind::Text);
        if self.vector {
            ColumnType::Vector(kind)
        } else {
            ColumnType::Scalar(kind)
        }
    }
}

fn classify_item(value: &str) -> ItemKind {
    let lowered = value.to_ascii_lowercase();
    if matches!(
        lowered.as_str(),
        "true" | "false" | "t" | "f" | "yes" | "no" | "y" | "n"
    ) {
        return ItemKind::Boolean;
    }
    if value.parse::<i64>().is_ok() {
        return ItemKind::Integer;
    }
    if value.parse::<f64>().is_ok() {
        return ItemKind::Float;
    }
    if dataset::parse_naive_date(value).is_ok() {
        return ItemKind::Date;
    }
    ItemKind::Text
}

fn widen(current: ItemKind, observed: ItemKind) -> ItemKind {
    use ItemKind::*;
    match (current, observed) {
        (a, b) if a == b => a,
        (Integer, Float) | (Float, Integer) => Float,
        (Boolean, Integer) | (Integer, Boolean) => Integer,
        (Boolean, Float) | (Float, Boolean) => Float,
        _ => Text,
    }
}

/// Infers a schema by sampling up to `sample_rows` rows (0 means full scan).
pub fn infer_schema(
    path: &Path,
    sample_rows: usize,
    delimiter: u8,
    encoding: &'static encoding_rs::Encoding,
) -> Result<Schema> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    let mut candidates = vec![TypeCandidate::default(); headers.len()];

    let mut record = csv::ByteRecord::new();
    let mut processed = 0usize;
    while reader.read_byte_record(&mut record)? {
        if sample_rows > 0 && processed >= sample_rows {
            break;
        }
        for (idx, field) in record.iter().enumerate().take(headers.len()) {
            if field.is_empty() {
                continue;
            }
            let Ok(decoded) = io_utils::decode_bytes(field, encoding) else {
                continue;
            };
            let trimmed = decoded.trim();
            if !trimmed.is_empty() {
                candidates[idx].update(trimmed);
            }
        }
        processed += 1;
    }
    debug!("Sampled {processed} row(s) while inferring column types");

    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| ColumnMeta::new(header.clone(), candidates[idx].decide()))
        .collect();
    Ok(Schema::new(columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            ColumnMeta::new("age", ColumnType::Scalar(ItemKind::Float)),
            ColumnMeta::new("scores", ColumnType::Vector(ItemKind::Integer)),
        ])
    }

    #[test]
    fn column_type_signatures_round_trip() {
        for ty in [
            ColumnType::Scalar(ItemKind::Boolean),
            ColumnType::Scalar(ItemKind::Text),
            ColumnType::Vector(ItemKind::Float),
            ColumnType::Vector(ItemKind::Date),
        ] {
            let parsed = ColumnType::from_str(&ty.signature()).expect("parse signature");
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn vector_signatures_parse_case_insensitively() {
        let parsed = ColumnType::from_str("vector<FLOAT>").expect("parse");
        assert_eq!(parsed, ColumnType::Vector(ItemKind::Float));
    }

    #[test]
    fn schema_yaml_round_trip() {
        let schema = sample_schema();
        let file = NamedTempFile::new().expect("temp file");
        schema.save(file.path()).expect("save schema");
        let loaded = Schema::load(file.path()).expect("load schema");
        assert_eq!(loaded.columns.len(), 2);
        assert_eq!(loaded.columns[0].name, "age");
        assert_eq!(loaded.columns[1].datatype, ColumnType::Vector(ItemKind::Integer));
    }

    #[test]
    fn temp_names_skip_existing_columns() {
        let schema = Schema::new(vec![
            ColumnMeta::new("IsMissing_temp0", ColumnType::Scalar(ItemKind::Boolean)),
            ColumnMeta::new("value", ColumnType::Scalar(ItemKind::Float)),
        ]);
        let mut allocator = TempNameAllocator::new(&schema);
        assert_eq!(allocator.allocate("IsMissing"), "IsMissing_temp1");
        assert_eq!(allocator.allocate("IsMissing"), "IsMissing_temp2");
        assert_eq!(allocator.allocate("Replace"), "Replace_temp0");
    }

    #[test]
    fn infer_schema_detects_vectors_and_widens() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "flag,reading,samples,label").unwrap();
        writeln!(file, "true,1,1|2|3,alpha").unwrap();
        writeln!(file, "false,2.5,4||6,beta").unwrap();

        let schema =
            infer_schema(file.path(), 0, b',', encoding_rs::UTF_8).expect("infer schema");
        assert_eq!(
            schema.columns[0].datatype,
            ColumnType::Scalar(ItemKind::Boolean)
        );
        assert_eq!(
            schema.columns[1].datatype,
            ColumnType::Scalar(ItemKind::Float)
        );
        assert_eq!(
            schema.columns[2].datatype,
            ColumnType::Vector(ItemKind::Integer)
        );
        assert_eq!(schema.columns[3].datatype, ColumnType::Scalar(ItemKind::Text));
    }
}
