//! Caller-facing missing-value handling requests.
//!
//! Provides [`ColumnRequest::parse()`] for `--handle` directives of the form
//! `dest=source[:kind][:indicator|:no-indicator][:by-slot|:pooled]`, plus
//! [`HandlingSpec`] for YAML/JSON spec files carrying global defaults and a
//! column list. Unset per-column fields fall back to [`HandlingDefaults`]
//! during plan resolution.

use std::{fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// How a missing value is filled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplacementKind {
    #[default]
    DefaultValue,
    Mean,
    Minimum,
    Maximum,
}

impl ReplacementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplacementKind::DefaultValue => "default",
            ReplacementKind::Mean => "mean",
            ReplacementKind::Minimum => "minimum",
            ReplacementKind::Maximum => "maximum",
        }
    }
}

impl FromStr for ReplacementKind {
    type Err = anyhow::Error;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "default" | "default-value" => Ok(ReplacementKind::DefaultValue),
            "mean" => Ok(ReplacementKind::Mean),
            "min" | "minimum" => Ok(ReplacementKind::Minimum),
            "max" | "maximum" => Ok(ReplacementKind::Maximum),
            other => Err(anyhow!("Unknown replacement kind '{other}'")),
        }
    }
}

impl fmt::Display for ReplacementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column to handle. Optional fields fall back to the global defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRequest {
    pub source: String,
    pub dest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReplacementKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impute_by_slot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concat_indicator: Option<bool>,
}

impl ColumnRequest {
    pub fn new(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            kind: None,
            impute_by_slot: None,
            concat_indicator: None,
        }
    }

    /// Parses a directive such as `Age=Age:mean:indicator` or `score:max`.
    ///
    /// Without an `=` the single name is both source and destination. Option
    /// tokens after the source are a replacement kind, `indicator` /
    /// `no-indicator`, or `by-slot` / `pooled`, in any order.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Handling directive is empty"));
        }
        let (dest, rest) = match trimmed.split_once('=') {
            Some((dest, rest)) => (dest.trim(), rest.trim()),
            None => {
                let name = trimmed.split(':').next().unwrap_or(trimmed).trim();
                (name, trimmed)
            }
        };
        if dest.is_empty() {
            return Err(anyhow!("Handling directive '{spec}' is missing a destination"));
        }
        let mut tokens = rest.split(':');
        let source = tokens
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Handling directive '{spec}' is missing a source column"))?;

        let mut request = ColumnRequest::new(source, dest);
        for token in tokens {
            let option = token.trim();
            if option.is_empty() {
                continue;
            }
            match option.to_ascii_lowercase().as_str() {
                "indicator" => request.concat_indicator = Some(true),
                "no-indicator" => request.concat_indicator = Some(false),
                "by-slot" => request.impute_by_slot = Some(true),
                "pooled" => request.impute_by_slot = Some(false),
                _ => {
                    let kind = ReplacementKind::from_str(option)
                        .with_context(|| format!("In handling directive '{spec}'"))?;
                    request.kind = Some(kind);
                }
            }
        }
        Ok(request)
    }
}

pub fn parse_requests(specs: &[String]) -> Result<Vec<ColumnRequest>> {
    specs.iter().map(|spec| ColumnRequest::parse(spec)).collect()
}

/// Global fallbacks applied wherever a [`ColumnRequest`] leaves a field unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlingDefaults {
    pub kind: ReplacementKind,
    pub impute_by_slot: bool,
    pub concat_indicator: bool,
}

impl Default for HandlingDefaults {
    fn default() -> Self {
        Self {
            kind: ReplacementKind::DefaultValue,
            impute_by_slot: true,
            concat_indicator: true,
        }
    }
}

/// File form of a handling specification: defaults plus a column list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlingSpec {
    #[serde(default)]
    pub defaults: HandlingDefaults,
    #[serde(default)]
    pub columns: Vec<ColumnRequest>,
}

impl HandlingSpec {
    /// Loads a spec file; `.json` parses as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening spec file {path:?}"))?;
        let reader = BufReader::new(file);
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_reader(reader).context("Parsing spec JSON")
        } else {
            serde_yaml::from_reader(reader).context("Parsing spec YAML")
        }
    }
}
