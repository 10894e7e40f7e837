use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Handle missing values in CSV datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Probe a CSV file and infer column data types into a .meta file
    Probe(ProbeArgs),
    /// Resolve a handling spec into a pipeline and apply it to a CSV file
    Process(ProcessArgs),
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Input CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination .meta file path
    #[arg(short, long)]
    pub meta: PathBuf,
    /// Number of rows to sample when inferring types (0 means full scan)
    #[arg(long, default_value_t = 2000)]
    pub sample_rows: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Input CSV file to process
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Metadata file describing column types (inferred when omitted)
    #[arg(short, long)]
    pub meta: Option<PathBuf>,
    /// Handling spec file (.yaml or .json) with defaults and column requests
    #[arg(short = 's', long = "spec")]
    pub spec: Option<PathBuf>,
    /// Additional handling directives such as `Age=Age:mean:indicator`
    #[arg(long = "handle", action = clap::ArgAction::Append)]
    pub handles: Vec<String>,
    /// Default replacement kind (default, mean, min, max)
    #[arg(long = "default-kind")]
    pub default_kind: Option<String>,
    /// Do not concatenate missing-value indicators unless a column asks for one
    #[arg(long = "no-indicator")]
    pub no_indicator: bool,
    /// Pool vector slots when computing replacement statistics
    #[arg(long = "pooled")]
    pub pooled: bool,
    /// Render the result as a formatted table limited to a few rows
    #[arg(long = "preview")]
    pub preview: bool,
    /// Render the result as a formatted table on stdout
    #[arg(long = "table")]
    pub table: bool,
    /// Limit number of rows read from the input
    #[arg(long)]
    pub limit: Option<usize>,
    /// CSV delimiter character for reading input
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
