//! The `process` command: read a CSV dataset, resolve the missing-value
//! handling requests into a pipeline, apply it, and emit the result.

use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use csv::ByteRecord;
use itertools::Itertools;
use log::{debug, info};

use crate::{
    cli::ProcessArgs,
    dataset::{self, Dataset},
    io_utils, plan,
    request::{self, HandlingDefaults, HandlingSpec, ReplacementKind},
    schema::{self, Schema},
    table,
};

pub fn execute(args: &ProcessArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let input_encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output_path = args.output.as_deref();
    let writing_to_stdout = output_path.is_none_or(io_utils::is_dash);

    if args.preview && args.output.is_some() {
        return Err(anyhow!("--preview cannot be combined with --output"));
    }
    let mut limit = args.limit;
    if args.preview && limit.is_none() {
        limit = Some(10);
    }
    let use_table_output = if args.preview {
        true
    } else {
        args.table && writing_to_stdout
    };
    let output_delimiter =
        io_utils::resolve_output_delimiter(output_path, args.output_delimiter, delimiter);
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    info!(
        "Processing '{}' -> {:?} (delimiter '{}', output '{}')",
        args.input.display(),
        output_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into()),
        crate::printable_delimiter(delimiter),
        crate::printable_delimiter(output_delimiter)
    );

    let schema = match &args.meta {
        Some(path) => {
            Schema::load(path).with_context(|| format!("Loading metadata from {path:?}"))?
        }
        None => schema::infer_schema(&args.input, 0, delimiter, input_encoding)
            .with_context(|| format!("Inferring schema from {:?}", args.input))?,
    };

    let (requests, defaults) = collect_requests(args)?;
    debug!("Resolved {} handling request(s)", requests.len());

    let mut reader =
        io_utils::open_csv_reader_from_path(&args.input, delimiter, schema.has_headers)?;
    if schema.has_headers {
        let headers = io_utils::reader_headers(&mut reader, input_encoding)?;
        schema
            .validate_headers(&headers)
            .with_context(|| format!("Validating headers for {:?}", args.input))?;
    }

    let mut data = Dataset::new(schema);
    let mut record = ByteRecord::new();
    let mut row_idx = 0usize;
    while reader.read_byte_record(&mut record)? {
        if limit.is_some_and(|limit| row_idx >= limit) {
            break;
        }
        let decoded = io_utils::decode_record(&record, input_encoding)?;
        let cells = dataset::parse_row(&data.schema, &decoded)
            .with_context(|| format!("Parsing row {}", row_idx + 2))?;
        data.push_row(cells)?;
        row_idx += 1;
    }

    let pipeline = plan::assemble(&data.schema, &requests, &defaults)?;
    info!(
        "Assembled pipeline: {}",
        pipeline.stage_names().iter().join(" -> ")
    );
    let result = pipeline.apply(data)?;

    if use_table_output {
        let rows = (0..result.row_count())
            .map(|idx| result.render_row(idx))
            .collect_vec();
        table::print_table(&result.schema.headers(), &rows);
    } else {
        let mut writer = io_utils::open_csv_writer(output_path, output_delimiter, output_encoding)?;
        if result.schema.has_headers {
            writer.write_record(result.schema.headers())?;
        }
        for idx in 0..result.row_count() {
            writer.write_record(result.render_row(idx))?;
        }
        writer.flush().context("Flushing output")?;
    }

    info!(
        "Processed {} row(s) into {} column(s)",
        result.row_count(),
        result.schema.columns.len()
    );
    Ok(())
}

/// Merges the spec file (when given) with `--handle` directives and CLI
/// default overrides. Directives are appended after the file's columns, so
/// they land later in the output schema.
fn collect_requests(
    args: &ProcessArgs,
) -> Result<(Vec<request::ColumnRequest>, HandlingDefaults)> {
    let mut defaults = HandlingDefaults::default();
    let mut requests = Vec::new();
    if let Some(path) = &args.spec {
        let spec = HandlingSpec::load(path)?;
        defaults = spec.defaults;
        requests.extend(spec.columns);
    }
    requests.extend(request::parse_requests(&args.handles)?);
    if let Some(kind) = args.default_kind.as_deref() {
        defaults.kind = ReplacementKind::from_str(kind)?;
    }
    if args.no_indicator {
        defaults.concat_indicator = false;
    }
    if args.pooled {
        defaults.impute_by_slot = false;
    }
    Ok((requests, defaults))
}
