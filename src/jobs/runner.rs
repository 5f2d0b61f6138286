use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Map, Value};
use tokio::time::{sleep, Duration};

use crate::api::{ApiClient, Paginator};
use crate::config::Config;
use crate::dates::{chunk_ranges, day_bounds, DateRange};
use crate::error::{Error, Result};
use crate::export::table::{list_columns, list_table, Table};
use crate::export::xlsx::write_workbook;
use crate::export::{value_at_path, MAX_ROWS_PER_SHEET};
use crate::jobs::catalog::{
    ColumnPolicy, ColumnSource, ColumnSpec, DateWindow, JobKind, JobSpec, ListPolicy,
};

/// CLI overrides for a single run.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub output: Option<PathBuf>,
    pub page_size: Option<u32>,
}

/// Runs one export job end to end and returns the workbook path.
pub async fn run(
    client: &ApiClient,
    kind: JobKind,
    config: &Config,
    options: &RunOptions,
) -> Result<PathBuf> {
    let spec = kind.spec();
    let page_size = options.page_size.unwrap_or(spec.page_size);
    let paginator = Paginator::new(page_size);

    tracing::info!("Starting export job: {}", spec.name);

    let (records, complete) = match spec.window {
        Some(window) => fetch_windowed(client, &spec, &paginator, window, options).await?,
        None => {
            let outcome = client
                .fetch_list(spec.endpoint, spec.method, base_filter(&spec), &paginator)
                .await?;
            (outcome.records, outcome.complete)
        }
    };

    if !complete {
        tracing::warn!(
            "Fetch for {} ended early; exporting the {} records collected so far",
            spec.name,
            records.len()
        );
    }

    if records.is_empty() {
        return Err(Error::EmptyExport(spec.name.to_string()));
    }

    tracing::info!("Fetched {} records for {}", records.len(), spec.name);

    let tables = shape(&spec, &records);

    let path = options
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.export_dir).join(spec.output_file));

    write_workbook(&path, &tables)?;
    tracing::info!("Saved {} to {}", spec.name, path.display());

    Ok(path)
}

async fn fetch_windowed(
    client: &ApiClient,
    spec: &JobSpec,
    paginator: &Paginator,
    window: DateWindow,
    options: &RunOptions,
) -> Result<(Vec<Value>, bool)> {
    let today = Utc::now().date_naive();
    let start = options.from.unwrap_or_else(|| window.default_start.resolve(today));
    let end = options.to.unwrap_or(today);

    if end < start {
        return Err(Error::Config(format!(
            "End date {} precedes start date {}",
            end, start
        )));
    }

    let chunks = chunk_ranges(DateRange::new(start, end), window.chunk_days);
    tracing::info!(
        "Fetching {} from {} to {} in {} chunk(s) of {} day(s)",
        spec.name,
        start,
        end,
        chunks.len(),
        window.chunk_days
    );

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut records = Vec::new();
    let mut complete = true;

    for chunk in chunks {
        let outcome = client
            .fetch_list(spec.endpoint, spec.method, chunk_filter(spec, chunk), paginator)
            .await?;

        if !outcome.complete {
            tracing::warn!(
                "Chunk {} to {} returned a partial result",
                chunk.start,
                chunk.end
            );
            complete = false;
        }
        records.extend(outcome.records);

        pb.inc(1);
        sleep(Duration::from_millis(window.pause_millis)).await;
    }

    pb.finish_with_message("Fetched all chunks");
    Ok((records, complete))
}

fn base_filter(spec: &JobSpec) -> Map<String, Value> {
    spec.filter
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from(*value)))
        .collect()
}

fn chunk_filter(spec: &JobSpec, chunk: DateRange) -> Map<String, Value> {
    let mut filter = base_filter(spec);
    let (start, end) = day_bounds(chunk);
    filter.insert("dateRange".to_string(), json!({ "start": start, "end": end }));
    filter
}

/// Applies the job's column and list policies to the fetched records.
fn shape(spec: &JobSpec, records: &[Value]) -> Vec<Table> {
    let mut primary = match &spec.columns {
        ColumnPolicy::Flatten { renames } => {
            let mut table = Table::from_records(spec.sheet, records);
            table.rename_columns(renames);
            table
        }
        ColumnPolicy::Select(columns) => select_table(spec.sheet, records, columns),
    };

    if let Some(key) = spec.dedupe_key {
        primary.dedupe_by(key);
    }

    let mut tables = if spec.chunk_rows {
        primary.split(MAX_ROWS_PER_SHEET)
    } else {
        vec![primary]
    };

    match &spec.lists {
        ListPolicy::Inline => {}
        ListPolicy::Split {
            path,
            sheet,
            parent_column,
            parent_sources,
        } => {
            let aux = list_table(records, path, parent_column, parent_sources, sheet);
            if !aux.is_empty() {
                if spec.chunk_rows {
                    tables.extend(aux.split(MAX_ROWS_PER_SHEET));
                } else {
                    tables.push(aux);
                }
            }
        }
        ListPolicy::ExpandAll {
            parent_column,
            parent_sources,
        } => {
            for column in list_columns(records) {
                let sheet = format!("exp_{}", column.replace('.', "_"));
                let aux = list_table(records, &column, parent_column, parent_sources, &sheet);
                if !aux.is_empty() {
                    tables.push(aux);
                }
            }
        }
    }

    tables
}

fn select_table(name: &str, records: &[Value], columns: &[ColumnSpec]) -> Table {
    let mut table = Table::new(
        name,
        columns.iter().map(|c| c.header.to_string()).collect(),
    );

    for record in records {
        let row = columns
            .iter()
            .map(|column| select_cell(record, &column.source))
            .collect();
        table.rows.push(row);
    }

    table
}

fn select_cell(record: &Value, source: &ColumnSource) -> Value {
    match source {
        ColumnSource::Path(path) => value_at_path(record, path).cloned().unwrap_or(Value::Null),
        ColumnSource::FirstOf(paths) => paths
            .iter()
            .filter_map(|path| value_at_path(record, path))
            .find(|value| !value.is_null() && !value.is_object() && !value.is_array())
            .cloned()
            .unwrap_or(Value::Null),
        ColumnSource::JoinNames(field) => join_names(value_at_path(record, field)),
    }
}

fn join_names(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Array(items)) => {
            if items.is_empty() {
                return Value::Null;
            }
            let names: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => map
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown")
                        .to_string(),
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect();
            Value::String(names.join(", "))
        }
        Some(Value::String(text)) => Value::String(text.clone()),
        Some(Value::Null) | None => Value::Null,
        Some(other) => Value::String(other.to_string()),
    }
}
