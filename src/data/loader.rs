use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, Record, RecordStore, Schema};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a billing dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one billing line per row
/// * `.json`    – `[{ "GroupProvider": "...", "Qty": 2, ... }, ...]`
/// * `.parquet` – flat table with string / numeric columns
///
/// Headers may use either the workbook names (`Qty`, `Amount Bill`, ...) or
/// the camelCase field names. Unknown columns are ignored.
pub fn load_file(path: &Path) -> Result<RecordStore> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let store = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            load_json_str(&text)
        }
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            load_csv_reader(file)
        }
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    log::info!(
        "Loaded {} records from {} with columns {:?}",
        store.len(),
        path.display(),
        store.schema().columns().map(Column::header).collect::<Vec<_>>()
    );
    Ok(store)
}

fn finish(records: Vec<Record>, columns: BTreeSet<Column>) -> Result<RecordStore> {
    Ok(RecordStore::new(records, Schema::new(columns))?)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one billing line per row.
pub fn load_csv_reader<R: Read>(source: R) -> Result<RecordStore> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let mapping: Vec<Option<Column>> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(Column::from_header)
        .collect();
    let columns: BTreeSet<Column> = mapping.iter().flatten().copied().collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        // Line numbers are 1-based and the header takes line 1.
        let row = result.with_context(|| format!("CSV line {}", row_no + 2))?;
        let mut record = Record::default();
        for (column, value) in mapping.iter().zip(row.iter()) {
            if let Some(column) = column {
                record.set_cell(*column, value);
            }
        }
        records.push(record);
    }

    finish(records, columns)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "GroupProvider": "Mitra", "Nama Item Garda Medika": "PARACETAMOL", "Qty": 2 },
///   ...
/// ]
/// ```
///
/// A column counts as present when any row carries the key.
pub fn load_json_str(text: &str) -> Result<RecordStore> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut columns = BTreeSet::new();
    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut record = Record::default();
        for (key, val) in obj {
            let Some(column) = Column::from_header(key) else {
                continue;
            };
            columns.insert(column);
            record.set_cell(column, &json_cell(val));
        }
        records.push(record);
    }

    finish(records, columns)
}

fn json_cell(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding one billing line per row.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<RecordStore> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns = BTreeSet::new();
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let mapped: Vec<(usize, Column)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(i, f)| Column::from_header(f.name()).map(|c| (i, c)))
            .collect();
        columns.extend(mapped.iter().map(|(_, c)| *c));

        for row in 0..batch.num_rows() {
            let mut record = Record::default();
            for (col_idx, column) in &mapped {
                let cell = extract_cell(batch.column(*col_idx), row)
                    .with_context(|| format!("Row {row}: failed to read '{column}'"))?;
                record.set_cell(*column, &cell);
            }
            records.push(record);
        }
    }

    finish(records, columns)
}

// -- Parquet / Arrow helpers --

/// Render a single Arrow cell as text. Nulls become empty strings so they
/// follow the same missing / zero rules as blank CSV cells.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        return Ok(String::new());
    }
    let text = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        DataType::Int32 => downcast::<Int32Array>(col)?.value(row).to_string(),
        DataType::Int64 => downcast::<Int64Array>(col)?.value(row).to_string(),
        DataType::Float32 => downcast::<Float32Array>(col)?.value(row).to_string(),
        DataType::Float64 => downcast::<Float64Array>(col)?.value(row).to_string(),
        DataType::Boolean => downcast::<BooleanArray>(col)?.value(row).to_string(),
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(text)
}

fn downcast<T: 'static>(col: &Arc<dyn Array>) -> Result<&T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array layout for {:?}", col.data_type()))
}
