//! Newline-delimited JSON reading
//!
//! One JSON object per line. Column order follows first appearance of
//! each key; types are the narrowest of Int64, Float64, Boolean and
//! String that fit every observed value, with nested values rendered as
//! their JSON text.

use crate::common::error::{FacetError, FacetResult};
use crate::frame::DataFrame;
use crate::series::Series;
use crate::storage::{ChunkedColumn, StringChunked};
use crate::types::{DataType, Field, Schema};
use serde_json::Value;
use std::io::BufRead;
use std::path::Path;

/// NDJSON reader options
#[derive(Debug, Clone, Default)]
pub struct JsonReadOptions {
    /// Subset of columns to materialize, in the given order
    pub columns: Option<Vec<String>>,
    /// Stop after this many rows
    pub num_rows: Option<usize>,
}

struct RawJson {
    headers: Vec<String>,
    /// Column-major cells; absent keys and JSON nulls are None
    cells: Vec<Vec<Option<Value>>>,
}

fn load(path: &Path, options: &JsonReadOptions) -> FacetResult<RawJson> {
    let file = std::fs::File::open(path)
        .map_err(|e| FacetError::Value(format!("cannot open {}: {}", path.display(), e)))?;
    let reader = std::io::BufReader::new(file);

    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<serde_json::Map<String, Value>> = Vec::new();

    for (row, line) in reader.lines().enumerate() {
        if options.num_rows.is_some_and(|limit| row >= limit) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .map_err(|e| FacetError::Value(format!("invalid JSON on line {}: {}", row + 1, e)))?;
        let Value::Object(object) = value else {
            return Err(FacetError::Value(format!(
                "line {} is not a JSON object",
                row + 1
            )));
        };
        for key in object.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
        rows.push(object);
    }

    let cells = headers
        .iter()
        .map(|header| {
            rows.iter()
                .map(|row| match row.get(header) {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(value.clone()),
                })
                .collect()
        })
        .collect();

    Ok(RawJson { headers, cells })
}

fn narrowest_type(values: &[Option<Value>]) -> DataType {
    let mut any_value = false;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;
    for value in values.iter().flatten() {
        any_value = true;
        match value {
            Value::Number(number) => {
                all_bool = false;
                all_int = all_int && number.is_i64();
            }
            Value::Bool(_) => {
                all_int = false;
                all_float = false;
            }
            _ => return DataType::String,
        }
    }
    if !any_value {
        return DataType::String;
    }
    if all_bool {
        DataType::Boolean
    } else if all_int {
        DataType::Int64
    } else if all_float {
        DataType::Float64
    } else {
        DataType::String
    }
}

fn selected_columns(raw: &RawJson, options: &JsonReadOptions) -> FacetResult<Vec<usize>> {
    match &options.columns {
        None => Ok((0..raw.headers.len()).collect()),
        Some(names) => names
            .iter()
            .map(|name| {
                raw.headers.iter().position(|h| h == name).ok_or_else(|| {
                    FacetError::Schema(format!("column \"{}\" not found in JSON", name))
                })
            })
            .collect(),
    }
}

/// Infer the schema a read with the same options would produce
pub fn infer_schema(path: &Path, options: &JsonReadOptions) -> FacetResult<Schema> {
    let raw = load(path, options)?;
    let selected = selected_columns(&raw, options)?;
    Ok(selected
        .into_iter()
        .map(|column| {
            Field::new(
                raw.headers[column].clone(),
                narrowest_type(&raw.cells[column]),
            )
        })
        .collect())
}

fn build_column(name: &str, values: &[Option<Value>], dtype: DataType) -> Series {
    match dtype {
        DataType::Int64 => {
            let parsed: Vec<Option<i64>> = values
                .iter()
                .map(|v| v.as_ref().and_then(Value::as_i64))
                .collect();
            Series::from_data(
                name,
                crate::series::SeriesData::Int64(ChunkedColumn::from_options(&parsed)),
            )
        }
        DataType::Float64 => {
            let parsed: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.as_ref().and_then(Value::as_f64))
                .collect();
            Series::from_data(
                name,
                crate::series::SeriesData::Float64(ChunkedColumn::from_options(&parsed)),
            )
        }
        DataType::Boolean => {
            let parsed: Vec<Option<bool>> = values
                .iter()
                .map(|v| v.as_ref().and_then(Value::as_bool))
                .collect();
            Series::from_data(
                name,
                crate::series::SeriesData::Boolean(ChunkedColumn::from_options(&parsed)),
            )
        }
        _ => {
            let rendered: Vec<Option<String>> = values
                .iter()
                .map(|v| {
                    v.as_ref().map(|value| match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect();
            Series::from_data(
                name,
                crate::series::SeriesData::String(StringChunked::from_strs(
                    rendered.iter().map(|v| v.as_deref()),
                )),
            )
        }
    }
}

/// Read a newline-delimited JSON file into a frame
pub fn read_ndjson(path: &Path, options: &JsonReadOptions) -> FacetResult<DataFrame> {
    let raw = load(path, options)?;
    let selected = selected_columns(&raw, options)?;
    let columns = selected
        .into_iter()
        .map(|column| {
            let dtype = narrowest_type(&raw.cells[column]);
            build_column(&raw.headers[column], &raw.cells[column], dtype)
        })
        .collect::<Vec<_>>();
    DataFrame::new(columns)
}
