//! CSV reading
//!
//! Reads a delimited file into a frame with inferred column types. Each
//! column gets the narrowest of Int64, Float64, Boolean and String that
//! accepts every observed value; empty fields are null and do not
//! constrain the type.

use crate::common::error::{FacetError, FacetResult};
use crate::frame::DataFrame;
use crate::series::Series;
use crate::storage::{ChunkedColumn, StringChunked};
use crate::types::{DataType, Field, Schema};
use csv::ReaderBuilder;
use std::path::Path;

/// CSV reader options
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub delimiter: u8,
    pub has_header: bool,
    pub quote: u8,
    pub escape: Option<u8>,
    /// Subset of columns to materialize, in the given order
    pub columns: Option<Vec<String>>,
    /// Stop after this many data rows
    pub num_rows: Option<usize>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            quote: b'"',
            escape: None,
            columns: None,
            num_rows: None,
        }
    }
}

struct RawCsv {
    headers: Vec<String>,
    /// Column-major cells; empty fields are None
    cells: Vec<Vec<Option<String>>>,
}

fn load(path: &Path, options: &CsvReadOptions) -> FacetResult<RawCsv> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_header)
        .quote(options.quote)
        .escape(options.escape)
        .flexible(true)
        .from_path(path)
        .map_err(|e| FacetError::Value(format!("cannot open {}: {}", path.display(), e)))?;

    let headers: Vec<String> = if options.has_header {
        reader
            .headers()
            .map_err(|e| FacetError::Value(format!("cannot read CSV header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    let mut cells: Vec<Vec<Option<String>>> = headers.iter().map(|_| Vec::new()).collect();
    let mut headers = headers;

    for (row, record) in reader.records().enumerate() {
        if options.num_rows.is_some_and(|limit| row >= limit) {
            break;
        }
        let record =
            record.map_err(|e| FacetError::Value(format!("cannot read CSV row: {}", e)))?;
        if headers.is_empty() {
            headers = (1..=record.len()).map(|i| format!("column_{}", i)).collect();
            cells = headers.iter().map(|_| Vec::new()).collect();
        }
        for (column, cell) in cells.iter_mut().enumerate() {
            let field = record.get(column).unwrap_or("");
            cell.push((!field.is_empty()).then(|| field.to_string()));
        }
    }

    Ok(RawCsv { headers, cells })
}

fn narrowest_type(values: &[Option<String>]) -> DataType {
    let mut any_value = false;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;
    for value in values.iter().flatten() {
        any_value = true;
        let trimmed = value.trim();
        all_int = all_int && trimmed.parse::<i64>().is_ok();
        all_float = all_float && trimmed.parse::<f64>().is_ok();
        all_bool = all_bool && matches!(trimmed, "true" | "false" | "True" | "False");
        if !(all_int || all_float || all_bool) {
            return DataType::String;
        }
    }
    if !any_value {
        return DataType::String;
    }
    if all_int {
        DataType::Int64
    } else if all_float {
        DataType::Float64
    } else if all_bool {
        DataType::Boolean
    } else {
        DataType::String
    }
}

fn selected_columns(raw: &RawCsv, options: &CsvReadOptions) -> FacetResult<Vec<usize>> {
    match &options.columns {
        None => Ok((0..raw.headers.len()).collect()),
        Some(names) => names
            .iter()
            .map(|name| {
                raw.headers
                    .iter()
                    .position(|header| header == name)
                    .ok_or_else(|| {
                        FacetError::Schema(format!("column \"{}\" not found in CSV", name))
                    })
            })
            .collect(),
    }
}

/// Infer the schema a read with the same options would produce
pub fn infer_schema(path: &Path, options: &CsvReadOptions) -> FacetResult<Schema> {
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

fn build_column(name: &str, values: &[Option<String>], dtype: DataType) -> FacetResult<Series> {
    match dtype {
        DataType::Int64 => {
            let parsed: Vec<Option<i64>> = values
                .iter()
                .map(|v| v.as_deref().map(|s| s.trim().parse::<i64>()).transpose())
                .collect::<Result<_, _>>()
                .map_err(|e| FacetError::Value(format!("column \"{}\": {}", name, e)))?;
            Ok(Series::from_data(
                name,
                crate::series::SeriesData::Int64(ChunkedColumn::from_options(&parsed)),
            ))
        }
        DataType::Float64 => {
            let parsed: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.as_deref().map(|s| s.trim().parse::<f64>()).transpose())
                .collect::<Result<_, _>>()
                .map_err(|e| FacetError::Value(format!("column \"{}\": {}", name, e)))?;
            Ok(Series::from_data(
                name,
                crate::series::SeriesData::Float64(ChunkedColumn::from_options(&parsed)),
            ))
        }
        DataType::Boolean => {
            let parsed: Vec<Option<bool>> = values
                .iter()
                .map(|v| {
                    v.as_deref()
                        .map(|s| matches!(s.trim(), "true" | "True"))
                })
                .collect();
            Ok(Series::from_data(
                name,
                crate::series::SeriesData::Boolean(ChunkedColumn::from_options(&parsed)),
            ))
        }
        _ => Ok(Series::from_data(
            name,
            crate::series::SeriesData::String(StringChunked::from_strs(
                values.iter().map(|v| v.as_deref()),
            )),
        )),
    }
}

/// Read a CSV file into a frame
pub fn read_csv(path: &Path, options: &CsvReadOptions) -> FacetResult<DataFrame> {
    let raw = load(path, options)?;
    let selected = selected_columns(&raw, options)?;
    let columns = selected
        .into_iter()
        .map(|column| {
            let dtype = narrowest_type(&raw.cells[column]);
            build_column(&raw.headers[column], &raw.cells[column], dtype)
        })
        .collect::<FacetResult<Vec<_>>>()?;
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnyValue;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_type_inference() {
        let file = write_temp("a,b,c,d\n1,1.5,true,x\n2,2,false,y\n,,,\n");
        let df = read_csv(file.path(), &CsvReadOptions::default()).unwrap();
        assert_eq!(df.column("a").unwrap().dtype(), DataType::Int64);
        assert_eq!(df.column("b").unwrap().dtype(), DataType::Float64);
        assert_eq!(df.column("c").unwrap().dtype(), DataType::Boolean);
        assert_eq!(df.column("d").unwrap().dtype(), DataType::String);
        // The all-empty row reads as nulls.
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("a").unwrap().get(2).unwrap(), AnyValue::Null);
    }

    #[test]
    fn test_integer_column_with_float_value_widens() {
        let file = write_temp("x\n1\n2.5\n");
        let df = read_csv(file.path(), &CsvReadOptions::default()).unwrap();
        assert_eq!(df.column("x").unwrap().dtype(), DataType::Float64);
    }

    #[test]
    fn test_column_selection_and_row_limit() {
        let file = write_temp("a,b\n1,10\n2,20\n3,30\n");
        let options = CsvReadOptions {
            columns: Some(vec!["b".to_string()]),
            num_rows: Some(2),
            ..CsvReadOptions::default()
        };
        let df = read_csv(file.path(), &options).unwrap();
        assert_eq!(df.columns(), vec!["b"]);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_headerless_and_delimiter() {
        let file = write_temp("1;x\n2;y\n");
        let options = CsvReadOptions {
            delimiter: b';',
            has_header: false,
            ..CsvReadOptions::default()
        };
        let df = read_csv(file.path(), &options).unwrap();
        assert_eq!(df.columns(), vec!["column_1", "column_2"]);
        assert_eq!(df.column("column_1").unwrap().dtype(), DataType::Int64);
    }

    #[test]
    fn test_infer_schema_matches_read() {
        let file = write_temp("a,b\n1,x\n");
        let schema = infer_schema(file.path(), &CsvReadOptions::default()).unwrap();
        let df = read_csv(file.path(), &CsvReadOptions::default()).unwrap();
        assert_eq!(schema, df.schema());
    }
}
