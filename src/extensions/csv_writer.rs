//! CSV writing

use crate::common::error::{FacetError, FacetResult};
use crate::frame::DataFrame;
use crate::types::AnyValue;
use std::io::Write;
use std::path::Path;

/// CSV writer options
#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    pub delimiter: u8,
    pub include_header: bool,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            include_header: true,
        }
    }
}

/// Write a frame to a CSV file
pub fn write_csv(df: &DataFrame, path: &Path, options: &CsvWriteOptions) -> FacetResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv_to(df, file, options)
}

/// Write a frame as CSV into any writer
pub fn write_csv_to<W: Write>(
    df: &DataFrame,
    writer: W,
    options: &CsvWriteOptions,
) -> FacetResult<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);

    if options.include_header {
        out.write_record(df.columns())
            .map_err(|e| FacetError::Value(format!("cannot write CSV header: {}", e)))?;
    }

    for row in 0..df.height() {
        let record: Vec<String> = df
            .get_columns()
            .iter()
            .map(|series| match series.data().get(row) {
                AnyValue::Null => String::new(),
                value => value.to_string(),
            })
            .collect();
        out.write_record(&record)
            .map_err(|e| FacetError::Value(format!("cannot write CSV row {}: {}", row, e)))?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::csv_reader::{read_csv, CsvReadOptions};
    use crate::series::Series;

    #[test]
    fn test_write_then_read() {
        let df = DataFrame::new(vec![
            Series::new("id", &[1i64, 2]),
            Series::new("name", &[Some("a"), None]),
        ])
        .unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        write_csv(&df, file.path(), &CsvWriteOptions::default()).unwrap();

        let back = read_csv(file.path(), &CsvReadOptions::default()).unwrap();
        assert_eq!(back.height(), 2);
        assert_eq!(back.columns(), vec!["id", "name"]);
        assert_eq!(back.column("name").unwrap().null_count(), 1);
    }
}
