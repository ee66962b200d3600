//! File format collaborators: CSV and newline-delimited JSON

pub mod csv_reader;
pub mod csv_writer;
pub mod json_reader;

pub use csv_reader::{infer_schema as infer_csv_schema, read_csv, CsvReadOptions};
pub use csv_writer::{write_csv, write_csv_to, CsvWriteOptions};
pub use json_reader::{read_ndjson, JsonReadOptions};
