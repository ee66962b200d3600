//! Stable multi-key argsort
//!
//! Sorting computes a row permutation over the sort columns; the caller
//! applies it to every column with `take`. Comparisons run on dense
//! canonical key buffers extracted per column; floats compare through
//! their total order so NaN sorts deterministically.

use crate::common::error::{FacetError, FacetResult};
use crate::series::{Series, SeriesData};
use crate::storage::chunk::NativeType;
use crate::storage::{ChunkedColumn, StringChunked};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// Sort behavior shared by every key column
#[derive(Debug, Clone, Copy)]
pub struct SortOptions {
    /// Place nulls before all values instead of after
    pub nulls_first: bool,
    /// Keep the input order of equal rows. The engine's argsort is always
    /// stable; the flag exists so callers can state the requirement.
    pub stable: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            nulls_first: false,
            stable: true,
        }
    }
}

/// Dense comparator input for one sort column
enum SortKeys {
    Signed(Vec<i64>, Option<Vec<bool>>),
    Unsigned(Vec<u64>, Option<Vec<bool>>),
    Float(Vec<f64>, Option<Vec<bool>>),
    Bool(Vec<bool>, Option<Vec<bool>>),
    Bytes(StringChunked),
    AllNull,
}

fn dense<T: NativeType + Default>(col: &ChunkedColumn<T>) -> (Vec<T>, Option<Vec<bool>>) {
    let (values, validity) = col.to_slice();
    (values, (col.null_count() > 0).then_some(validity))
}

impl SortKeys {
    fn from_series(series: &Series) -> SortKeys {
        match series.data() {
            SeriesData::Boolean(col) => {
                let (values, validity) = dense(col);
                SortKeys::Bool(values, validity)
            }
            SeriesData::Int8(col) => {
                let (values, validity) = dense(col);
                SortKeys::Signed(values.into_iter().map(|v| v as i64).collect(), validity)
            }
            SeriesData::Int16(col) => {
                let (values, validity) = dense(col);
                SortKeys::Signed(values.into_iter().map(|v| v as i64).collect(), validity)
            }
            SeriesData::Int32(col) => {
                let (values, validity) = dense(col);
                SortKeys::Signed(values.into_iter().map(|v| v as i64).collect(), validity)
            }
            SeriesData::Int64(col) => {
                let (values, validity) = dense(col);
                SortKeys::Signed(values, validity)
            }
            SeriesData::UInt8(col) => {
                let (values, validity) = dense(col);
                SortKeys::Unsigned(values.into_iter().map(|v| v as u64).collect(), validity)
            }
            SeriesData::UInt16(col) => {
                let (values, validity) = dense(col);
                SortKeys::Unsigned(values.into_iter().map(|v| v as u64).collect(), validity)
            }
            SeriesData::UInt32(col) => {
                let (values, validity) = dense(col);
                SortKeys::Unsigned(values.into_iter().map(|v| v as u64).collect(), validity)
            }
            SeriesData::UInt64(col) => {
                let (values, validity) = dense(col);
                SortKeys::Unsigned(values, validity)
            }
            SeriesData::Float32(col) => {
                let (values, validity) = dense(col);
                SortKeys::Float(values.into_iter().map(|v| v as f64).collect(), validity)
            }
            SeriesData::Float64(col) => {
                let (values, validity) = dense(col);
                SortKeys::Float(values, validity)
            }
            SeriesData::String(col) | SeriesData::Binary(col) => SortKeys::Bytes(col.clone()),
            SeriesData::Date(col) => {
                let (values, validity) = dense(col);
                SortKeys::Signed(values.into_iter().map(|v| v as i64).collect(), validity)
            }
            SeriesData::Time(col) | SeriesData::Datetime(col) | SeriesData::Duration(col) => {
                let (values, validity) = dense(col);
                SortKeys::Signed(values, validity)
            }
            SeriesData::List(_) | SeriesData::Null(_) => SortKeys::AllNull,
        }
    }

    fn is_valid(&self, row: usize) -> bool {
        match self {
            SortKeys::Signed(_, validity)
            | SortKeys::Bool(_, validity)
            | SortKeys::Float(_, validity) => validity.as_ref().is_none_or(|v| v[row]),
            SortKeys::Unsigned(_, validity) => validity.as_ref().is_none_or(|v| v[row]),
            SortKeys::Bytes(col) => col.is_valid(row),
            SortKeys::AllNull => false,
        }
    }

    fn compare_values(&self, a: usize, b: usize) -> Ordering {
        match self {
            SortKeys::Signed(values, _) => values[a].cmp(&values[b]),
            SortKeys::Unsigned(values, _) => values[a].cmp(&values[b]),
            SortKeys::Float(values, _) => OrderedFloat(values[a]).cmp(&OrderedFloat(values[b])),
            SortKeys::Bool(values, _) => values[a].cmp(&values[b]),
            SortKeys::Bytes(col) => col.get(a).cmp(&col.get(b)),
            SortKeys::AllNull => Ordering::Equal,
        }
    }

    /// Null placement is independent of the column's direction.
    fn compare(&self, a: usize, b: usize, descending: bool, nulls_first: bool) -> Ordering {
        match (self.is_valid(a), self.is_valid(b)) {
            (true, true) => {
                let ordering = self.compare_values(a, b);
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            }
            (false, false) => Ordering::Equal,
            (false, true) => {
                if nulls_first {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (true, false) => {
                if nulls_first {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
        }
    }
}

/// Compute the stable permutation that sorts the rows of `columns`
/// lexicographically with per-column direction
pub fn argsort(
    columns: &[Series],
    descending: &[bool],
    options: &SortOptions,
) -> FacetResult<Vec<i64>> {
    if columns.is_empty() {
        return Err(FacetError::Value("sort requires at least one key".to_string()));
    }
    if descending.len() != columns.len() {
        return Err(FacetError::Value(format!(
            "sort got {} keys but {} directions",
            columns.len(),
            descending.len()
        )));
    }
    let n = columns[0].len();
    for column in columns {
        if column.len() != n {
            return Err(FacetError::Shape(format!(
                "sort key \"{}\" has length {}, expected {}",
                column.name(),
                column.len(),
                n
            )));
        }
        if column.dtype() == crate::types::DataType::List {
            return Err(FacetError::Schema(format!(
                "sort key \"{}\" of type list is not orderable",
                column.name()
            )));
        }
    }

    let keys: Vec<SortKeys> = columns.iter().map(SortKeys::from_series).collect();

    let mut indices: Vec<i64> = (0..n as i64).collect();
    indices.sort_by(|&a, &b| {
        for (keys, &descending) in keys.iter().zip(descending) {
            let ordering = keys.compare(a as usize, b as usize, descending, options.nulls_first);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argsort_single_key() {
        let s = Series::new("a", &[3i64, 1, 2]);
        let indices = argsort(&[s], &[false], &SortOptions::default()).unwrap();
        assert_eq!(indices, vec![1, 2, 0]);
    }

    #[test]
    fn test_argsort_descending() {
        let s = Series::new("a", &[3i64, 1, 2]);
        let indices = argsort(&[s], &[true], &SortOptions::default()).unwrap();
        assert_eq!(indices, vec![0, 2, 1]);
    }

    #[test]
    fn test_argsort_nulls_last_default() {
        let s = Series::new("a", &[None, Some(2i64), Some(1)]);
        let indices = argsort(&[s.clone()], &[false], &SortOptions::default()).unwrap();
        assert_eq!(indices, vec![2, 1, 0]);

        let nulls_first = SortOptions {
            nulls_first: true,
            ..SortOptions::default()
        };
        let indices = argsort(&[s], &[false], &nulls_first).unwrap();
        assert_eq!(indices, vec![0, 2, 1]);
    }

    #[test]
    fn test_argsort_multi_key_stable() {
        let a = Series::new("a", &[1i64, 2, 1, 2]);
        let b = Series::new("b", &["x", "y", "x", "a"]);
        // Primary key ascending, secondary descending.
        let indices = argsort(&[a, b], &[false, true], &SortOptions::default()).unwrap();
        assert_eq!(indices, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_argsort_nan_deterministic() {
        let s = Series::new("f", &[f64::NAN, 1.0, 2.0]);
        let indices = argsort(&[s], &[false], &SortOptions::default()).unwrap();
        // Total order puts NaN above all numbers.
        assert_eq!(indices, vec![1, 2, 0]);
    }

    #[test]
    fn test_argsort_length_mismatch() {
        let a = Series::new("a", &[1i64, 2]);
        let b = Series::new("b", &[1i64]);
        assert!(argsort(&[a, b], &[false, false], &SortOptions::default()).is_err());
    }
}
