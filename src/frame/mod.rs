//! DataFrame: an ordered collection of equal-length named columns
//!
//! Frames are immutable; every operation returns a new frame that may
//! share column storage with its input.

pub mod group_by;
pub mod join;
pub mod lazy;

use crate::common::error::{FacetError, FacetResult};
use crate::execution::sort::{argsort, SortOptions};
use crate::expression::evaluator::eval_expr;
use crate::expression::Expr;
use crate::series::Series;
use crate::storage::ChunkedColumn;
use crate::types::{DataType, Field, Schema};
use std::collections::HashSet;
use std::fmt;

pub use group_by::GroupBy;

/// An ordered collection of named, equal-length series
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    columns: Vec<Series>,
}

impl DataFrame {
    /// Build a frame, validating unique names and equal lengths
    pub fn new(columns: Vec<Series>) -> FacetResult<Self> {
        let mut seen = HashSet::new();
        for series in &columns {
            if !seen.insert(series.name().to_string()) {
                return Err(FacetError::Schema(format!(
                    "duplicate column name \"{}\"",
                    series.name()
                )));
            }
        }
        if let Some(first) = columns.first() {
            for series in &columns[1..] {
                if series.len() != first.len() {
                    return Err(FacetError::Shape(format!(
                        "column \"{}\" has length {}, expected {}",
                        series.name(),
                        series.len(),
                        first.len()
                    )));
                }
            }
        }
        Ok(Self { columns })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Series::len)
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    /// Column names in order
    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(Series::name).collect()
    }

    pub fn get_columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn schema(&self) -> Schema {
        self.columns
            .iter()
            .map(|series| Field::new(series.name(), series.dtype()))
            .collect()
    }

    pub fn column(&self, name: &str) -> FacetResult<&Series> {
        self.columns
            .iter()
            .find(|series| series.name() == name)
            .ok_or_else(|| FacetError::Schema(format!("column \"{}\" not found", name)))
    }

    /// Select columns by name, in the given order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> FacetResult<DataFrame> {
        let columns = names
            .iter()
            .map(|name| self.column(name.as_ref()).cloned())
            .collect::<FacetResult<Vec<_>>>()?;
        DataFrame::new(columns)
    }

    /// Evaluate an expression and add it under `name`, replacing any
    /// same-named column
    pub fn with_column(&self, name: &str, expr: &Expr) -> FacetResult<DataFrame> {
        let series = eval_expr(self, expr)
            .map_err(|e| FacetError::Schema(format!("with_column({}): {}", name, e)))?
            .with_name(name);
        self.with_series(series)
    }

    /// Add a series, replacing any same-named column
    pub fn with_series(&self, series: Series) -> FacetResult<DataFrame> {
        if !self.columns.is_empty() && series.len() != self.height() {
            return Err(FacetError::Shape(format!(
                "column \"{}\" has length {}, expected {}",
                series.name(),
                series.len(),
                self.height()
            )));
        }
        let mut columns = self.columns.clone();
        match columns.iter_mut().find(|c| c.name() == series.name()) {
            Some(slot) => *slot = series,
            None => columns.push(series),
        }
        Ok(DataFrame { columns })
    }

    pub fn drop(&self, name: &str) -> FacetResult<DataFrame> {
        self.column(name)?;
        let columns = self
            .columns
            .iter()
            .filter(|series| series.name() != name)
            .cloned()
            .collect();
        Ok(DataFrame { columns })
    }

    pub fn rename(&self, old: &str, new: &str) -> FacetResult<DataFrame> {
        self.column(old)?;
        let columns = self
            .columns
            .iter()
            .map(|series| {
                if series.name() == old {
                    series.with_name(new)
                } else {
                    series.clone()
                }
            })
            .collect();
        DataFrame::new(columns)
    }

    /// Keep rows where the boolean predicate evaluates to true; null
    /// predicate values drop the row
    pub fn filter(&self, predicate: &Expr) -> FacetResult<DataFrame> {
        let mask_series = eval_expr(self, predicate)
            .map_err(|e| FacetError::Schema(format!("filter({}): {}", predicate, e)))?;
        let mask = mask_series.bool_data().map_err(|_| {
            FacetError::Schema(format!(
                "filter({}): predicate has type {}, expected bool",
                predicate,
                mask_series.dtype()
            ))
        })?;
        self.filter_mask(mask)
    }

    /// Apply a precomputed boolean mask to every column
    pub fn filter_mask(&self, mask: &ChunkedColumn<bool>) -> FacetResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|series| series.filter(mask))
            .collect::<FacetResult<Vec<_>>>()?;
        Ok(DataFrame { columns })
    }

    /// Gather rows by index across every column; `-1` gathers null
    pub fn take(&self, indices: &[i64]) -> FacetResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|series| series.take(indices))
            .collect::<FacetResult<Vec<_>>>()?;
        Ok(DataFrame { columns })
    }

    /// Stable multi-column sort; nulls last by default
    pub fn sort<S: AsRef<str>>(&self, by: &[S], descending: &[bool]) -> FacetResult<DataFrame> {
        self.sort_with_options(by, descending, &SortOptions::default())
    }

    pub fn sort_with_options<S: AsRef<str>>(
        &self,
        by: &[S],
        descending: &[bool],
        options: &SortOptions,
    ) -> FacetResult<DataFrame> {
        let keys = by
            .iter()
            .map(|name| self.column(name.as_ref()).cloned())
            .collect::<FacetResult<Vec<_>>>()
            .map_err(|e| FacetError::Schema(format!("sort: {}", e)))?;
        let indices = argsort(&keys, descending, options)?;
        self.take(&indices)
    }

    /// Zero-copy row window
    pub fn slice(&self, offset: usize, len: usize) -> FacetResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|series| series.slice(offset, len))
            .collect::<FacetResult<Vec<_>>>()?;
        Ok(DataFrame { columns })
    }

    pub fn head(&self, n: usize) -> DataFrame {
        let columns = self.columns.iter().map(|series| series.head(n)).collect();
        DataFrame { columns }
    }

    pub fn tail(&self, n: usize) -> DataFrame {
        let columns = self.columns.iter().map(|series| series.tail(n)).collect();
        DataFrame { columns }
    }

    /// Start a grouped aggregation over the given key columns
    pub fn group_by<S: AsRef<str>>(&self, keys: &[S]) -> FacetResult<GroupBy<'_>> {
        GroupBy::new(self, keys)
    }

    /// Distinct rows over `subset` (all keyable columns when None),
    /// keeping first-appearance order
    pub fn unique(&self, subset: Option<&[&str]>) -> FacetResult<DataFrame> {
        let key_names: Vec<String> = match subset {
            Some(names) => names.iter().map(|s| s.to_string()).collect(),
            None => self
                .columns
                .iter()
                .filter(|series| series.dtype().is_keyable() || series.dtype() == DataType::Null)
                .map(|series| series.name().to_string())
                .collect(),
        };
        if key_names.is_empty() {
            return Err(FacetError::Schema(
                "unique: no keyable columns".to_string(),
            ));
        }
        let keys = key_names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<FacetResult<Vec<_>>>()?;
        let groups = crate::execution::group_by::group_by(&keys)
            .map_err(|e| FacetError::Schema(format!("unique: {}", e)))?;
        self.take(&groups.first_row_indices())
    }

    /// Cell-wise equality, including schema
    pub fn equals(&self, other: &DataFrame) -> bool {
        if self.width() != other.width() || self.height() != other.height() {
            return false;
        }
        self.columns
            .iter()
            .zip(&other.columns)
            .all(|(a, b)| a.name() == b.name() && a.equals(b))
    }
}

impl Series {
    /// Distinct values with their occurrence counts, most frequent first
    pub fn value_counts(&self) -> FacetResult<DataFrame> {
        let groups = crate::execution::group_by::group_by(std::slice::from_ref(self))?;
        let values = self.take(&groups.first_row_indices())?;
        let mut counts = vec![0i64; groups.n_groups()];
        for &group in &groups.row_group_ids {
            counts[group as usize] += 1;
        }
        let count_series = Series::new("count", counts);
        let frame = DataFrame::new(vec![values, count_series])?;
        frame.sort(&["count"], &[true])
    }
}

impl fmt::Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shape: ({}, {})", self.height(), self.width())?;
        let header: Vec<String> = self
            .columns
            .iter()
            .map(|series| format!("{} [{}]", series.name(), series.dtype()))
            .collect();
        writeln!(f, "| {} |", header.join(" | "))?;
        let shown = self.height().min(8);
        for row in 0..shown {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|series| series.data().get(row).to_string())
                .collect();
            writeln!(f, "| {} |", cells.join(" | "))?;
        }
        if shown < self.height() {
            writeln!(f, "| … |")?;
        }
        Ok(())
    }
}
