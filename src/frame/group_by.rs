//! Grouped aggregation surface
//!
//! `df.group_by(keys)?.agg(exprs)?` builds the row→group-id map once,
//! gathers the canonical key rows, and evaluates every aggregation
//! expression against the groups.

use crate::common::error::{FacetError, FacetResult};
use crate::execution::group_by::{group_by, GroupMap};
use crate::expression::evaluator::eval_grouped;
use crate::expression::Expr;
use crate::frame::DataFrame;
use crate::series::Series;

/// A frame with its grouping resolved, ready to aggregate
#[derive(Debug)]
pub struct GroupBy<'a> {
    df: &'a DataFrame,
    keys: Vec<Series>,
    groups: GroupMap,
}

impl<'a> GroupBy<'a> {
    pub(crate) fn new<S: AsRef<str>>(df: &'a DataFrame, keys: &[S]) -> FacetResult<GroupBy<'a>> {
        let key_names: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let context = format!("group_by({})", key_names.join(","));
        let key_series = key_names
            .iter()
            .map(|name| df.column(name).cloned())
            .collect::<FacetResult<Vec<_>>>()
            .map_err(|e| FacetError::Schema(format!("{}: {}", context, e)))?;
        let groups = group_by(&key_series)
            .map_err(|e| FacetError::Schema(format!("{}: {}", context, e)))?;
        Ok(GroupBy {
            df,
            keys: key_series,
            groups,
        })
    }

    /// The resolved row→group-id map
    pub fn groups(&self) -> &GroupMap {
        &self.groups
    }

    /// One row per group: canonical keys followed by the aggregations
    pub fn agg(&self, exprs: &[Expr]) -> FacetResult<DataFrame> {
        let context = format!(
            "group_by({})",
            self.keys
                .iter()
                .map(Series::name)
                .collect::<Vec<_>>()
                .join(",")
        );
        let first_rows = self.groups.first_row_indices();
        let mut columns = Vec::with_capacity(self.keys.len() + exprs.len());
        for key in &self.keys {
            columns.push(key.take(&first_rows)?);
        }
        for expr in exprs {
            let series = eval_grouped(self.df, &self.groups, expr)
                .map_err(|e| FacetError::Schema(format!("{}: {}", context, e)))?;
            columns.push(series.with_name(expr.output_name()));
        }
        DataFrame::new(columns).map_err(|e| FacetError::Schema(format!("{}: {}", context, e)))
    }

    /// Per-group row counts under the column name `count`
    pub fn count(&self) -> FacetResult<DataFrame> {
        let first_rows = self.groups.first_row_indices();
        let mut counts = vec![0i64; self.groups.n_groups()];
        for &group in &self.groups.row_group_ids {
            counts[group as usize] += 1;
        }
        let mut columns = Vec::with_capacity(self.keys.len() + 1);
        for key in &self.keys {
            columns.push(key.take(&first_rows)?);
        }
        columns.push(Series::new("count", counts));
        DataFrame::new(columns)
    }
}
