//! Join surface
//!
//! Resolves key columns, runs the index-level join, and materializes the
//! output by gathering each column from the appropriate side through
//! `take`, with `-1` sentinels becoming nulls. Left columns keep their
//! names; right columns that collide with a left name are suffixed
//! `_right`, except join keys, which appear once. A shared join key is
//! coalesced: rows matched only on the right gather the key value from
//! the right column instead of nulling it through the left sentinel.

use crate::common::error::{FacetError, FacetResult};
use crate::execution::join::{cross_join_indices, join_indices, JoinResult, JoinType};
use crate::expression::evaluator::series_from_any_values;
use crate::frame::DataFrame;
use crate::series::Series;
use crate::storage::ChunkedColumn;
use crate::types::AnyValue;

impl DataFrame {
    /// Equality join on one or more key columns
    pub fn join<S: AsRef<str>>(
        &self,
        other: &DataFrame,
        left_on: &[S],
        right_on: &[S],
        how: JoinType,
    ) -> FacetResult<DataFrame> {
        let context = format!("join[{}]", how);
        if how == JoinType::Cross {
            return self.cross_join(other);
        }
        let left_names: Vec<&str> = left_on.iter().map(AsRef::as_ref).collect();
        let right_names: Vec<&str> = right_on.iter().map(AsRef::as_ref).collect();
        if left_names.len() != right_names.len() || left_names.is_empty() {
            return Err(FacetError::Value(format!(
                "{}: requires matching key lists, got {} and {}",
                context,
                left_names.len(),
                right_names.len()
            )));
        }

        let left_keys = left_names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<FacetResult<Vec<_>>>()
            .map_err(|e| FacetError::Schema(format!("{}: {}", context, e)))?;
        let right_keys = right_names
            .iter()
            .map(|name| other.column(name).cloned())
            .collect::<FacetResult<Vec<_>>>()
            .map_err(|e| FacetError::Schema(format!("{}: {}", context, e)))?;

        let result = join_indices(&left_keys, &right_keys, how)
            .map_err(|e| FacetError::Schema(format!("{}: {}", context, e)))?;

        match result {
            JoinResult::LeftMask(mask) => {
                self.filter_mask(&ChunkedColumn::from_slice(&mask, None))
            }
            JoinResult::Pairs(left_idx, right_idx) => self.materialize_pairs(
                other,
                &left_idx,
                &right_idx,
                &left_names,
                &right_names,
            ),
        }
    }

    /// Cartesian product of two frames
    pub fn cross_join(&self, other: &DataFrame) -> FacetResult<DataFrame> {
        let (left_idx, right_idx) = cross_join_indices(self.height(), other.height());
        self.materialize_pairs(other, &left_idx, &right_idx, &[], &[])
    }

    fn materialize_pairs(
        &self,
        other: &DataFrame,
        left_idx: &[i64],
        right_idx: &[i64],
        left_names: &[&str],
        right_names: &[&str],
    ) -> FacetResult<DataFrame> {
        let left_taken = self.take(left_idx)?;
        let mut columns = left_taken.get_columns().to_vec();

        // Rows that exist only on the right side carry a -1 left index;
        // a shared key column must gather those values from the right key.
        if left_idx.iter().any(|&index| index < 0) {
            for (pair, left_name) in left_names.iter().enumerate() {
                if right_names[pair] != *left_name {
                    continue;
                }
                let merged = coalesce_key(
                    self.column(left_name)?,
                    other.column(right_names[pair])?,
                    left_idx,
                    right_idx,
                )?;
                if let Some(slot) = columns.iter_mut().find(|c| c.name() == *left_name) {
                    *slot = merged;
                }
            }
        }

        for series in other.get_columns() {
            // A right join key sharing its left counterpart's name appears
            // once, from the left side.
            let key_position = right_names.iter().position(|&name| name == series.name());
            if let Some(pair) = key_position {
                if left_names[pair] == series.name() {
                    continue;
                }
            }
            let taken = series.take(right_idx)?;
            let name = series.name();
            if self.column(name).is_ok() {
                columns.push(taken.with_name(format!("{}_right", name)));
            } else {
                columns.push(taken);
            }
        }

        DataFrame::new(columns)
    }
}

/// Gather a shared join key from whichever side has the row: the left
/// column where the left index is real, the right column under the `-1`
/// sentinel. Both sides are unified on their supertype first.
fn coalesce_key(
    left: &Series,
    right: &Series,
    left_idx: &[i64],
    right_idx: &[i64],
) -> FacetResult<Series> {
    let common = left.dtype().supertype(&right.dtype())?;
    let left_taken = left.cast(common)?.take(left_idx)?;
    let right_taken = right.cast(common)?.take(right_idx)?;
    let values: Vec<AnyValue> = left_idx
        .iter()
        .enumerate()
        .map(|(row, &index)| {
            if index >= 0 {
                left_taken.data().get(row)
            } else {
                right_taken.data().get(row)
            }
        })
        .collect();
    series_from_any_values(left.name(), &values, common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;
    use crate::types::AnyValue;

    fn left() -> DataFrame {
        DataFrame::new(vec![
            Series::new("id", &[1i64, 2, 2, 3]),
            Series::new("l", &["a", "b", "c", "d"]),
        ])
        .unwrap()
    }

    fn right() -> DataFrame {
        DataFrame::new(vec![
            Series::new("id", &[2i64, 2, 4]),
            Series::new("r", &["x", "y", "z"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_inner_join_shape_and_names() {
        let out = left().join(&right(), &["id"], &["id"], JoinType::Inner).unwrap();
        assert_eq!(out.height(), 4);
        // The join key appears once.
        assert_eq!(out.columns(), vec!["id", "l", "r"]);
    }

    #[test]
    fn test_left_join_fills_nulls() {
        let out = left().join(&right(), &["id"], &["id"], JoinType::Left).unwrap();
        assert_eq!(out.height(), 6);
        // Rows for id=1 and id=3 have no right match.
        let r = out.column("r").unwrap();
        assert_eq!(r.get(0).unwrap(), AnyValue::Null);
        assert_eq!(r.get(5).unwrap(), AnyValue::Null);
    }

    #[test]
    fn test_duplicate_column_suffix() {
        let l = DataFrame::new(vec![
            Series::new("id", &[1i64]),
            Series::new("v", &[10i64]),
        ])
        .unwrap();
        let r = DataFrame::new(vec![
            Series::new("id", &[1i64]),
            Series::new("v", &[20i64]),
        ])
        .unwrap();
        let out = l.join(&r, &["id"], &["id"], JoinType::Inner).unwrap();
        assert_eq!(out.columns(), vec!["id", "v", "v_right"]);
        assert_eq!(out.column("v").unwrap().get(0).unwrap(), AnyValue::Int64(10));
        assert_eq!(out.column("v_right").unwrap().get(0).unwrap(), AnyValue::Int64(20));
    }

    #[test]
    fn test_outer_join_keeps_both_sides() {
        let out = left().join(&right(), &["id"], &["id"], JoinType::Outer).unwrap();
        // 4 left-join rows (1, 2x2 matches, 3) plus unmatched right id=4.
        assert_eq!(out.height(), 7);
        // The right-only row keeps its real key, gathered from the right.
        let id = out.column("id").unwrap();
        assert_eq!(id.get(6).unwrap(), AnyValue::Int64(4));
        let l = out.column("l").unwrap();
        assert_eq!(l.get(6).unwrap(), AnyValue::Null);
        let r = out.column("r").unwrap();
        assert_eq!(r.get(6).unwrap(), AnyValue::from("z"));
    }

    #[test]
    fn test_semi_anti_keep_left_schema() {
        let semi = left().join(&right(), &["id"], &["id"], JoinType::Semi).unwrap();
        assert_eq!(semi.columns(), vec!["id", "l"]);
        assert_eq!(semi.height(), 2);
        let anti = left().join(&right(), &["id"], &["id"], JoinType::Anti).unwrap();
        assert_eq!(anti.height(), 2);
        assert_eq!(anti.column("id").unwrap().get(0).unwrap(), AnyValue::Int64(1));
    }

    #[test]
    fn test_cross_join() {
        let out = left().cross_join(&right()).unwrap();
        assert_eq!(out.height(), 12);
        assert_eq!(out.columns(), vec!["id", "l", "id_right", "r"]);
    }

    #[test]
    fn test_join_differing_key_names() {
        let l = DataFrame::new(vec![Series::new("lk", &[1i64, 2])]).unwrap();
        let r = DataFrame::new(vec![
            Series::new("rk", &[2i64]),
            Series::new("payload", &["p"]),
        ])
        .unwrap();
        let out = l.join(&r, &["lk"], &["rk"], JoinType::Inner).unwrap();
        // Different key names: both columns survive.
        assert_eq!(out.columns(), vec!["lk", "rk", "payload"]);
    }
}
