//! Typed aggregation entry points on series
//!
//! Dispatches a series payload into the monomorphic grouped kernels and
//! wraps the result back into a series of the contracted output type.
//! Scalar (whole-column) aggregations are the grouped kernels run with a
//! single group.

use crate::common::error::{FacetError, FacetResult};
use crate::execution::aggregate::{
    corr_groups, count_groups, first_groups, first_groups_bytes, last_groups, median_groups,
    min_max_groups, sum_groups, top_k_groups, GroupedStats,
};
use crate::series::{ListColumn, Series, SeriesData};
use crate::types::AnyValue;
use ordered_float::OrderedFloat;

/// Grouped sum; output keeps the input type
pub fn agg_sum(series: &Series, group_ids: &[u32], n_groups: usize) -> FacetResult<Series> {
    let data = match series.data() {
        SeriesData::Int8(col) => SeriesData::Int8(sum_groups(col, group_ids, n_groups)?),
        SeriesData::Int16(col) => SeriesData::Int16(sum_groups(col, group_ids, n_groups)?),
        SeriesData::Int32(col) => SeriesData::Int32(sum_groups(col, group_ids, n_groups)?),
        SeriesData::Int64(col) => SeriesData::Int64(sum_groups(col, group_ids, n_groups)?),
        SeriesData::UInt8(col) => SeriesData::UInt8(sum_groups(col, group_ids, n_groups)?),
        SeriesData::UInt16(col) => SeriesData::UInt16(sum_groups(col, group_ids, n_groups)?),
        SeriesData::UInt32(col) => SeriesData::UInt32(sum_groups(col, group_ids, n_groups)?),
        SeriesData::UInt64(col) => SeriesData::UInt64(sum_groups(col, group_ids, n_groups)?),
        SeriesData::Float32(col) => SeriesData::Float32(sum_groups(col, group_ids, n_groups)?),
        SeriesData::Float64(col) => SeriesData::Float64(sum_groups(col, group_ids, n_groups)?),
        other => {
            return Err(FacetError::Schema(format!(
                "sum is not supported for series \"{}\" of type {}",
                series.name(),
                other.dtype()
            )))
        }
    };
    Ok(Series::from_data(series.name(), data))
}

/// Grouped min or max; output keeps the input type
pub fn agg_min_max(
    series: &Series,
    group_ids: &[u32],
    n_groups: usize,
    take_max: bool,
) -> FacetResult<Series> {
    let data = match series.data() {
        SeriesData::Boolean(col) => SeriesData::Boolean(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::Int8(col) => SeriesData::Int8(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::Int16(col) => SeriesData::Int16(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::Int32(col) => SeriesData::Int32(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::Int64(col) => SeriesData::Int64(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::UInt8(col) => SeriesData::UInt8(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::UInt16(col) => SeriesData::UInt16(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::UInt32(col) => SeriesData::UInt32(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::UInt64(col) => SeriesData::UInt64(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::Float32(col) => SeriesData::Float32(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            take_max,
        )?),
        SeriesData::Float64(col) => SeriesData::Float64(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            take_max,
        )?),
        SeriesData::Date(col) => SeriesData::Date(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::Time(col) => SeriesData::Time(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::Datetime(col) => SeriesData::Datetime(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::Duration(col) => SeriesData::Duration(min_max_groups(
            col,
            group_ids,
            n_groups,
            |a, b| a.cmp(b),
            take_max,
        )?),
        SeriesData::String(col) => {
            // Extremum over bytes in lexicographic order.
            let mut picks: Vec<Option<&[u8]>> = vec![None; n_groups];
            for (value, &group) in col.iter().zip(group_ids) {
                if let Some(bytes) = value {
                    let slot = &mut picks[group as usize];
                    let replace = match slot {
                        None => true,
                        Some(current) => {
                            if take_max {
                                bytes > *current
                            } else {
                                bytes < *current
                            }
                        }
                    };
                    if replace {
                        *slot = Some(bytes);
                    }
                }
            }
            let mut result = crate::storage::StringChunked::new();
            result.append_chunk(crate::storage::StringChunk::from_bytes_iter(
                picks.into_iter(),
            ));
            SeriesData::String(result)
        }
        other => {
            return Err(FacetError::Schema(format!(
                "{} is not supported for series \"{}\" of type {}",
                if take_max { "max" } else { "min" },
                series.name(),
                other.dtype()
            )))
        }
    };
    Ok(Series::from_data(series.name(), data))
}

/// Grouped count of non-null values; Int64, never null
pub fn agg_count(series: &Series, group_ids: &[u32], n_groups: usize) -> FacetResult<Series> {
    if series.len() != group_ids.len() {
        return Err(FacetError::Shape(format!(
            "aggregation got {} group ids for {} rows",
            group_ids.len(),
            series.len()
        )));
    }
    let validity = (0..series.len()).map(|row| series.is_valid(row));
    let counts = count_groups(validity, group_ids, n_groups);
    Ok(Series::from_data(series.name(), SeriesData::Int64(counts)))
}

/// Shared single-scan statistics for mean/var/std over one column
pub fn stats(series: &Series, group_ids: &[u32], n_groups: usize) -> FacetResult<GroupedStats> {
    let (values, validity) = series.numeric_f64()?;
    GroupedStats::compute(&values, validity.as_deref(), group_ids, n_groups)
}

/// Grouped median; Float64
pub fn agg_median(series: &Series, group_ids: &[u32], n_groups: usize) -> FacetResult<Series> {
    let (values, validity) = series.numeric_f64()?;
    let medians = median_groups(&values, validity.as_deref(), group_ids, n_groups)?;
    Ok(Series::from_data(series.name(), SeriesData::Float64(medians)))
}

/// Grouped first/last non-null value; output keeps the input type
pub fn agg_first_last(
    series: &Series,
    group_ids: &[u32],
    n_groups: usize,
    take_last: bool,
) -> FacetResult<Series> {
    macro_rules! pick {
        ($col:expr, $variant:ident) => {
            if take_last {
                SeriesData::$variant(last_groups($col, group_ids, n_groups)?)
            } else {
                SeriesData::$variant(first_groups($col, group_ids, n_groups)?)
            }
        };
    }
    let data = match series.data() {
        SeriesData::Boolean(col) => pick!(col, Boolean),
        SeriesData::Int8(col) => pick!(col, Int8),
        SeriesData::Int16(col) => pick!(col, Int16),
        SeriesData::Int32(col) => pick!(col, Int32),
        SeriesData::Int64(col) => pick!(col, Int64),
        SeriesData::UInt8(col) => pick!(col, UInt8),
        SeriesData::UInt16(col) => pick!(col, UInt16),
        SeriesData::UInt32(col) => pick!(col, UInt32),
        SeriesData::UInt64(col) => pick!(col, UInt64),
        SeriesData::Float32(col) => pick!(col, Float32),
        SeriesData::Float64(col) => pick!(col, Float64),
        SeriesData::Date(col) => pick!(col, Date),
        SeriesData::Time(col) => pick!(col, Time),
        SeriesData::Datetime(col) => pick!(col, Datetime),
        SeriesData::Duration(col) => pick!(col, Duration),
        SeriesData::String(col) => {
            SeriesData::String(first_groups_bytes(col, group_ids, n_groups, take_last)?)
        }
        SeriesData::Binary(col) => {
            SeriesData::Binary(first_groups_bytes(col, group_ids, n_groups, take_last)?)
        }
        SeriesData::Null(_) => SeriesData::Null(n_groups),
        other => {
            return Err(FacetError::Schema(format!(
                "{} is not supported for series \"{}\" of type {}",
                if take_last { "last" } else { "first" },
                series.name(),
                other.dtype()
            )))
        }
    };
    Ok(Series::from_data(series.name(), data))
}

/// Grouped top-k; output is a list column of the input type's values
pub fn agg_top_k(
    series: &Series,
    group_ids: &[u32],
    n_groups: usize,
    k: usize,
    largest: bool,
) -> FacetResult<Series> {
    macro_rules! top {
        ($col:expr, $cmp:expr, $wrap:expr) => {{
            let buckets = top_k_groups($col, group_ids, n_groups, k, largest, $cmp)?;
            buckets
                .into_iter()
                .map(|bucket| Some(bucket.into_iter().map($wrap).collect::<Vec<AnyValue>>()))
                .collect::<Vec<_>>()
        }};
    }
    let items = match series.data() {
        SeriesData::Int8(col) => top!(col, |a: &i8, b: &i8| a.cmp(b), AnyValue::Int8),
        SeriesData::Int16(col) => top!(col, |a: &i16, b: &i16| a.cmp(b), AnyValue::Int16),
        SeriesData::Int32(col) => top!(col, |a: &i32, b: &i32| a.cmp(b), AnyValue::Int32),
        SeriesData::Int64(col) => top!(col, |a: &i64, b: &i64| a.cmp(b), AnyValue::Int64),
        SeriesData::UInt8(col) => top!(col, |a: &u8, b: &u8| a.cmp(b), AnyValue::UInt8),
        SeriesData::UInt16(col) => top!(col, |a: &u16, b: &u16| a.cmp(b), AnyValue::UInt16),
        SeriesData::UInt32(col) => top!(col, |a: &u32, b: &u32| a.cmp(b), AnyValue::UInt32),
        SeriesData::UInt64(col) => top!(col, |a: &u64, b: &u64| a.cmp(b), AnyValue::UInt64),
        SeriesData::Float32(col) => top!(
            col,
            |a: &f32, b: &f32| OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            AnyValue::Float32
        ),
        SeriesData::Float64(col) => top!(
            col,
            |a: &f64, b: &f64| OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            AnyValue::Float64
        ),
        other => {
            return Err(FacetError::Schema(format!(
                "top_k is not supported for series \"{}\" of type {}",
                series.name(),
                other.dtype()
            )))
        }
    };
    Ok(Series::from_data(
        series.name(),
        SeriesData::List(ListColumn::new(items)),
    ))
}

/// Grouped Pearson correlation of two numeric columns; Float64
pub fn agg_corr(
    a: &Series,
    b: &Series,
    group_ids: &[u32],
    n_groups: usize,
) -> FacetResult<Series> {
    let (a_values, a_validity) = a.numeric_f64()?;
    let (b_values, b_validity) = b.numeric_f64()?;
    let correlations = corr_groups(
        &a_values,
        a_validity.as_deref(),
        &b_values,
        b_validity.as_deref(),
        group_ids,
        n_groups,
    )?;
    Ok(Series::from_data(a.name(), SeriesData::Float64(correlations)))
}

impl Series {
    fn single_group(&self) -> Vec<u32> {
        vec![0; self.len()]
    }

    fn scalar_from(series: FacetResult<Series>) -> FacetResult<AnyValue> {
        let series = series?;
        series.get(0)
    }

    /// Sum of all valid values; zero for an all-null column
    pub fn sum(&self) -> FacetResult<AnyValue> {
        Self::scalar_from(agg_sum(self, &self.single_group(), 1))
    }

    /// Mean of all valid values; null when empty
    pub fn mean(&self) -> FacetResult<AnyValue> {
        let stats = stats(self, &self.single_group(), 1)?;
        Ok(Series::from_data("mean", SeriesData::Float64(stats.mean())).get(0)?)
    }

    /// Minimum of all valid values; null when empty
    pub fn min(&self) -> FacetResult<AnyValue> {
        Self::scalar_from(agg_min_max(self, &self.single_group(), 1, false))
    }

    /// Maximum of all valid values; null when empty
    pub fn max(&self) -> FacetResult<AnyValue> {
        Self::scalar_from(agg_min_max(self, &self.single_group(), 1, true))
    }

    /// Count of non-null values
    pub fn count(&self) -> usize {
        self.len() - self.null_count()
    }

    /// Sample variance (ddof = 1); null with fewer than two values
    pub fn var(&self) -> FacetResult<AnyValue> {
        let stats = stats(self, &self.single_group(), 1)?;
        Ok(Series::from_data("var", SeriesData::Float64(stats.var())).get(0)?)
    }

    /// Sample standard deviation; null with fewer than two values
    pub fn std(&self) -> FacetResult<AnyValue> {
        let stats = stats(self, &self.single_group(), 1)?;
        Ok(Series::from_data("std", SeriesData::Float64(stats.std())).get(0)?)
    }

    /// Median of all valid values; null when empty
    pub fn median(&self) -> FacetResult<AnyValue> {
        Self::scalar_from(agg_median(self, &self.single_group(), 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_aggregations() {
        let s = Series::new("v", &[Some(1i64), Some(2), None, Some(3)]);
        assert_eq!(s.sum().unwrap(), AnyValue::Int64(6));
        assert_eq!(s.mean().unwrap(), AnyValue::Float64(2.0));
        assert_eq!(s.min().unwrap(), AnyValue::Int64(1));
        assert_eq!(s.max().unwrap(), AnyValue::Int64(3));
        assert_eq!(s.count(), 3);
        assert_eq!(s.median().unwrap(), AnyValue::Float64(2.0));
    }

    #[test]
    fn test_scalar_var_std() {
        let s = Series::new("v", &[2.0f64, 4.0, 6.0]);
        assert_eq!(s.var().unwrap(), AnyValue::Float64(4.0));
        assert_eq!(s.std().unwrap(), AnyValue::Float64(2.0));
        let single = Series::new("one", &[1.0f64]);
        assert_eq!(single.var().unwrap(), AnyValue::Null);
    }

    #[test]
    fn test_sum_keeps_dtype() {
        let s = Series::new("v", &[1.5f32, 2.5]);
        assert_eq!(s.sum().unwrap(), AnyValue::Float32(4.0));
    }

    #[test]
    fn test_string_min_max() {
        let s = Series::new("s", &[Some("pear"), Some("apple"), None]);
        let group_ids = vec![0u32, 0, 0];
        let min = agg_min_max(&s, &group_ids, 1, false).unwrap();
        let max = agg_min_max(&s, &group_ids, 1, true).unwrap();
        assert_eq!(min.get(0).unwrap(), AnyValue::from("apple"));
        assert_eq!(max.get(0).unwrap(), AnyValue::from("pear"));
    }

    #[test]
    fn test_top_k_list_output() {
        let s = Series::new("v", &[5i64, 1, 9, 3]);
        let group_ids = vec![0u32, 0, 1, 1];
        let top = agg_top_k(&s, &group_ids, 2, 1, true).unwrap();
        assert_eq!(top.dtype(), crate::types::DataType::List);
        assert_eq!(
            top.get(0).unwrap(),
            AnyValue::List(vec![AnyValue::Int64(5)])
        );
        assert_eq!(
            top.get(1).unwrap(),
            AnyValue::List(vec![AnyValue::Int64(9)])
        );
    }
}
