//! Group-driven aggregation kernels
//!
//! Every kernel takes a value column, the row→group-id array and the group
//! count, allocates accumulators of size `n_groups`, and fans the single
//! value scan out into the accumulator slots. Null inputs never contribute.
//!
//! Null semantics per kernel: `sum` of an empty group is zero of the input
//! type; `mean`/`min`/`max`/`median` of an empty group are null; `count`
//! is never null; `var`/`std` need at least two values; `first`/`last`
//! skip nulls and are null for all-null groups; `corr` needs two valid
//! pairs and nonzero variance on both sides.

use crate::common::error::{FacetError, FacetResult};
use crate::storage::chunk::NativeType;
use crate::storage::{ChunkedColumn, StringChunk, StringChunked};
use num_traits::Zero;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::ops::Add;

fn check_group_ids(n_rows: usize, group_ids: &[u32]) -> FacetResult<()> {
    if group_ids.len() != n_rows {
        return Err(FacetError::Shape(format!(
            "aggregation got {} group ids for {} rows",
            group_ids.len(),
            n_rows
        )));
    }
    Ok(())
}

/// Per-group sum in the input type; empty groups sum to zero
pub fn sum_groups<T>(
    values: &ChunkedColumn<T>,
    group_ids: &[u32],
    n_groups: usize,
) -> FacetResult<ChunkedColumn<T>>
where
    T: NativeType + Zero + Add<Output = T> + Default,
{
    check_group_ids(values.len(), group_ids)?;
    let mut sums = vec![T::zero(); n_groups];
    for (value, &group) in values.iter().zip(group_ids) {
        if let Some(v) = value {
            sums[group as usize] = sums[group as usize] + v;
        }
    }
    Ok(ChunkedColumn::from_vec(sums, None))
}

/// Per-group extremum in the input type; empty groups are null
pub fn min_max_groups<T, F>(
    values: &ChunkedColumn<T>,
    group_ids: &[u32],
    n_groups: usize,
    compare: F,
    take_max: bool,
) -> FacetResult<ChunkedColumn<T>>
where
    T: NativeType + Default,
    F: Fn(&T, &T) -> Ordering,
{
    check_group_ids(values.len(), group_ids)?;
    let mut extremes: Vec<Option<T>> = vec![None; n_groups];
    for (value, &group) in values.iter().zip(group_ids) {
        if let Some(v) = value {
            let slot = &mut extremes[group as usize];
            let replace = match slot {
                None => true,
                Some(current) => {
                    let ordering = compare(&v, current);
                    if take_max {
                        ordering == Ordering::Greater
                    } else {
                        ordering == Ordering::Less
                    }
                }
            };
            if replace {
                *slot = Some(v);
            }
        }
    }
    Ok(ChunkedColumn::from_options(&extremes))
}

/// Per-group count of non-null values; never null
pub fn count_groups(
    validity: impl Iterator<Item = bool>,
    group_ids: &[u32],
    n_groups: usize,
) -> ChunkedColumn<i64> {
    let mut counts = vec![0i64; n_groups];
    for (valid, &group) in validity.zip(group_ids) {
        if valid {
            counts[group as usize] += 1;
        }
    }
    ChunkedColumn::from_vec(counts, None)
}

/// Shared single-scan statistics for the floating-point aggregation family.
/// One pass serves `mean`, `var` and `std` of the same column.
#[derive(Debug)]
pub struct GroupedStats {
    pub count: Vec<u64>,
    pub sum: Vec<f64>,
    pub sum_sq: Vec<f64>,
}

impl GroupedStats {
    pub fn compute(
        values: &[f64],
        validity: Option<&[bool]>,
        group_ids: &[u32],
        n_groups: usize,
    ) -> FacetResult<GroupedStats> {
        check_group_ids(values.len(), group_ids)?;
        let mut stats = GroupedStats {
            count: vec![0; n_groups],
            sum: vec![0.0; n_groups],
            sum_sq: vec![0.0; n_groups],
        };
        for (row, (&value, &group)) in values.iter().zip(group_ids).enumerate() {
            if validity.is_none_or(|v| v[row]) {
                let g = group as usize;
                stats.count[g] += 1;
                stats.sum[g] += value;
                stats.sum_sq[g] += value * value;
            }
        }
        Ok(stats)
    }

    /// Per-group mean; empty groups are null
    pub fn mean(&self) -> ChunkedColumn<f64> {
        let values: Vec<Option<f64>> = self
            .count
            .iter()
            .zip(&self.sum)
            .map(|(&count, &sum)| (count > 0).then(|| sum / count as f64))
            .collect();
        ChunkedColumn::from_options(&values)
    }

    /// Per-group sample variance (ddof = 1); groups with fewer than two
    /// values are null
    pub fn var(&self) -> ChunkedColumn<f64> {
        let values: Vec<Option<f64>> = (0..self.count.len())
            .map(|g| {
                let n = self.count[g] as f64;
                if self.count[g] < 2 {
                    return None;
                }
                let mean = self.sum[g] / n;
                Some((self.sum_sq[g] - n * mean * mean) / (n - 1.0))
            })
            .collect();
        ChunkedColumn::from_options(&values)
    }

    /// Per-group sample standard deviation
    pub fn std(&self) -> ChunkedColumn<f64> {
        let values: Vec<Option<f64>> = self
            .var()
            .iter()
            .map(|v| v.map(|x| x.max(0.0).sqrt()))
            .collect();
        ChunkedColumn::from_options(&values)
    }
}

/// Per-group median of valid values; empty groups are null
pub fn median_groups(
    values: &[f64],
    validity: Option<&[bool]>,
    group_ids: &[u32],
    n_groups: usize,
) -> FacetResult<ChunkedColumn<f64>> {
    check_group_ids(values.len(), group_ids)?;
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); n_groups];
    for (row, (&value, &group)) in values.iter().zip(group_ids).enumerate() {
        if validity.is_none_or(|v| v[row]) {
            buckets[group as usize].push(value);
        }
    }
    let medians: Vec<Option<f64>> = buckets
        .into_iter()
        .map(|mut bucket| {
            if bucket.is_empty() {
                return None;
            }
            bucket.sort_by(|a, b| OrderedFloat(*a).cmp(&OrderedFloat(*b)));
            let mid = bucket.len() / 2;
            Some(if bucket.len() % 2 == 1 {
                bucket[mid]
            } else {
                (bucket[mid - 1] + bucket[mid]) / 2.0
            })
        })
        .collect();
    Ok(ChunkedColumn::from_options(&medians))
}

/// Per-group first non-null value in insertion order; all-null groups are
/// null
pub fn first_groups<T>(
    values: &ChunkedColumn<T>,
    group_ids: &[u32],
    n_groups: usize,
) -> FacetResult<ChunkedColumn<T>>
where
    T: NativeType + Default,
{
    check_group_ids(values.len(), group_ids)?;
    let mut firsts: Vec<Option<T>> = vec![None; n_groups];
    for (value, &group) in values.iter().zip(group_ids) {
        if let Some(v) = value {
            let slot = &mut firsts[group as usize];
            if slot.is_none() {
                *slot = Some(v);
            }
        }
    }
    Ok(ChunkedColumn::from_options(&firsts))
}

/// Per-group last non-null value in insertion order
pub fn last_groups<T>(
    values: &ChunkedColumn<T>,
    group_ids: &[u32],
    n_groups: usize,
) -> FacetResult<ChunkedColumn<T>>
where
    T: NativeType + Default,
{
    check_group_ids(values.len(), group_ids)?;
    let mut lasts: Vec<Option<T>> = vec![None; n_groups];
    for (value, &group) in values.iter().zip(group_ids) {
        if let Some(v) = value {
            lasts[group as usize] = Some(v);
        }
    }
    Ok(ChunkedColumn::from_options(&lasts))
}

/// Byte-column first/last variants
pub fn first_groups_bytes(
    values: &StringChunked,
    group_ids: &[u32],
    n_groups: usize,
    take_last: bool,
) -> FacetResult<StringChunked> {
    check_group_ids(values.len(), group_ids)?;
    let mut picks: Vec<Option<&[u8]>> = vec![None; n_groups];
    for (value, &group) in values.iter().zip(group_ids) {
        if let Some(bytes) = value {
            let slot = &mut picks[group as usize];
            if take_last || slot.is_none() {
                *slot = Some(bytes);
            }
        }
    }
    let mut result = StringChunked::new();
    result.append_chunk(StringChunk::from_bytes_iter(picks.into_iter()));
    Ok(result)
}

/// Per-group k largest (or smallest) valid values, sorted best-first.
/// Groups holding fewer than k values yield a shorter list.
pub fn top_k_groups<T, F>(
    values: &ChunkedColumn<T>,
    group_ids: &[u32],
    n_groups: usize,
    k: usize,
    largest: bool,
    compare: F,
) -> FacetResult<Vec<Vec<T>>>
where
    T: NativeType,
    F: Fn(&T, &T) -> Ordering,
{
    check_group_ids(values.len(), group_ids)?;
    let mut buckets: Vec<Vec<T>> = vec![Vec::new(); n_groups];
    for (value, &group) in values.iter().zip(group_ids) {
        if let Some(v) = value {
            buckets[group as usize].push(v);
        }
    }
    for bucket in &mut buckets {
        if largest {
            bucket.sort_by(|a, b| compare(b, a));
        } else {
            bucket.sort_by(|a, b| compare(a, b));
        }
        bucket.truncate(k);
    }
    Ok(buckets)
}

/// Per-group Pearson correlation over rows where both sides are valid.
/// Fewer than two pairs, or zero variance on either side, is null.
pub fn corr_groups(
    a_values: &[f64],
    a_validity: Option<&[bool]>,
    b_values: &[f64],
    b_validity: Option<&[bool]>,
    group_ids: &[u32],
    n_groups: usize,
) -> FacetResult<ChunkedColumn<f64>> {
    if a_values.len() != b_values.len() {
        return Err(FacetError::Shape(format!(
            "corr inputs have lengths {} and {}",
            a_values.len(),
            b_values.len()
        )));
    }
    check_group_ids(a_values.len(), group_ids)?;

    let mut count = vec![0u64; n_groups];
    let mut sum_a = vec![0.0f64; n_groups];
    let mut sum_b = vec![0.0f64; n_groups];
    let mut sum_aa = vec![0.0f64; n_groups];
    let mut sum_bb = vec![0.0f64; n_groups];
    let mut sum_ab = vec![0.0f64; n_groups];

    for row in 0..a_values.len() {
        let pair_valid =
            a_validity.is_none_or(|v| v[row]) && b_validity.is_none_or(|v| v[row]);
        if !pair_valid {
            continue;
        }
        let g = group_ids[row] as usize;
        let (a, b) = (a_values[row], b_values[row]);
        count[g] += 1;
        sum_a[g] += a;
        sum_b[g] += b;
        sum_aa[g] += a * a;
        sum_bb[g] += b * b;
        sum_ab[g] += a * b;
    }

    let correlations: Vec<Option<f64>> = (0..n_groups)
        .map(|g| {
            if count[g] < 2 {
                return None;
            }
            let n = count[g] as f64;
            let cov = sum_ab[g] - sum_a[g] * sum_b[g] / n;
            let var_a = sum_aa[g] - sum_a[g] * sum_a[g] / n;
            let var_b = sum_bb[g] - sum_b[g] * sum_b[g] / n;
            if var_a <= 0.0 || var_b <= 0.0 {
                return None;
            }
            Some(cov / (var_a * var_b).sqrt())
        })
        .collect();
    Ok(ChunkedColumn::from_options(&correlations))
}
