//! Hash join engine
//!
//! Equality joins over one or more typed key columns. Single fixed-width
//! keys dispatch to the typed hash tables; single byte keys go through the
//! fingerprint table; multi-key joins normalize every key column to `u32`
//! codes over a union dictionary, pack two codes into one `u64`, and fold
//! more than two through the composite hash with a code-tuple re-check on
//! collision.
//!
//! Build-side choice: inner and cross are symmetric, so the smaller side
//! builds and the larger probes; left, semi and anti always build on the
//! right. Right joins run as left joins with the sides swapped and the
//! outputs swapped back. A null in any key column never matches anything.

use crate::common::error::{FacetError, FacetResult};
use crate::execution::hash::{hash_composite, hash_u64};
use crate::execution::hash_table::{BytesKeyTable, FixedKeyTable, HashKey, JoinPairs};
use crate::execution::parallel::{parallel_for, should_parallel};
use crate::series::{KeyColumn, Series};
use crate::storage::StringChunked;
use crate::types::DataType;
use ahash::AHashMap;

/// The supported join kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
    Cross,
    Semi,
    Anti,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Outer => "outer",
            JoinType::Cross => "cross",
            JoinType::Semi => "semi",
            JoinType::Anti => "anti",
        };
        write!(f, "{}", name)
    }
}

/// Result of the index-level join
pub enum JoinResult {
    /// Parallel `(left_idx, right_idx)` arrays; `-1` marks the unmatched
    /// side of outer variants
    Pairs(Vec<i64>, Vec<i64>),
    /// Per-left-row keep mask, for semi and anti joins
    LeftMask(Vec<bool>),
}

/// Cartesian product indices in left-major order
pub fn cross_join_indices(n_left: usize, n_right: usize) -> JoinPairs {
    let mut left_idx = Vec::with_capacity(n_left * n_right);
    let mut right_idx = Vec::with_capacity(n_left * n_right);
    for l in 0..n_left {
        for r in 0..n_right {
            left_idx.push(l as i64);
            right_idx.push(r as i64);
        }
    }
    (left_idx, right_idx)
}

/// Compute join indices over equal-typed key columns.
///
/// Key columns must come in matching pairs; incompatible dtypes are cast
/// to their supertype before dispatch.
pub fn join_indices(
    left_keys: &[Series],
    right_keys: &[Series],
    how: JoinType,
) -> FacetResult<JoinResult> {
    if how == JoinType::Cross {
        return Err(FacetError::Value(
            "cross join takes no key columns".to_string(),
        ));
    }
    if left_keys.len() != right_keys.len() || left_keys.is_empty() {
        return Err(FacetError::Schema(format!(
            "join requires matching key columns, got {} and {}",
            left_keys.len(),
            right_keys.len()
        )));
    }

    // Right join is a left join with the sides swapped.
    if how == JoinType::Right {
        let result = join_indices(right_keys, left_keys, JoinType::Left)?;
        return Ok(match result {
            JoinResult::Pairs(left_idx, right_idx) => JoinResult::Pairs(right_idx, left_idx),
            JoinResult::LeftMask(_) => unreachable!("left join yields pairs"),
        });
    }

    // Unify each key pair on its supertype.
    let mut left_cast = Vec::with_capacity(left_keys.len());
    let mut right_cast = Vec::with_capacity(right_keys.len());
    for (left, right) in left_keys.iter().zip(right_keys) {
        let (l, r) = unify_key_pair(left, right)?;
        left_cast.push(l);
        right_cast.push(r);
    }

    if left_cast.len() == 1 {
        join_single(&left_cast[0], &right_cast[0], how)
    } else {
        join_multi(&left_cast, &right_cast, how)
    }
}

fn unify_key_pair(left: &Series, right: &Series) -> FacetResult<(Series, Series)> {
    if left.dtype() == right.dtype() {
        return Ok((left.clone(), right.clone()));
    }
    let common = left.dtype().supertype(&right.dtype()).map_err(|_| {
        FacetError::Schema(format!(
            "join keys \"{}\" ({}) and \"{}\" ({}) have incompatible types",
            left.name(),
            left.dtype(),
            right.name(),
            right.dtype()
        ))
    })?;
    Ok((left.cast(common)?, right.cast(common)?))
}

// ---------------------------------------------------------------------------
// Single key

fn join_single(left: &Series, right: &Series, how: JoinType) -> FacetResult<JoinResult> {
    // Typed table dispatch for the native fixed-width key types; other
    // fixed-width keys join over their canonical 64-bit patterns.
    match (left.dtype(), right.dtype()) {
        (DataType::String, DataType::String) | (DataType::Binary, DataType::Binary) => {
            join_bytes(left.str_data()?, right.str_data()?, how)
        }
        (DataType::Int32, _) | (DataType::Date, _) => {
            let (l, lv) = dense_i32(left)?;
            let (r, rv) = dense_i32(right)?;
            join_fixed::<i32>((l, lv), (r, rv), how)
        }
        (DataType::UInt32, _) => {
            let (l, lv) = dense_u32(left)?;
            let (r, rv) = dense_u32(right)?;
            join_fixed::<u32>((l, lv), (r, rv), how)
        }
        (DataType::Int64, _) | (DataType::Time, _) | (DataType::Datetime, _)
        | (DataType::Duration, _) => {
            let (l, lv) = dense_i64(left)?;
            let (r, rv) = dense_i64(right)?;
            join_fixed::<i64>((l, lv), (r, rv), how)
        }
        _ => {
            let (l, lv) = key_bits(left)?;
            let (r, rv) = key_bits(right)?;
            join_fixed::<u64>((l, lv), (r, rv), how)
        }
    }
}

fn dense_i32(series: &Series) -> FacetResult<(Vec<i32>, Option<Vec<bool>>)> {
    use crate::series::SeriesData;
    match series.data() {
        SeriesData::Int32(col) | SeriesData::Date(col) => {
            let (values, validity) = col.to_slice();
            Ok((values, (col.null_count() > 0).then_some(validity)))
        }
        _ => Err(FacetError::Schema(format!(
            "join key \"{}\" has unexpected type {}",
            series.name(),
            series.dtype()
        ))),
    }
}

fn dense_i64(series: &Series) -> FacetResult<(Vec<i64>, Option<Vec<bool>>)> {
    use crate::series::SeriesData;
    match series.data() {
        SeriesData::Int64(col)
        | SeriesData::Time(col)
        | SeriesData::Datetime(col)
        | SeriesData::Duration(col) => {
            let (values, validity) = col.to_slice();
            Ok((values, (col.null_count() > 0).then_some(validity)))
        }
        _ => Err(FacetError::Schema(format!(
            "join key \"{}\" has unexpected type {}",
            series.name(),
            series.dtype()
        ))),
    }
}

fn dense_u32(series: &Series) -> FacetResult<(Vec<u32>, Option<Vec<bool>>)> {
    use crate::series::SeriesData;
    match series.data() {
        SeriesData::UInt32(col) => {
            let (values, validity) = col.to_slice();
            Ok((values, (col.null_count() > 0).then_some(validity)))
        }
        _ => Err(FacetError::Schema(format!(
            "join key \"{}\" has unexpected type {}",
            series.name(),
            series.dtype()
        ))),
    }
}

fn key_bits(series: &Series) -> FacetResult<(Vec<u64>, Option<Vec<bool>>)> {
    match series.to_key_column()? {
        KeyColumn::Fixed { bits, validity } => Ok((bits, validity)),
        KeyColumn::Bytes(_) => Err(FacetError::Schema(format!(
            "join key \"{}\" is not fixed-width",
            series.name()
        ))),
    }
}

fn join_fixed<K: HashKey>(
    left: (Vec<K>, Option<Vec<bool>>),
    right: (Vec<K>, Option<Vec<bool>>),
    how: JoinType,
) -> FacetResult<JoinResult> {
    let (left_keys, left_validity) = left;
    let (right_keys, right_validity) = right;

    match how {
        JoinType::Inner => {
            // Build on the smaller side, probe with the larger.
            let build_left = left_keys.len() <= right_keys.len();
            let (pairs, swapped) = if build_left {
                let table = FixedKeyTable::build(left_keys, left_validity);
                (table.probe(&right_keys, right_validity.as_deref(), false)?, false)
            } else {
                let table = FixedKeyTable::build(right_keys, right_validity);
                (table.probe(&left_keys, left_validity.as_deref(), false)?, true)
            };
            let (build_idx, probe_idx) = pairs;
            if swapped {
                Ok(JoinResult::Pairs(probe_idx, build_idx))
            } else {
                Ok(JoinResult::Pairs(build_idx, probe_idx))
            }
        }
        JoinType::Left => {
            let table = FixedKeyTable::build(right_keys, right_validity);
            let (build_idx, probe_idx) =
                table.probe(&left_keys, left_validity.as_deref(), true)?;
            Ok(JoinResult::Pairs(probe_idx, build_idx))
        }
        JoinType::Outer => {
            let n_right = right_keys.len();
            let table = FixedKeyTable::build(right_keys, right_validity);
            let (build_idx, probe_idx) =
                table.probe(&left_keys, left_validity.as_deref(), true)?;
            Ok(outer_from_left(probe_idx, build_idx, n_right))
        }
        JoinType::Semi | JoinType::Anti => {
            let table = FixedKeyTable::build(right_keys, right_validity);
            let exists = table.probe_exists(&left_keys, left_validity.as_deref())?;
            Ok(mask_result(exists, how))
        }
        JoinType::Right | JoinType::Cross => unreachable!("handled by the caller"),
    }
}

fn join_bytes(left: &StringChunked, right: &StringChunked, how: JoinType) -> FacetResult<JoinResult> {
    match how {
        JoinType::Inner => {
            let build_left = left.len() <= right.len();
            if build_left {
                let table = BytesKeyTable::build(left);
                let (build_idx, probe_idx) = table.probe(right, left, false)?;
                Ok(JoinResult::Pairs(build_idx, probe_idx))
            } else {
                let table = BytesKeyTable::build(right);
                let (build_idx, probe_idx) = table.probe(left, right, false)?;
                Ok(JoinResult::Pairs(probe_idx, build_idx))
            }
        }
        JoinType::Left => {
            let table = BytesKeyTable::build(right);
            let (build_idx, probe_idx) = table.probe(left, right, true)?;
            Ok(JoinResult::Pairs(probe_idx, build_idx))
        }
        JoinType::Outer => {
            let table = BytesKeyTable::build(right);
            let (build_idx, probe_idx) = table.probe(left, right, true)?;
            Ok(outer_from_left(probe_idx, build_idx, right.len()))
        }
        JoinType::Semi | JoinType::Anti => {
            let table = BytesKeyTable::build(right);
            let exists = table.probe_exists(left, right)?;
            Ok(mask_result(exists, how))
        }
        JoinType::Right | JoinType::Cross => unreachable!("handled by the caller"),
    }
}

/// Extend left-join pairs with the unmatched rows of the right side, each
/// emitted with a `-1` left sentinel in right row order
fn outer_from_left(left_idx: Vec<i64>, right_idx: Vec<i64>, n_right: usize) -> JoinResult {
    let mut right_matched = vec![false; n_right];
    for &r in &right_idx {
        if r >= 0 {
            right_matched[r as usize] = true;
        }
    }
    let mut left_idx = left_idx;
    let mut right_idx = right_idx;
    for (row, matched) in right_matched.iter().enumerate() {
        if !matched {
            left_idx.push(-1);
            right_idx.push(row as i64);
        }
    }
    JoinResult::Pairs(left_idx, right_idx)
}

fn mask_result(exists: Vec<bool>, how: JoinType) -> JoinResult {
    if how == JoinType::Anti {
        JoinResult::LeftMask(exists.into_iter().map(|m| !m).collect())
    } else {
        JoinResult::LeftMask(exists)
    }
}

// ---------------------------------------------------------------------------
// Multi-key

/// Per-column codes over a dictionary built on the union of both sides'
/// distinct values; null rows carry no code
struct CodedKeys {
    left: Vec<u32>,
    left_valid: Vec<bool>,
    right: Vec<u32>,
    right_valid: Vec<bool>,
}

fn dictionary_codes(left: &Series, right: &Series) -> FacetResult<CodedKeys> {
    match (left.to_key_column()?, right.to_key_column()?) {
        (
            KeyColumn::Fixed {
                bits: left_bits,
                validity: left_validity,
            },
            KeyColumn::Fixed {
                bits: right_bits,
                validity: right_validity,
            },
        ) => {
            let mut dict: AHashMap<u64, u32> = AHashMap::new();
            let mut encode = |bits: &[u64], validity: Option<&Vec<bool>>| {
                let mut codes = Vec::with_capacity(bits.len());
                let mut valid = Vec::with_capacity(bits.len());
                for (row, &b) in bits.iter().enumerate() {
                    if validity.is_none_or(|v| v[row]) {
                        let next = dict.len() as u32;
                        codes.push(*dict.entry(b).or_insert(next));
                        valid.push(true);
                    } else {
                        codes.push(0);
                        valid.push(false);
                    }
                }
                (codes, valid)
            };
            let (left_codes, left_valid) = encode(&left_bits, left_validity.as_ref());
            let (right_codes, right_valid) = encode(&right_bits, right_validity.as_ref());
            Ok(CodedKeys {
                left: left_codes,
                left_valid,
                right: right_codes,
                right_valid,
            })
        }
        (KeyColumn::Bytes(left_col), KeyColumn::Bytes(right_col)) => {
            let mut dict: AHashMap<Vec<u8>, u32> = AHashMap::new();
            let mut encode = |col: &StringChunked| {
                let mut codes = Vec::with_capacity(col.len());
                let mut valid = Vec::with_capacity(col.len());
                for value in col.iter() {
                    match value {
                        Some(bytes) => {
                            let code = match dict.get(bytes) {
                                Some(&code) => code,
                                None => {
                                    let code = dict.len() as u32;
                                    dict.insert(bytes.to_vec(), code);
                                    code
                                }
                            };
                            codes.push(code);
                            valid.push(true);
                        }
                        None => {
                            codes.push(0);
                            valid.push(false);
                        }
                    }
                }
                (codes, valid)
            };
            let (left_codes, left_valid) = encode(&left_col);
            let (right_codes, right_valid) = encode(&right_col);
            Ok(CodedKeys {
                left: left_codes,
                left_valid,
                right: right_codes,
                right_valid,
            })
        }
        _ => Err(FacetError::Schema(format!(
            "join keys \"{}\" and \"{}\" have incompatible representations",
            left.name(),
            right.name()
        ))),
    }
}

fn join_multi(left_keys: &[Series], right_keys: &[Series], how: JoinType) -> FacetResult<JoinResult> {
    let coded: Vec<CodedKeys> = left_keys
        .iter()
        .zip(right_keys)
        .map(|(l, r)| dictionary_codes(l, r))
        .collect::<FacetResult<_>>()?;

    let n_left = left_keys[0].len();
    let n_right = right_keys[0].len();

    let row_valid = |side_left: bool, row: usize| {
        coded.iter().all(|c| {
            if side_left {
                c.left_valid[row]
            } else {
                c.right_valid[row]
            }
        })
    };
    let left_valid: Vec<bool> = (0..n_left).map(|row| row_valid(true, row)).collect();
    let right_valid: Vec<bool> = (0..n_right).map(|row| row_valid(false, row)).collect();

    if coded.len() == 2 {
        // Two-key fast path: pack both u32 codes into one u64.
        let pack = |side_left: bool, row: usize| -> u64 {
            let hi = if side_left {
                coded[0].left[row]
            } else {
                coded[0].right[row]
            };
            let lo = if side_left {
                coded[1].left[row]
            } else {
                coded[1].right[row]
            };
            (hi as u64) << 32 | lo as u64
        };
        let left_packed: Vec<u64> = (0..n_left).map(|row| pack(true, row)).collect();
        let right_packed: Vec<u64> = (0..n_right).map(|row| pack(false, row)).collect();
        return join_fixed::<u64>(
            (left_packed, Some(left_valid)),
            (right_packed, Some(right_valid)),
            how,
        );
    }

    // N-key path: fold the codes into a composite and re-check the code
    // tuple on composite collision.
    let composite = |side_left: bool, row: usize| -> u64 {
        let fields: Vec<u64> = coded
            .iter()
            .map(|c| {
                hash_u64(if side_left {
                    c.left[row] as u64
                } else {
                    c.right[row] as u64
                })
            })
            .collect();
        hash_composite(&fields)
    };
    let left_composites: Vec<u64> = (0..n_left).map(|row| composite(true, row)).collect();
    let right_composites: Vec<u64> = (0..n_right).map(|row| composite(false, row)).collect();

    let codes_equal = |left_row: usize, right_row: usize| {
        coded
            .iter()
            .all(|c| c.left[left_row] == c.right[right_row])
    };

    // The right side always builds here; inner symmetry is not worth the
    // extra swap plumbing on the composite path.
    let table = FixedKeyTable::build(right_composites, Some(right_valid.clone()));

    match how {
        JoinType::Inner | JoinType::Left | JoinType::Outer => {
            let emit_unmatched = how != JoinType::Inner;
            let probe_range = |start: usize, end: usize| -> FacetResult<JoinPairs> {
                let mut left_idx = Vec::new();
                let mut right_idx = Vec::new();
                for row in start..end {
                    let mut matched = false;
                    if left_valid[row] {
                        for build_row in table.candidates(left_composites[row]) {
                            if codes_equal(row, build_row as usize) {
                                left_idx.push(row as i64);
                                right_idx.push(build_row as i64);
                                matched = true;
                            }
                        }
                    }
                    if !matched && emit_unmatched {
                        left_idx.push(row as i64);
                        right_idx.push(-1);
                    }
                }
                Ok((left_idx, right_idx))
            };

            let parts = if should_parallel(n_left) {
                parallel_for(n_left, probe_range)?
            } else {
                vec![probe_range(0, n_left)?]
            };
            let mut left_idx = Vec::new();
            let mut right_idx = Vec::new();
            for (l, r) in parts {
                left_idx.extend(l);
                right_idx.extend(r);
            }
            if how == JoinType::Outer {
                Ok(outer_from_left(left_idx, right_idx, n_right))
            } else {
                Ok(JoinResult::Pairs(left_idx, right_idx))
            }
        }
        JoinType::Semi | JoinType::Anti => {
            let exists: Vec<bool> = (0..n_left)
                .map(|row| {
                    left_valid[row]
                        && table
                            .candidates(left_composites[row])
                            .any(|build_row| codes_equal(row, build_row as usize))
                })
                .collect();
            Ok(mask_result(exists, how))
        }
        JoinType::Right | JoinType::Cross => unreachable!("handled by the caller"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(result: JoinResult) -> (Vec<i64>, Vec<i64>) {
        match result {
            JoinResult::Pairs(l, r) => (l, r),
            JoinResult::LeftMask(_) => panic!("expected pairs"),
        }
    }

    fn mask(result: JoinResult) -> Vec<bool> {
        match result {
            JoinResult::LeftMask(m) => m,
            JoinResult::Pairs(..) => panic!("expected mask"),
        }
    }

    #[test]
    fn test_inner_join_duplicates() {
        let left = Series::new("id", &[1i64, 2, 2, 3]);
        let right = Series::new("id", &[2i64, 2, 4]);
        let (l, r) = pairs(
            join_indices(
                std::slice::from_ref(&left),
                std::slice::from_ref(&right),
                JoinType::Inner,
            )
            .unwrap(),
        );
        // Probe side is the larger left; order preserves left rows, then
        // right build order within a left row.
        assert_eq!(l, vec![1, 1, 2, 2]);
        assert_eq!(r, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_left_join_null_key() {
        let left = Series::new("id", &[Some(1i64), None, Some(3)]);
        let right = Series::new("id", &[1i64, 3]);
        let (l, r) = pairs(
            join_indices(
                std::slice::from_ref(&left),
                std::slice::from_ref(&right),
                JoinType::Left,
            )
            .unwrap(),
        );
        assert_eq!(l, vec![0, 1, 2]);
        assert_eq!(r, vec![0, -1, 1]);
    }

    #[test]
    fn test_right_join_swaps_back() {
        let left = Series::new("id", &[1i64, 3]);
        let right = Series::new("id", &[Some(3i64), Some(9)]);
        let (l, r) = pairs(
            join_indices(
                std::slice::from_ref(&left),
                std::slice::from_ref(&right),
                JoinType::Right,
            )
            .unwrap(),
        );
        assert_eq!(l, vec![1, -1]);
        assert_eq!(r, vec![0, 1]);
    }

    #[test]
    fn test_outer_join_appends_unmatched_right() {
        let left = Series::new("id", &[1i64, 2]);
        let right = Series::new("id", &[2i64, 7]);
        let (l, r) = pairs(
            join_indices(
                std::slice::from_ref(&left),
                std::slice::from_ref(&right),
                JoinType::Outer,
            )
            .unwrap(),
        );
        assert_eq!(l, vec![0, 1, -1]);
        assert_eq!(r, vec![-1, 0, 1]);
    }

    #[test]
    fn test_semi_anti() {
        let left = Series::new("id", &[1i64, 2, 3]);
        let right = Series::new("id", &[2i64]);
        let semi = mask(
            join_indices(
                std::slice::from_ref(&left),
                std::slice::from_ref(&right),
                JoinType::Semi,
            )
            .unwrap(),
        );
        let anti = mask(
            join_indices(
                std::slice::from_ref(&left),
                std::slice::from_ref(&right),
                JoinType::Anti,
            )
            .unwrap(),
        );
        assert_eq!(semi, vec![false, true, false]);
        assert_eq!(anti, vec![true, false, true]);
    }

    #[test]
    fn test_string_key_join() {
        let left = Series::new("k", &["a", "b", "c"]);
        let right = Series::new("k", &["b", "c", "b"]);
        let (l, r) = pairs(
            join_indices(
                std::slice::from_ref(&left),
                std::slice::from_ref(&right),
                JoinType::Inner,
            )
            .unwrap(),
        );
        // Right is larger, so left builds and right probes: probe order.
        assert_eq!(r, vec![0, 1, 2]);
        assert_eq!(l, vec![1, 2, 1]);
    }

    #[test]
    fn test_mixed_width_keys_unify() {
        let left = Series::new("id", &[1i32, 2]);
        let right = Series::new("id", &[2i64, 3]);
        let (l, r) = pairs(
            join_indices(
                std::slice::from_ref(&left),
                std::slice::from_ref(&right),
                JoinType::Inner,
            )
            .unwrap(),
        );
        assert_eq!(l, vec![1]);
        assert_eq!(r, vec![0]);
    }

    #[test]
    fn test_two_key_join() {
        let l1 = Series::new("a", &[1i64, 1, 2]);
        let l2 = Series::new("b", &["x", "y", "x"]);
        let r1 = Series::new("a", &[1i64, 2]);
        let r2 = Series::new("b", &["y", "x"]);
        let (l, r) = pairs(
            join_indices(&[l1, l2], &[r1, r2], JoinType::Inner).unwrap(),
        );
        assert_eq!(l, vec![1, 2]);
        assert_eq!(r, vec![0, 1]);
    }

    #[test]
    fn test_multi_key_null_field_never_matches() {
        let l1 = Series::new("a", &[Some(1i64), Some(1)]);
        let l2 = Series::new("b", &[Some("x"), None]);
        let r1 = Series::new("a", &[1i64, 1]);
        let r2 = Series::new("b", &[Some("x"), None]);
        let (l, r) = pairs(
            join_indices(&[l1, l2], &[r1, r2], JoinType::Left).unwrap(),
        );
        // Row 1 has a null key field: no match even against the right null.
        assert_eq!(l, vec![0, 1]);
        assert_eq!(r, vec![0, -1]);
    }

    #[test]
    fn test_three_key_composite_join() {
        let l1 = Series::new("a", &[1i64, 2, 1]);
        let l2 = Series::new("b", &["x", "y", "x"]);
        let l3 = Series::new("c", &[true, false, false]);
        let r1 = Series::new("a", &[1i64, 1]);
        let r2 = Series::new("b", &["x", "x"]);
        let r3 = Series::new("c", &[false, true]);
        let (l, r) = pairs(
            join_indices(&[l1, l2, l3], &[r1, r2, r3], JoinType::Inner).unwrap(),
        );
        assert_eq!(l, vec![0, 2]);
        assert_eq!(r, vec![1, 0]);
    }

    #[test]
    fn test_cross_join_indices() {
        let (l, r) = cross_join_indices(2, 3);
        assert_eq!(l, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(r, vec![0, 1, 2, 0, 1, 2]);
    }
}
