//! Group-by engine
//!
//! Builds the row→group-id map for one or more key columns. Groups are
//! numbered densely in order of first appearance in the input; a null key
//! forms its own group at the position of its first null row. The same
//! ordering holds under the parallel partitioned build: partial maps merge
//! on the minimum first row per group, then sort by that minimum.
//!
//! Single keys take a typed fast path over canonical 64-bit key bits
//! (floats normalized, so `-0.0` joins `+0.0` and all NaNs group
//! together); byte keys go through fingerprints with equality re-checks;
//! multi-key rows fold per-field hashes into a composite and break
//! composite collisions with a tag-and-length-prefixed encoded key.

use crate::common::error::{FacetError, FacetResult};
use crate::execution::hash::{combine_hash, hash_bytes, hash_u64};
use crate::execution::parallel::{parallel_for, should_parallel};
use crate::series::{KeyColumn, Series};
use crate::storage::StringChunked;
use ahash::AHashMap;
use std::collections::hash_map::Entry;

/// Field hash of a null key slot, salted by the column tag
#[inline]
fn null_field_hash(tag: u8) -> u64 {
    hash_u64(0x6e75_6c6c_0000_0000 | tag as u64)
}

/// The row→group-id map
#[derive(Debug, Clone)]
pub struct GroupMap {
    /// Dense group id per input row; every id is `< n_groups`
    pub row_group_ids: Vec<u32>,
    /// First-appearance row of each group, in group-id order
    pub group_order: Vec<u64>,
}

impl GroupMap {
    pub fn n_groups(&self) -> usize {
        self.group_order.len()
    }

    /// First-appearance rows as take indices, for gathering canonical keys
    pub fn first_row_indices(&self) -> Vec<i64> {
        self.group_order.iter().map(|&row| row as i64).collect()
    }
}

/// Build the group map for one or more key columns
pub fn group_by(keys: &[Series]) -> FacetResult<GroupMap> {
    let [first, rest @ ..] = keys else {
        return Err(FacetError::Value(
            "group_by requires at least one key column".to_string(),
        ));
    };
    for key in rest {
        if key.len() != first.len() {
            return Err(FacetError::Shape(format!(
                "group_by key \"{}\" has length {}, expected {}",
                key.name(),
                key.len(),
                first.len()
            )));
        }
    }
    if rest.is_empty() {
        group_single(first)
    } else {
        group_multi(keys)
    }
}

/// Single-key dispatch: fixed-width keys group over canonical bits, byte
/// keys over fingerprints
pub fn group_single(key: &Series) -> FacetResult<GroupMap> {
    match key.to_key_column()? {
        KeyColumn::Fixed { bits, validity } => group_fixed(&bits, validity.as_deref()),
        KeyColumn::Bytes(column) => group_bytes(&column),
    }
}

// ---------------------------------------------------------------------------
// Fixed-width single key

struct FixedPartial {
    /// Local group id → key (None = null group)
    keys: Vec<Option<u64>>,
    /// Local group id → absolute first row
    first_rows: Vec<u64>,
    /// Local group id per row of the partition
    local_ids: Vec<u32>,
}

fn group_fixed_partial(bits: &[u64], validity: Option<&[bool]>, start: usize, end: usize) -> FixedPartial {
    let mut map: AHashMap<u64, u32> = AHashMap::with_capacity(64);
    let mut null_group: Option<u32> = None;
    let mut keys = Vec::new();
    let mut first_rows = Vec::new();
    let mut local_ids = Vec::with_capacity(end - start);

    for row in start..end {
        let valid = validity.is_none_or(|v| v[row]);
        let id = if !valid {
            *null_group.get_or_insert_with(|| {
                keys.push(None);
                first_rows.push(row as u64);
                (keys.len() - 1) as u32
            })
        } else {
            match map.entry(bits[row]) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    let id = keys.len() as u32;
                    keys.push(Some(bits[row]));
                    first_rows.push(row as u64);
                    entry.insert(id);
                    id
                }
            }
        };
        local_ids.push(id);
    }

    FixedPartial {
        keys,
        first_rows,
        local_ids,
    }
}

fn group_fixed(bits: &[u64], validity: Option<&[bool]>) -> FacetResult<GroupMap> {
    let n = bits.len();
    if !should_parallel(n) {
        let partial = group_fixed_partial(bits, validity, 0, n);
        return Ok(GroupMap {
            row_group_ids: partial.local_ids,
            group_order: partial.first_rows,
        });
    }

    let partials = parallel_for(n, |start, end| {
        Ok(group_fixed_partial(bits, validity, start, end))
    })?;
    Ok(merge_fixed_partials(&partials))
}

/// Merge partition-local group maps: one global group per distinct key,
/// ordered by the minimum first row across partitions
fn merge_fixed_partials(partials: &[FixedPartial]) -> GroupMap {
    let mut slot_of_key: AHashMap<Option<u64>, usize> = AHashMap::new();
    // slot → min first row
    let mut min_firsts: Vec<u64> = Vec::new();
    let mut slot_of_local: Vec<Vec<u32>> = Vec::with_capacity(partials.len());

    for partial in partials {
        let mut local_slots = Vec::with_capacity(partial.keys.len());
        for (key, &first) in partial.keys.iter().zip(&partial.first_rows) {
            let slot = match slot_of_key.entry(*key) {
                Entry::Occupied(entry) => {
                    let slot = *entry.get();
                    min_firsts[slot] = min_firsts[slot].min(first);
                    slot
                }
                Entry::Vacant(entry) => {
                    let slot = min_firsts.len();
                    min_firsts.push(first);
                    entry.insert(slot);
                    slot
                }
            };
            local_slots.push(slot as u32);
        }
        slot_of_local.push(local_slots);
    }

    finish_merge(
        min_firsts,
        &slot_of_local,
        partials.iter().map(|p| p.local_ids.as_slice()),
    )
}

// ---------------------------------------------------------------------------
// Byte-valued single key

fn group_bytes(column: &StringChunked) -> FacetResult<GroupMap> {
    let n = column.len();
    if !should_parallel(n) {
        let partial = group_bytes_partial(column, 0, n);
        return Ok(GroupMap {
            row_group_ids: partial.local_ids,
            group_order: partial.first_rows,
        });
    }

    let partials = parallel_for(n, |start, end| Ok(group_bytes_partial(column, start, end)))?;
    Ok(merge_bytes_partials(column, &partials))
}

struct BytesPartial {
    /// Local group id → (fingerprint, absolute first row); None fingerprint
    /// marks the null group
    fingerprints: Vec<Option<u64>>,
    first_rows: Vec<u64>,
    local_ids: Vec<u32>,
}

fn group_bytes_partial(column: &StringChunked, start: usize, end: usize) -> BytesPartial {
    let mut map: AHashMap<u64, Vec<u32>> = AHashMap::with_capacity(64);
    let mut null_group: Option<u32> = None;
    let mut fingerprints = Vec::new();
    let mut first_rows = Vec::new();
    let mut local_ids = Vec::with_capacity(end - start);

    for row in start..end {
        let id = match column.get(row) {
            None => *null_group.get_or_insert_with(|| {
                fingerprints.push(None);
                first_rows.push(row as u64);
                (fingerprints.len() - 1) as u32
            }),
            Some(bytes) => {
                let fp = hash_bytes(bytes);
                let candidates = map.entry(fp).or_default();
                let found = candidates
                    .iter()
                    .copied()
                    .find(|&g| column.get(first_rows[g as usize] as usize) == Some(bytes));
                match found {
                    Some(id) => id,
                    None => {
                        let id = fingerprints.len() as u32;
                        fingerprints.push(Some(fp));
                        first_rows.push(row as u64);
                        candidates.push(id);
                        id
                    }
                }
            }
        };
        local_ids.push(id);
    }

    BytesPartial {
        fingerprints,
        first_rows,
        local_ids,
    }
}

fn merge_bytes_partials(column: &StringChunked, partials: &[BytesPartial]) -> GroupMap {
    // Global slot per distinct key; equality on bytes via representative rows.
    let mut by_fingerprint: AHashMap<u64, Vec<usize>> = AHashMap::new();
    let mut null_slot: Option<usize> = None;
    // slot → (representative row, min first row)
    let mut merged: Vec<(u64, u64)> = Vec::new();
    let mut slot_of_local: Vec<Vec<u32>> = Vec::with_capacity(partials.len());

    for partial in partials {
        let mut local_slots = Vec::with_capacity(partial.fingerprints.len());
        for (fp, &first) in partial.fingerprints.iter().zip(&partial.first_rows) {
            let slot = match fp {
                None => match null_slot {
                    Some(slot) => {
                        merged[slot].1 = merged[slot].1.min(first);
                        slot
                    }
                    None => {
                        let slot = merged.len();
                        merged.push((first, first));
                        null_slot = Some(slot);
                        slot
                    }
                },
                Some(fp) => {
                    let rep_bytes = column.get(first as usize);
                    let candidates = by_fingerprint.entry(*fp).or_default();
                    let found = candidates
                        .iter()
                        .copied()
                        .find(|&slot| column.get(merged[slot].0 as usize) == rep_bytes);
                    match found {
                        Some(slot) => {
                            merged[slot].1 = merged[slot].1.min(first);
                            slot
                        }
                        None => {
                            let slot = merged.len();
                            merged.push((first, first));
                            candidates.push(slot);
                            slot
                        }
                    }
                }
            };
            local_slots.push(slot as u32);
        }
        slot_of_local.push(local_slots);
    }

    finish_merge(
        merged.iter().map(|&(_, min_first)| min_first).collect(),
        &slot_of_local,
        partials.iter().map(|p| p.local_ids.as_slice()),
    )
}

// ---------------------------------------------------------------------------
// Multi-key

/// Multi-key path: per-row composite hash with encoded tie-break keys
pub fn group_multi(keys: &[Series]) -> FacetResult<GroupMap> {
    let columns: Vec<KeyColumn> = keys
        .iter()
        .map(|k| k.to_key_column())
        .collect::<FacetResult<_>>()?;
    let tags: Vec<u8> = keys.iter().map(|k| k.key_tag()).collect();
    let n = keys[0].len();

    if !should_parallel(n) {
        let partial = group_multi_partial(&columns, &tags, 0, n);
        return Ok(GroupMap {
            row_group_ids: partial.local_ids,
            group_order: partial.first_rows,
        });
    }

    let partials = parallel_for(n, |start, end| {
        Ok(group_multi_partial(&columns, &tags, start, end))
    })?;
    Ok(merge_multi_partials(&partials))
}

struct MultiPartial {
    /// Local group id → (composite hash, encoded key, absolute first row)
    composites: Vec<u64>,
    encoded: Vec<Vec<u8>>,
    first_rows: Vec<u64>,
    local_ids: Vec<u32>,
}

/// Fold the per-field hashes of one row into a composite key hash
fn composite_of(columns: &[KeyColumn], tags: &[u8], row: usize) -> u64 {
    let mut h = crate::execution::hash::COMPOSITE_SEED;
    for (column, &tag) in columns.iter().zip(tags) {
        let field = match column {
            KeyColumn::Fixed { bits, validity } => {
                if validity.as_ref().is_none_or(|v| v[row]) {
                    hash_u64(bits[row])
                } else {
                    null_field_hash(tag)
                }
            }
            KeyColumn::Bytes(col) => match col.get(row) {
                Some(bytes) => hash_bytes(bytes),
                None => null_field_hash(tag),
            },
        };
        h = combine_hash(h, field);
    }
    h
}

/// Append the unambiguous encoding of one row's key tuple: each field is
/// prefixed with its type tag and a validity byte; byte fields carry a
/// length prefix.
fn encode_row(columns: &[KeyColumn], tags: &[u8], row: usize, buf: &mut Vec<u8>) {
    buf.clear();
    for (column, &tag) in columns.iter().zip(tags) {
        buf.push(tag);
        match column {
            KeyColumn::Fixed { bits, validity } => {
                if validity.as_ref().is_none_or(|v| v[row]) {
                    buf.push(1);
                    buf.extend_from_slice(&bits[row].to_le_bytes());
                } else {
                    buf.push(0);
                }
            }
            KeyColumn::Bytes(col) => match col.get(row) {
                Some(bytes) => {
                    buf.push(1);
                    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                    buf.extend_from_slice(bytes);
                }
                None => buf.push(0),
            },
        }
    }
}

fn group_multi_partial(
    columns: &[KeyColumn],
    tags: &[u8],
    start: usize,
    end: usize,
) -> MultiPartial {
    let mut map: AHashMap<u64, Vec<u32>> = AHashMap::with_capacity(64);
    let mut composites = Vec::new();
    let mut encoded: Vec<Vec<u8>> = Vec::new();
    let mut first_rows = Vec::new();
    let mut local_ids = Vec::with_capacity(end - start);
    let mut scratch = Vec::new();

    for row in start..end {
        let composite = composite_of(columns, tags, row);
        encode_row(columns, tags, row, &mut scratch);
        let candidates = map.entry(composite).or_default();
        let found = candidates
            .iter()
            .copied()
            .find(|&g| encoded[g as usize] == scratch);
        let id = match found {
            Some(id) => id,
            None => {
                let id = composites.len() as u32;
                composites.push(composite);
                encoded.push(scratch.clone());
                first_rows.push(row as u64);
                candidates.push(id);
                id
            }
        };
        local_ids.push(id);
    }

    MultiPartial {
        composites,
        encoded,
        first_rows,
        local_ids,
    }
}

fn merge_multi_partials(partials: &[MultiPartial]) -> GroupMap {
    let mut by_composite: AHashMap<u64, Vec<usize>> = AHashMap::new();
    // slot → (encoded key, min first row)
    let mut merged: Vec<(Vec<u8>, u64)> = Vec::new();
    let mut slot_of_local: Vec<Vec<u32>> = Vec::with_capacity(partials.len());

    for partial in partials {
        let mut local_slots = Vec::with_capacity(partial.composites.len());
        for ((composite, encoded), &first) in partial
            .composites
            .iter()
            .zip(&partial.encoded)
            .zip(&partial.first_rows)
        {
            let candidates = by_composite.entry(*composite).or_default();
            let found = candidates
                .iter()
                .copied()
                .find(|&slot| merged[slot].0 == *encoded);
            let slot = match found {
                Some(slot) => {
                    merged[slot].1 = merged[slot].1.min(first);
                    slot
                }
                None => {
                    let slot = merged.len();
                    merged.push((encoded.clone(), first));
                    candidates.push(slot);
                    slot
                }
            };
            local_slots.push(slot as u32);
        }
        slot_of_local.push(local_slots);
    }

    finish_merge(
        merged.iter().map(|(_, min_first)| *min_first).collect(),
        &slot_of_local,
        partials.iter().map(|p| p.local_ids.as_slice()),
    )
}

// ---------------------------------------------------------------------------
// Shared merge tail

/// Order merged slots by minimum first row, then remap and concatenate the
/// per-partition row ids
fn finish_merge<'a>(
    min_firsts: Vec<u64>,
    slot_of_local: &[Vec<u32>],
    partial_local_ids: impl Iterator<Item = &'a [u32]>,
) -> GroupMap {
    let mut order: Vec<usize> = (0..min_firsts.len()).collect();
    order.sort_by_key(|&slot| min_firsts[slot]);

    let mut final_of_slot = vec![0u32; min_firsts.len()];
    for (final_id, &slot) in order.iter().enumerate() {
        final_of_slot[slot] = final_id as u32;
    }
    let group_order: Vec<u64> = order.iter().map(|&slot| min_firsts[slot]).collect();

    let mut row_group_ids = Vec::new();
    for (local_ids, local_slots) in partial_local_ids.zip(slot_of_local) {
        row_group_ids.extend(
            local_ids
                .iter()
                .map(|&local| final_of_slot[local_slots[local as usize] as usize]),
        );
    }

    GroupMap {
        row_group_ids,
        group_order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(map: &GroupMap, n_rows: usize) {
        assert_eq!(map.row_group_ids.len(), n_rows);
        let n_groups = map.n_groups() as u32;
        assert!(map.row_group_ids.iter().all(|&id| id < n_groups));
        // group_order must be strictly increasing first-appearance rows.
        assert!(map.group_order.windows(2).all(|w| w[0] < w[1]));
        for (group, &first) in map.group_order.iter().enumerate() {
            assert_eq!(map.row_group_ids[first as usize] as usize, group);
        }
    }

    #[test]
    fn test_single_int_key_first_appearance_order() {
        let key = Series::new("k", &[5i64, 3, 5, 7, 3]);
        let map = group_by(std::slice::from_ref(&key)).unwrap();
        assert_eq!(map.n_groups(), 3);
        assert_eq!(map.row_group_ids, vec![0, 1, 0, 2, 1]);
        assert_eq!(map.group_order, vec![0, 1, 3]);
        assert_invariants(&map, 5);
    }

    #[test]
    fn test_null_key_forms_own_group() {
        let key = Series::new("k", &[Some(1i64), None, Some(1), None]);
        let map = group_by(std::slice::from_ref(&key)).unwrap();
        assert_eq!(map.n_groups(), 2);
        assert_eq!(map.row_group_ids, vec![0, 1, 0, 1]);
        assert_invariants(&map, 4);
    }

    #[test]
    fn test_float_key_normalization() {
        let key = Series::new("f", &[0.0f64, -0.0, f64::NAN, f64::NAN, 1.0]);
        let map = group_by(std::slice::from_ref(&key)).unwrap();
        // +0.0 and -0.0 group together; all NaNs group together.
        assert_eq!(map.n_groups(), 3);
        assert_eq!(map.row_group_ids, vec![0, 0, 1, 1, 2]);
        assert_invariants(&map, 5);
    }

    #[test]
    fn test_string_keys() {
        let key = Series::new("s", &[Some("a"), Some("b"), None, Some("a"), Some("b")]);
        let map = group_by(std::slice::from_ref(&key)).unwrap();
        assert_eq!(map.n_groups(), 3);
        assert_eq!(map.row_group_ids, vec![0, 1, 2, 0, 1]);
        assert_invariants(&map, 5);
    }

    #[test]
    fn test_bool_keys() {
        let key = Series::new("b", &[true, false, true]);
        let map = group_by(std::slice::from_ref(&key)).unwrap();
        assert_eq!(map.n_groups(), 2);
        assert_eq!(map.row_group_ids, vec![0, 1, 0]);
    }

    #[test]
    fn test_multi_key_with_nulls() {
        let k1 = Series::new("k1", &[Some(1i64), Some(1), Some(1), None]);
        let k2 = Series::new("k2", &[Some("x"), None, Some("x"), Some("x")]);
        let map = group_by(&[k1, k2]).unwrap();
        // (1, "x"), (1, null), (null, "x") in first-appearance order.
        assert_eq!(map.n_groups(), 3);
        assert_eq!(map.row_group_ids, vec![0, 1, 0, 2]);
        assert_eq!(map.group_order, vec![0, 1, 3]);
        assert_invariants(&map, 4);
    }

    #[test]
    fn test_multi_key_no_cross_field_ambiguity() {
        // ("ab", "c") must not collide with ("a", "bc").
        let k1 = Series::new("k1", &["ab", "a"]);
        let k2 = Series::new("k2", &["c", "bc"]);
        let map = group_by(&[k1, k2]).unwrap();
        assert_eq!(map.n_groups(), 2);
    }

    #[test]
    fn test_large_input_exercises_merge() {
        // Enough rows to trip the parallel partitioned build on most
        // machines; the result must match the sequential definition.
        let n = 300_000usize;
        let values: Vec<i64> = (0..n).map(|i| (i % 13) as i64).collect();
        let key = Series::new("k", values.as_slice());
        let map = group_by(std::slice::from_ref(&key)).unwrap();
        assert_eq!(map.n_groups(), 13);
        for (row, &id) in map.row_group_ids.iter().enumerate() {
            assert_eq!(id as usize, row % 13);
        }
        assert_eq!(
            map.group_order,
            (0..13).map(|i| i as u64).collect::<Vec<_>>()
        );
        assert_invariants(&map, n);
    }

    #[test]
    fn test_mismatched_key_lengths() {
        let k1 = Series::new("k1", &[1i64, 2]);
        let k2 = Series::new("k2", &[1i64]);
        assert!(group_by(&[k1, k2]).is_err());
    }
}
