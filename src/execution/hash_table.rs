//! Bucket-chained hash tables for joins
//!
//! A table is built once over the build side and then probed, possibly by
//! many threads at once. Buckets hold `u32` row indices into the build
//! side; the table owns its bucket storage and borrows nothing from the
//! input columns. Capacity is the next power of two at or above `2·n`, so
//! the load factor stays at or below 0.5 and no rehash is ever needed.
//!
//! Null build keys are never inserted and null probe keys never match, so
//! null never joins null.

use crate::common::error::FacetResult;
use crate::execution::hash::{batch_hash_u64, hash_bytes, hash_u64};
use crate::execution::parallel::{parallel_for, should_parallel};
use crate::storage::StringChunked;

/// Fixed-width key types the table specializes over
pub trait HashKey: Copy + PartialEq + Send + Sync + 'static {
    fn key_hash(self) -> u64;

    /// Hash a batch of keys. The default is the scalar loop; `u64`
    /// dispatches to the vectorized batch kernel.
    fn hash_batch(keys: &[Self], out: &mut [u64]) {
        for (slot, key) in out.iter_mut().zip(keys) {
            *slot = key.key_hash();
        }
    }
}

impl HashKey for u32 {
    #[inline(always)]
    fn key_hash(self) -> u64 {
        hash_u64(self as u64)
    }
}

impl HashKey for u64 {
    #[inline(always)]
    fn key_hash(self) -> u64 {
        hash_u64(self)
    }

    fn hash_batch(keys: &[Self], out: &mut [u64]) {
        batch_hash_u64(keys, out);
    }
}

impl HashKey for i32 {
    #[inline(always)]
    fn key_hash(self) -> u64 {
        hash_u64(self as u32 as u64)
    }
}

impl HashKey for i64 {
    #[inline(always)]
    fn key_hash(self) -> u64 {
        hash_u64(self as u64)
    }
}

/// Matched index pairs plus, for outer variants, `-1` sentinels on the
/// unmatched side
pub type JoinPairs = (Vec<i64>, Vec<i64>);

/// Bucket-chained table keyed by a fixed-width type
#[derive(Debug)]
pub struct FixedKeyTable<K: HashKey> {
    keys: Vec<K>,
    buckets: Vec<Vec<u32>>,
    mask: u64,
}

impl<K: HashKey> FixedKeyTable<K> {
    /// Single-shot build over the build side. Hashes are precomputed in
    /// one pass; null rows are skipped.
    pub fn build(keys: Vec<K>, validity: Option<Vec<bool>>) -> Self {
        let n = keys.len();
        let capacity = (2 * n).next_power_of_two().max(1);
        let mask = capacity as u64 - 1;

        let mut hashes = vec![0u64; n];
        K::hash_batch(&keys, &mut hashes);

        let mut buckets = vec![Vec::new(); capacity];
        for (row, &hash) in hashes.iter().enumerate() {
            if validity.as_ref().is_some_and(|v| !v[row]) {
                continue;
            }
            buckets[(hash & mask) as usize].push(row as u32);
        }

        Self {
            keys,
            buckets,
            mask,
        }
    }

    /// Build-side rows whose key equals `key`, in build order
    #[inline]
    pub fn candidates(&self, key: K) -> impl Iterator<Item = u32> + '_ {
        let bucket = &self.buckets[(key.key_hash() & self.mask) as usize];
        bucket
            .iter()
            .copied()
            .filter(move |&row| self.keys[row as usize] == key)
    }

    fn probe_range(
        &self,
        probe_keys: &[K],
        probe_validity: Option<&[bool]>,
        start: usize,
        end: usize,
        emit_unmatched: bool,
    ) -> JoinPairs {
        let mut build_idx = Vec::with_capacity(end - start);
        let mut probe_idx = Vec::with_capacity(end - start);
        for probe_row in start..end {
            let row_valid = probe_validity.is_none_or(|v| v[probe_row]);
            let mut matched = false;
            if row_valid {
                for build_row in self.candidates(probe_keys[probe_row]) {
                    build_idx.push(build_row as i64);
                    probe_idx.push(probe_row as i64);
                    matched = true;
                }
            }
            if !matched && emit_unmatched {
                build_idx.push(-1);
                probe_idx.push(probe_row as i64);
            }
        }
        (build_idx, probe_idx)
    }

    /// Probe every row of the probe side. Output pairs preserve probe
    /// order; candidate matches for one probe row come out in build order.
    /// With `emit_unmatched`, rows without a match (including null-keyed
    /// rows) emit a `-1` build sentinel.
    ///
    /// Large probes are partitioned across workers, each probing into a
    /// private buffer; buffers concatenate in partition order, so the
    /// result is identical to the sequential probe.
    pub fn probe(
        &self,
        probe_keys: &[K],
        probe_validity: Option<&[bool]>,
        emit_unmatched: bool,
    ) -> FacetResult<JoinPairs> {
        let n = probe_keys.len();
        if !should_parallel(n) {
            return Ok(self.probe_range(probe_keys, probe_validity, 0, n, emit_unmatched));
        }
        let parts = parallel_for(n, |start, end| {
            Ok(self.probe_range(probe_keys, probe_validity, start, end, emit_unmatched))
        })?;
        let total: usize = parts.iter().map(|(b, _)| b.len()).sum();
        let mut build_idx = Vec::with_capacity(total);
        let mut probe_idx = Vec::with_capacity(total);
        for (b, p) in parts {
            build_idx.extend(b);
            probe_idx.extend(p);
        }
        Ok((build_idx, probe_idx))
    }

    /// Per-probe-row match flags, for semi/anti joins
    pub fn probe_exists(
        &self,
        probe_keys: &[K],
        probe_validity: Option<&[bool]>,
    ) -> FacetResult<Vec<bool>> {
        let n = probe_keys.len();
        let exists_range = |start: usize, end: usize| -> FacetResult<Vec<bool>> {
            Ok((start..end)
                .map(|row| {
                    probe_validity.is_none_or(|v| v[row])
                        && self.candidates(probe_keys[row]).next().is_some()
                })
                .collect())
        };
        if !should_parallel(n) {
            return exists_range(0, n);
        }
        let parts = parallel_for(n, |start, end| exists_range(start, end))?;
        Ok(parts.into_iter().flatten().collect())
    }

}

/// Bucket-chained table keyed by byte strings.
///
/// Reuses the fixed-width scheme on 64-bit fingerprints; candidates are
/// re-checked against the actual bytes of the build column to reject
/// fingerprint collisions.
#[derive(Debug)]
pub struct BytesKeyTable {
    fingerprints: Vec<u64>,
    buckets: Vec<Vec<u32>>,
    mask: u64,
}

impl BytesKeyTable {
    /// Single-shot build over a byte-valued build column
    pub fn build(build: &StringChunked) -> Self {
        let n = build.len();
        let capacity = (2 * n).next_power_of_two().max(1);
        let mask = capacity as u64 - 1;

        let mut fingerprints = vec![0u64; n];
        let mut buckets = vec![Vec::new(); capacity];
        for (row, value) in build.iter().enumerate() {
            if let Some(bytes) = value {
                let fp = hash_bytes(bytes);
                fingerprints[row] = fp;
                buckets[(fp & mask) as usize].push(row as u32);
            }
        }

        Self {
            fingerprints,
            buckets,
            mask,
        }
    }

    /// Build-side rows whose bytes equal `key`, in build order
    #[inline]
    pub fn candidates<'a>(
        &'a self,
        key: &'a [u8],
        build: &'a StringChunked,
    ) -> impl Iterator<Item = u32> + 'a {
        let fp = hash_bytes(key);
        self.buckets[(fp & self.mask) as usize]
            .iter()
            .copied()
            .filter(move |&row| {
                self.fingerprints[row as usize] == fp
                    && build.get(row as usize) == Some(key)
            })
    }

    fn probe_range(
        &self,
        probe: &StringChunked,
        build: &StringChunked,
        start: usize,
        end: usize,
        emit_unmatched: bool,
    ) -> JoinPairs {
        let mut build_idx = Vec::with_capacity(end - start);
        let mut probe_idx = Vec::with_capacity(end - start);
        for probe_row in start..end {
            let mut matched = false;
            if let Some(key) = probe.get(probe_row) {
                for build_row in self.candidates(key, build) {
                    build_idx.push(build_row as i64);
                    probe_idx.push(probe_row as i64);
                    matched = true;
                }
            }
            if !matched && emit_unmatched {
                build_idx.push(-1);
                probe_idx.push(probe_row as i64);
            }
        }
        (build_idx, probe_idx)
    }

    /// Probe every row of the probe column; same contract as
    /// [`FixedKeyTable::probe`]
    pub fn probe(
        &self,
        probe: &StringChunked,
        build: &StringChunked,
        emit_unmatched: bool,
    ) -> FacetResult<JoinPairs> {
        let n = probe.len();
        if !should_parallel(n) {
            return Ok(self.probe_range(probe, build, 0, n, emit_unmatched));
        }
        let parts = parallel_for(n, |start, end| {
            Ok(self.probe_range(probe, build, start, end, emit_unmatched))
        })?;
        let total: usize = parts.iter().map(|(b, _)| b.len()).sum();
        let mut build_idx = Vec::with_capacity(total);
        let mut probe_idx = Vec::with_capacity(total);
        for (b, p) in parts {
            build_idx.extend(b);
            probe_idx.extend(p);
        }
        Ok((build_idx, probe_idx))
    }

    /// Per-probe-row match flags, for semi/anti joins
    pub fn probe_exists(
        &self,
        probe: &StringChunked,
        build: &StringChunked,
    ) -> FacetResult<Vec<bool>> {
        Ok((0..probe.len())
            .map(|row| match probe.get(row) {
                Some(key) => self.candidates(key, build).next().is_some(),
                None => false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_matches_equal_keys_only() {
        let table = FixedKeyTable::build(vec![1i64, 2, 2, 3], None);
        let (build_idx, probe_idx) = table.probe(&[2, 5, 1], None, false).unwrap();
        assert_eq!(probe_idx, vec![0, 0, 2]);
        assert_eq!(build_idx, vec![1, 2, 0]);
    }

    #[test]
    fn test_probe_emit_unmatched_sentinel() {
        let table = FixedKeyTable::build(vec![1i64, 3], None);
        let (build_idx, probe_idx) = table.probe(&[1, 2, 3], None, true).unwrap();
        assert_eq!(probe_idx, vec![0, 1, 2]);
        assert_eq!(build_idx, vec![0, -1, 1]);
    }

    #[test]
    fn test_null_keys_never_match() {
        let table = FixedKeyTable::build(vec![7i64, 7], Some(vec![true, false]));
        // Build row 1 is null: only row 0 can match.
        let (build_idx, _) = table.probe(&[7], None, false).unwrap();
        assert_eq!(build_idx, vec![0]);

        // A null probe key matches nothing, even against a null build key.
        let (build_idx, probe_idx) = table
            .probe(&[7, 7], Some(&[true, false]), true)
            .unwrap();
        assert_eq!(probe_idx, vec![0, 1]);
        assert_eq!(build_idx, vec![0, -1]);
    }

    #[test]
    fn test_probe_exists() {
        let table = FixedKeyTable::build(vec![1u32, 2], None);
        let exists = table.probe_exists(&[2, 9], None).unwrap();
        assert_eq!(exists, vec![true, false]);
    }

    #[test]
    fn test_probe_property_exhaustive() {
        // probe(k) must return exactly the valid build rows whose key is k.
        let keys: Vec<i64> = (0..500).map(|i| i % 17).collect();
        let validity: Vec<bool> = (0..500).map(|i| i % 5 != 0).collect();
        let table = FixedKeyTable::build(keys.clone(), Some(validity.clone()));

        for probe_key in 0..20i64 {
            let (build_idx, _) = table.probe(&[probe_key], None, false).unwrap();
            let expected: Vec<i64> = keys
                .iter()
                .enumerate()
                .filter(|&(i, &k)| validity[i] && k == probe_key)
                .map(|(i, _)| i as i64)
                .collect();
            assert_eq!(build_idx, expected);
        }
    }

    #[test]
    fn test_bytes_table_fingerprint_recheck() {
        let build = StringChunked::from_strs(
            [Some("alpha"), Some("beta"), None, Some("alpha")].into_iter(),
        );
        let table = BytesKeyTable::build(&build);

        let probe = StringChunked::from_strs([Some("alpha"), Some("gamma"), None].into_iter());
        let (build_idx, probe_idx) = table.probe(&probe, &build, true).unwrap();
        assert_eq!(probe_idx, vec![0, 0, 1, 2]);
        assert_eq!(build_idx, vec![0, 3, -1, -1]);
    }
}
