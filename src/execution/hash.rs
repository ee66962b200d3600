//! Hash kernels
//!
//! Multiply-mix hashing in the wyhash family: two 64-bit operands are
//! xor-folded with fixed constants, multiplied into a 128-bit product, and
//! the halves are folded together. All grouping and join hashing routes
//! through these kernels; map containers elsewhere use their own hasher.
//!
//! Float keys are canonicalized before hashing: `-0.0` becomes `+0.0` and
//! every NaN bit pattern becomes the quiet NaN `0x7ff8_0000_0000_0000`, so
//! all NaNs hash (and therefore group and join) identically.

const P0: u64 = 0xa076_1d64_78bd_642f;
const P1: u64 = 0xe703_7ed1_a0b4_28db;
const P2: u64 = 0x8ebc_6af0_9c88_c6e3;
const P3: u64 = 0x5899_65cc_7537_4cc3;

/// Canonical quiet-NaN bit pattern used for all NaN keys
pub const CANONICAL_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

/// Seed of composite (multi-field) key hashing
pub const COMPOSITE_SEED: u64 = P3;

/// Fold a 128-bit product of the xor-salted operands back to 64 bits
#[inline(always)]
fn mix(a: u64, b: u64) -> u64 {
    let product = (a ^ P0) as u128 * (b ^ P1) as u128;
    (product >> 64) as u64 ^ product as u64
}

/// Hash one 64-bit value
#[inline(always)]
pub fn hash_u64(value: u64) -> u64 {
    mix(value, P2)
}

/// Canonical bit pattern of an f64 key: `-0.0` → `+0.0`, any NaN → quiet NaN
#[inline(always)]
pub fn canonical_f64_bits(value: f64) -> u64 {
    if value.is_nan() {
        CANONICAL_NAN_BITS
    } else if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

/// Canonical bit pattern of an f32 key, widened to 64 bits
#[inline(always)]
pub fn canonical_f32_bits(value: f32) -> u64 {
    canonical_f64_bits(value as f64)
}

/// Hash one f64 value with canonicalized zero and NaN
#[inline(always)]
pub fn hash_f64(value: f64) -> u64 {
    hash_u64(canonical_f64_bits(value))
}

/// Hash a byte string, 8 bytes at a time; the final partial word is
/// zero-padded. The length participates so prefixes do not collide with
/// their extensions.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut h = mix(bytes.len() as u64, P2);
    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let word = u64::from_le_bytes(chunk.try_into().unwrap());
        h = mix(h, word);
    }
    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut word_bytes = [0u8; 8];
        word_bytes[..tail.len()].copy_from_slice(tail);
        h = mix(h, u64::from_le_bytes(word_bytes));
    }
    h
}

/// Fold per-field hashes into one composite key hash, seeded with `P3`
pub fn hash_composite(field_hashes: &[u64]) -> u64 {
    field_hashes
        .iter()
        .fold(COMPOSITE_SEED, |h, &field| mix(h, field))
}

/// One folding step for incremental composite hashing
#[inline(always)]
pub fn combine_hash(h: u64, field: u64) -> u64 {
    mix(h, field)
}

/// Hash a batch of 64-bit values: `out[i] = hash_u64(in[i])`.
///
/// Dispatches to a vectorized variant when the platform supports it; the
/// scalar loop is the reference and both produce identical output.
pub fn batch_hash_u64(input: &[u64], out: &mut [u64]) {
    debug_assert_eq!(input.len(), out.len());
    #[cfg(target_arch = "x86_64")]
    {
        if has_simd() {
            // Safety: dispatch is gated on runtime AVX2 detection.
            unsafe { batch_hash_u64_avx2(input, out) };
            return;
        }
    }
    batch_hash_u64_scalar(input, out);
}

fn batch_hash_u64_scalar(input: &[u64], out: &mut [u64]) {
    for (slot, &value) in out.iter_mut().zip(input) {
        *slot = hash_u64(value);
    }
}

/// Four `mix(v, P2)` lanes per iteration under AVX2.
///
/// AVX2 has no 64×64→128 multiply, so each lane's 128-bit product is
/// assembled from the four 32×32→64 partial products
/// (`_mm256_mul_epu32`) with the usual carry fold: with
/// `x = xh·2³² + xl` and `y = yh·2³² + yl`,
/// `t = (xl·yl ≫ 32) + lo32(xl·yh) + lo32(xh·yl)` carries into the high
/// half, `lo = lo32(xl·yl) | (t ≪ 32)` and
/// `hi = xh·yh + (xl·yh ≫ 32) + (xh·yl ≫ 32) + (t ≫ 32)`. The xor of the
/// halves is bit-identical to the scalar reference. The tail shorter
/// than one register runs scalar.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn batch_hash_u64_avx2(input: &[u64], out: &mut [u64]) {
    use std::arch::x86_64::*;

    let salt_a = _mm256_set1_epi64x(P0 as i64);
    // hash_u64 fixes the second mix operand at P2, so y = P2 ^ P1 is a
    // constant vector.
    let y = _mm256_set1_epi64x((P2 ^ P1) as i64);
    let yh = _mm256_srli_epi64(y, 32);
    let mask32 = _mm256_set1_epi64x(0xffff_ffff);

    let lanes = input.len() / 4 * 4;
    let mut i = 0;
    while i < lanes {
        let v = _mm256_loadu_si256(input.as_ptr().add(i) as *const __m256i);
        let x = _mm256_xor_si256(v, salt_a);
        let xh = _mm256_srli_epi64(x, 32);

        // mul_epu32 reads the low 32 bits of each 64-bit lane.
        let ll = _mm256_mul_epu32(x, y);
        let lh = _mm256_mul_epu32(x, yh);
        let hl = _mm256_mul_epu32(xh, y);
        let hh = _mm256_mul_epu32(xh, yh);

        let t = _mm256_add_epi64(
            _mm256_add_epi64(_mm256_srli_epi64(ll, 32), _mm256_and_si256(lh, mask32)),
            _mm256_and_si256(hl, mask32),
        );
        let lo = _mm256_or_si256(_mm256_and_si256(ll, mask32), _mm256_slli_epi64(t, 32));
        let hi = _mm256_add_epi64(
            _mm256_add_epi64(hh, _mm256_srli_epi64(t, 32)),
            _mm256_add_epi64(_mm256_srli_epi64(lh, 32), _mm256_srli_epi64(hl, 32)),
        );

        let mixed = _mm256_xor_si256(hi, lo);
        _mm256_storeu_si256(out.as_mut_ptr().add(i) as *mut __m256i, mixed);
        i += 4;
    }
    for row in lanes..input.len() {
        out[row] = hash_u64(input[row]);
    }
}

/// Whether a vectorized batch-hash path is available on this machine
pub fn has_simd() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::arch::is_x86_feature_detected!("avx2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_u64_stable() {
        // Distinct inputs hash apart; equal inputs hash together.
        assert_eq!(hash_u64(42), hash_u64(42));
        assert_ne!(hash_u64(42), hash_u64(43));
        assert_ne!(hash_u64(0), hash_u64(u64::MAX));
    }

    #[test]
    fn test_hash_f64_zero_and_nan() {
        assert_eq!(hash_f64(0.0), hash_f64(-0.0));
        assert_eq!(hash_f64(f64::NAN), hash_f64(-f64::NAN));
        assert_eq!(
            hash_f64(f64::from_bits(0x7ff8_0000_0000_0001)),
            hash_f64(f64::NAN)
        );
        assert_ne!(hash_f64(1.0), hash_f64(2.0));
    }

    #[test]
    fn test_hash_bytes_prefix_free() {
        assert_eq!(hash_bytes(b"hello"), hash_bytes(b"hello"));
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"hello\0"));
        assert_ne!(hash_bytes(b""), hash_bytes(b"\0"));
        assert_ne!(hash_bytes(b"abcdefgh"), hash_bytes(b"abcdefg"));
    }

    #[test]
    fn test_hash_composite_order_sensitive() {
        let a = hash_u64(1);
        let b = hash_u64(2);
        assert_ne!(hash_composite(&[a, b]), hash_composite(&[b, a]));
        assert_eq!(hash_composite(&[a, b]), hash_composite(&[a, b]));
    }

    #[test]
    fn test_batch_matches_scalar() {
        let input: Vec<u64> = (0..1027).map(|i| i * 2654435761).collect();
        let mut batched = vec![0u64; input.len()];
        batch_hash_u64(&input, &mut batched);
        for (i, &value) in input.iter().enumerate() {
            assert_eq!(batched[i], hash_u64(value));
        }
    }
}
