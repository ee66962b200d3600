//! Data-parallel runtime
//!
//! The engine's only concurrency primitive is range parallelism: split
//! `[0, n)` into contiguous ranges and run a kernel on each range inside a
//! fixed-size rayon pool. Plan evaluation is sequential across operators;
//! concurrency happens inside an operator. Workers run their range to
//! completion; there is no work stealing between ranges of one call and no
//! suspension points inside kernels.

use crate::common::config::runtime_config;
use crate::common::error::FacetResult;
use log::debug;
use std::sync::OnceLock;

/// Minimum rows per worker before a parallel kernel is preferred
const GRAIN_SIZE: usize = 2048;

static POOL: OnceLock<rayon::ThreadPool> = OnceLock::new();

fn pool() -> &'static rayon::ThreadPool {
    POOL.get_or_init(|| {
        let threads = runtime_config().max_threads;
        debug!("initializing worker pool with {} threads", threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("facet-worker-{}", i))
            .build()
            .expect("failed to build worker pool")
    })
}

/// Number of worker threads (`W`)
pub fn max_threads() -> usize {
    runtime_config().max_threads
}

/// Whether parallel primitives may run concurrently
pub fn parallel_enabled() -> bool {
    runtime_config().parallel_enabled
}

/// Grain policy: parallelism is worthwhile for `n` rows iff it is enabled
/// and `n ≥ 2048·W`. Callers below the threshold must run sequentially.
pub fn should_parallel(n: usize) -> bool {
    parallel_enabled() && n >= GRAIN_SIZE * max_threads()
}

/// Partition `[0, n)` into `min(2W, n)` contiguous ranges of
/// `⌈n / chunks⌉` rows
pub fn split_ranges(n: usize) -> Vec<(usize, usize)> {
    if n == 0 {
        return Vec::new();
    }
    let chunks = (2 * max_threads()).min(n);
    let chunk_size = n.div_ceil(chunks);
    (0..chunks)
        .map(|i| {
            let start = i * chunk_size;
            let end = ((i + 1) * chunk_size).min(n);
            (start, end)
        })
        .filter(|(start, end)| start < end)
        .collect()
}

/// Run `body(start, end)` over contiguous partitions of `[0, n)`,
/// returning per-range results in range order. The first error in range
/// order wins; sibling ranges run to completion.
///
/// When parallel execution is disabled the ranges run sequentially on the
/// calling thread, stopping at the first error.
pub fn parallel_for<R, F>(n: usize, body: F) -> FacetResult<Vec<R>>
where
    R: Send,
    F: Fn(usize, usize) -> FacetResult<R> + Send + Sync,
{
    let ranges = split_ranges(n);
    if !parallel_enabled() || ranges.len() <= 1 {
        let mut results = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            results.push(body(start, end)?);
        }
        return Ok(results);
    }

    let outputs: Vec<FacetResult<R>> = pool().install(|| {
        use rayon::prelude::*;
        ranges
            .par_iter()
            .map(|&(start, end)| body(start, end))
            .collect()
    });

    // Deterministic first-error-wins in range order.
    let mut results = Vec::with_capacity(outputs.len());
    for output in outputs {
        results.push(output?);
    }
    Ok(results)
}

/// Evaluate two closures concurrently, returning the first error in
/// argument order
pub fn join2<A, B, FA, FB>(fa: FA, fb: FB) -> FacetResult<(A, B)>
where
    A: Send,
    B: Send,
    FA: FnOnce() -> FacetResult<A> + Send,
    FB: FnOnce() -> FacetResult<B> + Send,
{
    if !parallel_enabled() {
        return Ok((fa()?, fb()?));
    }
    let (ra, rb) = pool().install(|| rayon::join(fa, fb));
    Ok((ra?, rb?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::FacetError;

    #[test]
    fn test_split_ranges_cover_input() {
        for n in [0usize, 1, 7, 1000, 100_001] {
            let ranges = split_ranges(n);
            let covered: usize = ranges.iter().map(|(s, e)| e - s).sum();
            assert_eq!(covered, n);
            // Contiguous and ordered.
            let mut expected_start = 0;
            for (start, end) in ranges {
                assert_eq!(start, expected_start);
                assert!(end > start);
                expected_start = end;
            }
        }
    }

    #[test]
    fn test_parallel_for_sums() {
        let results = parallel_for(10_000, |start, end| Ok((start..end).sum::<usize>())).unwrap();
        let total: usize = results.into_iter().sum();
        assert_eq!(total, (0..10_000).sum::<usize>());
    }

    #[test]
    fn test_parallel_for_first_error_wins() {
        let result: FacetResult<Vec<()>> = parallel_for(100_000, |start, _end| {
            if start > 0 {
                Err(FacetError::Value(format!("range {}", start)))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_join2() {
        let (a, b) = join2(|| Ok(2 + 2), || Ok("ok")).unwrap();
        assert_eq!(a, 4);
        assert_eq!(b, "ok");
    }
}
