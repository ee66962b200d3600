//! Index-gather kernels
//!
//! `take` gathers rows of a column by an index array into a dense new
//! column. Negative indices are the join sentinel and gather a null.
//! Large gathers split the index array into contiguous chunks across
//! workers; chunk outputs concatenate in chunk order.

use crate::common::error::{FacetError, FacetResult};
use crate::execution::parallel::{parallel_for, should_parallel};
use crate::storage::chunk::NativeType;
use crate::storage::{ChunkedColumn, StringChunk, StringChunked};

fn check_bounds(index: i64, len: usize) -> FacetResult<()> {
    if index >= len as i64 {
        return Err(FacetError::Shape(format!(
            "take index {} out of bounds for column of length {}",
            index, len
        )));
    }
    Ok(())
}

/// Gather `indices` from a fixed-width column. `-1` gathers null.
pub fn take_primitive<T: NativeType + Default>(
    column: &ChunkedColumn<T>,
    indices: &[i64],
) -> FacetResult<ChunkedColumn<T>> {
    let gather_range = |start: usize, end: usize| -> FacetResult<(Vec<T>, Vec<bool>, usize)> {
        let mut values = Vec::with_capacity(end - start);
        let mut validity = Vec::with_capacity(end - start);
        let mut nulls = 0usize;
        for &index in &indices[start..end] {
            check_bounds(index, column.len())?;
            let slot = if index < 0 {
                None
            } else {
                column.get(index as usize)
            };
            match slot {
                Some(value) => {
                    values.push(value);
                    validity.push(true);
                }
                None => {
                    values.push(T::default());
                    validity.push(false);
                    nulls += 1;
                }
            }
        }
        Ok((values, validity, nulls))
    };

    let parts = if should_parallel(indices.len()) {
        parallel_for(indices.len(), gather_range)?
    } else {
        vec![gather_range(0, indices.len())?]
    };

    let mut result = ChunkedColumn::new();
    for (values, validity, nulls) in parts {
        if nulls == 0 {
            result.append_slice(&values, None);
        } else {
            result.append_slice(&values, Some(&validity));
        }
    }
    Ok(result)
}

/// Gather `indices` from a byte-valued column. `-1` gathers null.
pub fn take_string(column: &StringChunked, indices: &[i64]) -> FacetResult<StringChunked> {
    let gather_range = |start: usize, end: usize| -> FacetResult<StringChunk> {
        for &index in &indices[start..end] {
            check_bounds(index, column.len())?;
        }
        let values = indices[start..end].iter().map(|&index| {
            if index < 0 {
                None
            } else {
                column.get(index as usize)
            }
        });
        Ok(StringChunk::from_bytes_iter(ExactSizeBytes {
            inner: values,
            remaining: end - start,
        }))
    };

    let parts = if should_parallel(indices.len()) {
        parallel_for(indices.len(), gather_range)?
    } else {
        vec![gather_range(0, indices.len())?]
    };

    let mut result = StringChunked::new();
    for chunk in parts {
        result.append_chunk(chunk);
    }
    Ok(result)
}

/// Adapter giving a mapped iterator an exact size for the chunk builder
struct ExactSizeBytes<I> {
    inner: I,
    remaining: usize,
}

impl<'a, I: Iterator<Item = Option<&'a [u8]>>> Iterator for ExactSizeBytes<I> {
    type Item = Option<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next();
        if item.is_some() {
            self.remaining -= 1;
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, I: Iterator<Item = Option<&'a [u8]>>> ExactSizeIterator for ExactSizeBytes<I> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_primitive_reorders() {
        let column = ChunkedColumn::from_slice(&[10i64, 20, 30], None);
        let taken = take_primitive(&column, &[2, 0, 1, 0]).unwrap();
        let values: Vec<_> = taken.iter().collect();
        assert_eq!(values, vec![Some(30), Some(10), Some(20), Some(10)]);
    }

    #[test]
    fn test_take_sentinel_inserts_null() {
        let column = ChunkedColumn::from_slice(&[1i32, 2], None);
        let taken = take_primitive(&column, &[-1, 1]).unwrap();
        assert_eq!(taken.get(0), None);
        assert_eq!(taken.get(1), Some(2));
        assert_eq!(taken.null_count(), 1);
    }

    #[test]
    fn test_take_propagates_source_nulls() {
        let column = ChunkedColumn::from_slice(&[1i64, 2], Some(&[false, true]));
        let taken = take_primitive(&column, &[0, 1]).unwrap();
        assert_eq!(taken.get(0), None);
        assert_eq!(taken.get(1), Some(2));
    }

    #[test]
    fn test_take_out_of_bounds() {
        let column = ChunkedColumn::from_slice(&[1i64], None);
        assert!(take_primitive(&column, &[3]).is_err());
    }

    #[test]
    fn test_take_string() {
        let column = StringChunked::from_strs([Some("a"), None, Some("c")].into_iter());
        let taken = take_string(&column, &[2, -1, 1, 0]).unwrap();
        assert_eq!(taken.get(0), Some(&b"c"[..]));
        assert_eq!(taken.get(1), None);
        assert_eq!(taken.get(2), None);
        assert_eq!(taken.get(3), Some(&b"a"[..]));
    }
}
