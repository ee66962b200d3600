//! Boolean-mask filter kernels
//!
//! The mask is a nullable boolean column; null mask entries drop the row,
//! the same as false.

use crate::common::error::{FacetError, FacetResult};
use crate::storage::chunk::NativeType;
use crate::storage::{ChunkedColumn, StringChunk, StringChunked};

fn check_len(mask_len: usize, column_len: usize) -> FacetResult<()> {
    if mask_len != column_len {
        return Err(FacetError::Shape(format!(
            "filter mask length {} does not match column length {}",
            mask_len, column_len
        )));
    }
    Ok(())
}

/// Keep the rows of a fixed-width column where the mask is true
pub fn filter_primitive<T: NativeType + Default>(
    column: &ChunkedColumn<T>,
    mask: &ChunkedColumn<bool>,
) -> FacetResult<ChunkedColumn<T>> {
    check_len(mask.len(), column.len())?;
    let mut values = Vec::new();
    let mut validity = Vec::new();
    let mut any_null = false;
    for (keep, value) in mask.iter().zip(column.iter()) {
        if matches!(keep, Some(true)) {
            match value {
                Some(v) => {
                    values.push(v);
                    validity.push(true);
                }
                None => {
                    values.push(T::default());
                    validity.push(false);
                    any_null = true;
                }
            }
        }
    }
    Ok(ChunkedColumn::from_slice(
        &values,
        any_null.then_some(validity.as_slice()),
    ))
}

/// Keep the rows of a byte-valued column where the mask is true
pub fn filter_string(
    column: &StringChunked,
    mask: &ChunkedColumn<bool>,
) -> FacetResult<StringChunked> {
    check_len(mask.len(), column.len())?;
    let kept: Vec<Option<&[u8]>> = mask
        .iter()
        .zip(column.iter())
        .filter(|(keep, _)| matches!(keep, Some(true)))
        .map(|(_, value)| value)
        .collect();
    let mut result = StringChunked::new();
    result.append_chunk(StringChunk::from_bytes_iter(kept.into_iter()));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_null_mask_drops_row() {
        let column = ChunkedColumn::from_slice(&[1i64, 2, 3], None);
        let mask = ChunkedColumn::from_slice(&[true, false, true], Some(&[true, true, false]));
        // Row 2's mask entry is null: treated as false.
        let filtered = filter_primitive(&column, &mask).unwrap();
        let values: Vec<_> = filtered.iter().collect();
        assert_eq!(values, vec![Some(1)]);
    }

    #[test]
    fn test_filter_keeps_value_nulls() {
        let column = ChunkedColumn::from_slice(&[1i64, 2], Some(&[false, true]));
        let mask = ChunkedColumn::from_slice(&[true, true], None);
        let filtered = filter_primitive(&column, &mask).unwrap();
        assert_eq!(filtered.get(0), None);
        assert_eq!(filtered.get(1), Some(2));
    }

    #[test]
    fn test_filter_length_mismatch() {
        let column = ChunkedColumn::from_slice(&[1i64], None);
        let mask = ChunkedColumn::from_slice(&[true, false], None);
        assert!(filter_primitive(&column, &mask).is_err());
    }

    #[test]
    fn test_filter_string() {
        let column = StringChunked::from_strs([Some("a"), Some("b"), None].into_iter());
        let mask = ChunkedColumn::from_slice(&[false, true, true], None);
        let filtered = filter_string(&column, &mask).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.get(0), Some(&b"b"[..]));
        assert_eq!(filtered.get(1), None);
    }
}
