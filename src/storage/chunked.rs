//! Chunked columns
//!
//! A chunked column is an ordered list of chunks presenting one logical
//! sequence. Length and null count are cached; element lookup binary
//! searches the chunk boundaries. Appending requires exclusive access;
//! published columns are immutable and safe for concurrent readers.

use crate::storage::bitmap::ValidityMask;
use crate::storage::chunk::{NativeType, PrimitiveChunk, StringChunk};

/// A chunked column of fixed-width values
#[derive(Debug, Clone)]
pub struct ChunkedColumn<T: NativeType> {
    chunks: Vec<PrimitiveChunk<T>>,
    /// Logical start row of each chunk, ending with the total length
    starts: Vec<usize>,
    null_count: usize,
}

impl<T: NativeType> Default for ChunkedColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NativeType> ChunkedColumn<T> {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            starts: vec![0],
            null_count: 0,
        }
    }

    /// Build a single-chunk column by copying contiguous input
    pub fn from_slice(values: &[T], validity: Option<&[bool]>) -> Self {
        let mut column = Self::new();
        column.append_slice(values, validity);
        column
    }

    /// Build a single-chunk column taking ownership of the buffer
    pub fn from_vec(values: Vec<T>, validity: Option<ValidityMask>) -> Self {
        let mut column = Self::new();
        column.append_chunk(PrimitiveChunk::from_vec(values, validity));
        column
    }

    /// Build from optional values
    pub fn from_options(values: &[Option<T>]) -> Self
    where
        T: Default,
    {
        let dense: Vec<T> = values.iter().map(|v| v.unwrap_or_default()).collect();
        let validity: Vec<bool> = values.iter().map(Option::is_some).collect();
        if validity.iter().all(|&v| v) {
            Self::from_slice(&dense, None)
        } else {
            Self::from_slice(&dense, Some(&validity))
        }
    }

    /// Append one new chunk copied from contiguous input; a missing
    /// validity slice means all-valid.
    pub fn append_slice(&mut self, values: &[T], validity: Option<&[bool]>) {
        self.append_chunk(PrimitiveChunk::from_slice(values, validity));
    }

    /// Append an existing chunk, retaining its buffers
    pub fn append_chunk(&mut self, chunk: PrimitiveChunk<T>) {
        if chunk.is_empty() {
            return;
        }
        self.null_count += chunk.null_count();
        self.starts.push(self.len() + chunk.len());
        self.chunks.push(chunk);
    }

    #[inline]
    pub fn len(&self) -> usize {
        *self.starts.last().unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn chunks(&self) -> &[PrimitiveChunk<T>] {
        &self.chunks
    }

    /// Locate the chunk containing logical row `index`
    #[inline]
    fn chunk_of(&self, index: usize) -> (usize, usize) {
        debug_assert!(index < self.len());
        // partition_point finds the first start > index; its predecessor
        // is the owning chunk.
        let chunk = self.starts.partition_point(|&s| s <= index) - 1;
        (chunk, index - self.starts[chunk])
    }

    /// Value at `index`, None when null
    pub fn get(&self, index: usize) -> Option<T> {
        let (chunk, local) = self.chunk_of(index);
        let (value, valid) = self.chunks[chunk].get(local);
        valid.then_some(value)
    }

    pub fn is_valid(&self, index: usize) -> bool {
        let (chunk, local) = self.chunk_of(index);
        self.chunks[chunk].is_valid(local)
    }

    /// Zero-copy view over `[offset, offset + len)`, possibly spanning
    /// several chunks
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        debug_assert!(offset + len <= self.len());
        let mut result = Self::new();
        if len == 0 {
            return result;
        }
        let (first, local) = self.chunk_of(offset);
        let mut remaining = len;
        let mut start_in_chunk = local;
        for chunk in &self.chunks[first..] {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(chunk.len() - start_in_chunk);
            result.append_chunk(chunk.slice(start_in_chunk, take));
            remaining -= take;
            start_in_chunk = 0;
        }
        result
    }

    /// Materialize dense `(values, validity)` buffers, copying across
    /// chunk boundaries
    pub fn to_slice(&self) -> (Vec<T>, Vec<bool>) {
        let mut values = Vec::with_capacity(self.len());
        let mut validity = Vec::with_capacity(self.len());
        for chunk in &self.chunks {
            let (v, b) = chunk.to_dense();
            values.extend(v);
            validity.extend(b);
        }
        (values, validity)
    }

    /// Iterate values as options
    pub fn iter(&self) -> impl Iterator<Item = Option<T>> + '_ {
        self.chunks.iter().flat_map(|chunk| {
            (0..chunk.len()).map(move |i| {
                let (value, valid) = chunk.get(i);
                valid.then_some(value)
            })
        })
    }
}

/// A chunked column of variable-length byte values (String and Binary)
#[derive(Debug, Clone, Default)]
pub struct StringChunked {
    chunks: Vec<StringChunk>,
    starts: Vec<usize>,
    null_count: usize,
}

impl StringChunked {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            starts: vec![0],
            null_count: 0,
        }
    }

    /// Build a single-chunk column from string slices
    pub fn from_strs<'a, I>(values: I) -> Self
    where
        I: ExactSizeIterator<Item = Option<&'a str>>,
    {
        let mut column = Self::new();
        column.append_chunk(StringChunk::from_strs(values));
        column
    }

    /// Build a single-chunk column from byte slices
    pub fn from_bytes<'a, I>(values: I) -> Self
    where
        I: ExactSizeIterator<Item = Option<&'a [u8]>>,
    {
        let mut column = Self::new();
        column.append_chunk(StringChunk::from_bytes_iter(values));
        column
    }

    /// Append an existing chunk, retaining its buffers
    pub fn append_chunk(&mut self, chunk: StringChunk) {
        if chunk.is_empty() {
            return;
        }
        self.null_count += chunk.null_count();
        self.starts.push(self.len() + chunk.len());
        self.chunks.push(chunk);
    }

    #[inline]
    pub fn len(&self) -> usize {
        *self.starts.last().unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    #[inline]
    fn chunk_of(&self, index: usize) -> (usize, usize) {
        debug_assert!(index < self.len());
        let chunk = self.starts.partition_point(|&s| s <= index) - 1;
        (chunk, index - self.starts[chunk])
    }

    /// Byte payload at `index`, None when null
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        let (chunk, local) = self.chunk_of(index);
        let (bytes, valid) = self.chunks[chunk].get(local);
        valid.then_some(bytes)
    }

    pub fn is_valid(&self, index: usize) -> bool {
        let (chunk, local) = self.chunk_of(index);
        self.chunks[chunk].is_valid(local)
    }

    /// Zero-copy view over `[offset, offset + len)`
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        debug_assert!(offset + len <= self.len());
        let mut result = Self::new();
        if len == 0 {
            return result;
        }
        let (first, local) = self.chunk_of(offset);
        let mut remaining = len;
        let mut start_in_chunk = local;
        for chunk in &self.chunks[first..] {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(chunk.len() - start_in_chunk);
            result.append_chunk(chunk.slice(start_in_chunk, take));
            remaining -= take;
            start_in_chunk = 0;
        }
        result
    }

    /// Iterate byte payloads as options
    pub fn iter(&self) -> impl Iterator<Item = Option<&[u8]>> + '_ {
        self.chunks.iter().flat_map(|chunk| {
            (0..chunk.len()).map(move |i| {
                let (bytes, valid) = chunk.get(i);
                valid.then_some(bytes)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_get_across_chunks() {
        let mut column = ChunkedColumn::<i64>::new();
        column.append_slice(&[1, 2, 3], None);
        column.append_slice(&[4, 5], Some(&[true, false]));

        assert_eq!(column.len(), 5);
        assert_eq!(column.null_count(), 1);
        assert_eq!(column.get(0), Some(1));
        assert_eq!(column.get(3), Some(4));
        assert_eq!(column.get(4), None);
        assert!(column.is_valid(3));
        assert!(!column.is_valid(4));
    }

    #[test]
    fn test_slice_spanning_chunks() {
        let mut column = ChunkedColumn::<i32>::new();
        column.append_slice(&[1, 2], None);
        column.append_slice(&[3, 4], None);
        column.append_slice(&[5, 6], None);

        let view = column.slice(1, 4);
        assert_eq!(view.len(), 4);
        let collected: Vec<_> = view.iter().map(|v| v.unwrap()).collect();
        assert_eq!(collected, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_to_slice_dense() {
        let mut column = ChunkedColumn::<f64>::new();
        column.append_slice(&[1.0, 2.0], Some(&[true, false]));
        column.append_slice(&[3.0], None);

        let (values, validity) = column.to_slice();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert_eq!(validity, vec![true, false, true]);
    }

    #[test]
    fn test_from_options() {
        let column = ChunkedColumn::from_options(&[Some(1i64), None, Some(3)]);
        assert_eq!(column.len(), 3);
        assert_eq!(column.null_count(), 1);
        assert_eq!(column.get(1), None);
    }

    #[test]
    fn test_string_chunked() {
        let mut column = StringChunked::from_strs([Some("a"), None].into_iter());
        column.append_chunk(StringChunk::from_strs([Some("bc")].into_iter()));

        assert_eq!(column.len(), 3);
        assert_eq!(column.null_count(), 1);
        assert_eq!(column.get(0), Some(&b"a"[..]));
        assert_eq!(column.get(1), None);
        assert_eq!(column.get(2), Some(&b"bc"[..]));

        let view = column.slice(1, 2);
        assert_eq!(view.get(0), None);
        assert_eq!(view.get(1), Some(&b"bc"[..]));
    }
}
