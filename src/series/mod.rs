//! Series: a named, type-erased column
//!
//! A `Series` wraps one typed chunked column behind a closed enum and
//! presents the uniform operations the frame layer needs: length, null
//! predicates, element get, slicing, take, filter, cast, sort, equality
//! and aggregation. Kernels re-enter the typed world with a single match
//! on the payload tag.

pub mod aggregate;
pub mod cast;

use crate::common::error::{FacetError, FacetResult};
use crate::execution::filter::{filter_primitive, filter_string};
use crate::execution::hash::{canonical_f32_bits, canonical_f64_bits};
use crate::execution::take::{take_primitive, take_string};
use crate::storage::{ChunkedColumn, StringChunked};
use crate::types::{AnyValue, DataType};
use std::fmt;

/// Typed payload of a series
#[derive(Debug, Clone)]
pub enum SeriesData {
    Boolean(ChunkedColumn<bool>),
    Int8(ChunkedColumn<i8>),
    Int16(ChunkedColumn<i16>),
    Int32(ChunkedColumn<i32>),
    Int64(ChunkedColumn<i64>),
    UInt8(ChunkedColumn<u8>),
    UInt16(ChunkedColumn<u16>),
    UInt32(ChunkedColumn<u32>),
    UInt64(ChunkedColumn<u64>),
    Float32(ChunkedColumn<f32>),
    Float64(ChunkedColumn<f64>),
    String(StringChunked),
    Binary(StringChunked),
    /// Days since epoch
    Date(ChunkedColumn<i32>),
    /// Nanoseconds since midnight
    Time(ChunkedColumn<i64>),
    /// Microseconds since epoch
    Datetime(ChunkedColumn<i64>),
    /// Microseconds
    Duration(ChunkedColumn<i64>),
    /// Per-row lists of values; produced by top-k aggregation
    List(ListColumn),
    /// All-null column of the given length
    Null(usize),
}

/// A column whose cells are small value lists
#[derive(Debug, Clone, Default)]
pub struct ListColumn {
    items: Vec<Option<Vec<AnyValue>>>,
}

impl ListColumn {
    pub fn new(items: Vec<Option<Vec<AnyValue>>>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_none()).count()
    }

    pub fn get(&self, index: usize) -> Option<&[AnyValue]> {
        self.items[index].as_deref()
    }

    pub fn slice(&self, offset: usize, len: usize) -> ListColumn {
        ListColumn {
            items: self.items[offset..offset + len].to_vec(),
        }
    }
}

fn take_list(column: &ListColumn, indices: &[i64]) -> FacetResult<ListColumn> {
    let mut items = Vec::with_capacity(indices.len());
    for &index in indices {
        if index >= column.len() as i64 {
            return Err(FacetError::Shape(format!(
                "take index {} out of bounds for column of length {}",
                index,
                column.len()
            )));
        }
        if index < 0 {
            items.push(None);
        } else {
            items.push(column.items[index as usize].clone());
        }
    }
    Ok(ListColumn { items })
}

fn filter_list(column: &ListColumn, mask: &ChunkedColumn<bool>) -> FacetResult<ListColumn> {
    let items = mask
        .iter()
        .zip(&column.items)
        .filter(|(keep, _)| matches!(keep, Some(true)))
        .map(|(_, item)| item.clone())
        .collect();
    Ok(ListColumn { items })
}

/// Expand a match over every fixed-width payload arm, rebuilding the same
/// arm from `$prim(col, args...)`; byte-valued arms go through `$strf` and
/// list arms through `$listf`.
macro_rules! map_series_data {
    ($data:expr, $prim:path, $strf:path, $listf:path, ($($args:expr),*), |$null_len:ident| $null_expr:expr) => {
        match $data {
            SeriesData::Boolean(col) => SeriesData::Boolean($prim(col, $($args),*)?),
            SeriesData::Int8(col) => SeriesData::Int8($prim(col, $($args),*)?),
            SeriesData::Int16(col) => SeriesData::Int16($prim(col, $($args),*)?),
            SeriesData::Int32(col) => SeriesData::Int32($prim(col, $($args),*)?),
            SeriesData::Int64(col) => SeriesData::Int64($prim(col, $($args),*)?),
            SeriesData::UInt8(col) => SeriesData::UInt8($prim(col, $($args),*)?),
            SeriesData::UInt16(col) => SeriesData::UInt16($prim(col, $($args),*)?),
            SeriesData::UInt32(col) => SeriesData::UInt32($prim(col, $($args),*)?),
            SeriesData::UInt64(col) => SeriesData::UInt64($prim(col, $($args),*)?),
            SeriesData::Float32(col) => SeriesData::Float32($prim(col, $($args),*)?),
            SeriesData::Float64(col) => SeriesData::Float64($prim(col, $($args),*)?),
            SeriesData::String(col) => SeriesData::String($strf(col, $($args),*)?),
            SeriesData::Binary(col) => SeriesData::Binary($strf(col, $($args),*)?),
            SeriesData::Date(col) => SeriesData::Date($prim(col, $($args),*)?),
            SeriesData::Time(col) => SeriesData::Time($prim(col, $($args),*)?),
            SeriesData::Datetime(col) => SeriesData::Datetime($prim(col, $($args),*)?),
            SeriesData::Duration(col) => SeriesData::Duration($prim(col, $($args),*)?),
            SeriesData::List(col) => SeriesData::List($listf(col, $($args),*)?),
            SeriesData::Null($null_len) => SeriesData::Null($null_expr),
        }
    };
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Boolean(col) => col.len(),
            SeriesData::Int8(col) => col.len(),
            SeriesData::Int16(col) => col.len(),
            SeriesData::Int32(col) => col.len(),
            SeriesData::Int64(col) => col.len(),
            SeriesData::UInt8(col) => col.len(),
            SeriesData::UInt16(col) => col.len(),
            SeriesData::UInt32(col) => col.len(),
            SeriesData::UInt64(col) => col.len(),
            SeriesData::Float32(col) => col.len(),
            SeriesData::Float64(col) => col.len(),
            SeriesData::String(col) => col.len(),
            SeriesData::Binary(col) => col.len(),
            SeriesData::Date(col) => col.len(),
            SeriesData::Time(col) => col.len(),
            SeriesData::Datetime(col) => col.len(),
            SeriesData::Duration(col) => col.len(),
            SeriesData::List(col) => col.len(),
            SeriesData::Null(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DataType {
        match self {
            SeriesData::Boolean(_) => DataType::Boolean,
            SeriesData::Int8(_) => DataType::Int8,
            SeriesData::Int16(_) => DataType::Int16,
            SeriesData::Int32(_) => DataType::Int32,
            SeriesData::Int64(_) => DataType::Int64,
            SeriesData::UInt8(_) => DataType::UInt8,
            SeriesData::UInt16(_) => DataType::UInt16,
            SeriesData::UInt32(_) => DataType::UInt32,
            SeriesData::UInt64(_) => DataType::UInt64,
            SeriesData::Float32(_) => DataType::Float32,
            SeriesData::Float64(_) => DataType::Float64,
            SeriesData::String(_) => DataType::String,
            SeriesData::Binary(_) => DataType::Binary,
            SeriesData::Date(_) => DataType::Date,
            SeriesData::Time(_) => DataType::Time,
            SeriesData::Datetime(_) => DataType::Datetime,
            SeriesData::Duration(_) => DataType::Duration,
            SeriesData::List(_) => DataType::List,
            SeriesData::Null(_) => DataType::Null,
        }
    }

    pub fn null_count(&self) -> usize {
        match self {
            SeriesData::Boolean(col) => col.null_count(),
            SeriesData::Int8(col) => col.null_count(),
            SeriesData::Int16(col) => col.null_count(),
            SeriesData::Int32(col) => col.null_count(),
            SeriesData::Int64(col) => col.null_count(),
            SeriesData::UInt8(col) => col.null_count(),
            SeriesData::UInt16(col) => col.null_count(),
            SeriesData::UInt32(col) => col.null_count(),
            SeriesData::UInt64(col) => col.null_count(),
            SeriesData::Float32(col) => col.null_count(),
            SeriesData::Float64(col) => col.null_count(),
            SeriesData::String(col) => col.null_count(),
            SeriesData::Binary(col) => col.null_count(),
            SeriesData::Date(col) => col.null_count(),
            SeriesData::Time(col) => col.null_count(),
            SeriesData::Datetime(col) => col.null_count(),
            SeriesData::Duration(col) => col.null_count(),
            SeriesData::List(col) => col.null_count(),
            SeriesData::Null(len) => *len,
        }
    }

    pub fn get(&self, index: usize) -> AnyValue {
        match self {
            SeriesData::Boolean(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Boolean),
            SeriesData::Int8(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Int8),
            SeriesData::Int16(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Int16),
            SeriesData::Int32(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Int32),
            SeriesData::Int64(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Int64),
            SeriesData::UInt8(col) => col.get(index).map_or(AnyValue::Null, AnyValue::UInt8),
            SeriesData::UInt16(col) => col.get(index).map_or(AnyValue::Null, AnyValue::UInt16),
            SeriesData::UInt32(col) => col.get(index).map_or(AnyValue::Null, AnyValue::UInt32),
            SeriesData::UInt64(col) => col.get(index).map_or(AnyValue::Null, AnyValue::UInt64),
            SeriesData::Float32(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Float32),
            SeriesData::Float64(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Float64),
            SeriesData::String(col) => col.get(index).map_or(AnyValue::Null, |bytes| {
                AnyValue::String(String::from_utf8_lossy(bytes).into_owned())
            }),
            SeriesData::Binary(col) => col
                .get(index)
                .map_or(AnyValue::Null, |bytes| AnyValue::Binary(bytes.to_vec())),
            SeriesData::Date(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Date),
            SeriesData::Time(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Time),
            SeriesData::Datetime(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Datetime),
            SeriesData::Duration(col) => col.get(index).map_or(AnyValue::Null, AnyValue::Duration),
            SeriesData::List(col) => col
                .get(index)
                .map_or(AnyValue::Null, |values| AnyValue::List(values.to_vec())),
            SeriesData::Null(_) => AnyValue::Null,
        }
    }

    pub fn is_valid(&self, index: usize) -> bool {
        match self {
            SeriesData::Boolean(col) => col.is_valid(index),
            SeriesData::Int8(col) => col.is_valid(index),
            SeriesData::Int16(col) => col.is_valid(index),
            SeriesData::Int32(col) => col.is_valid(index),
            SeriesData::Int64(col) => col.is_valid(index),
            SeriesData::UInt8(col) => col.is_valid(index),
            SeriesData::UInt16(col) => col.is_valid(index),
            SeriesData::UInt32(col) => col.is_valid(index),
            SeriesData::UInt64(col) => col.is_valid(index),
            SeriesData::Float32(col) => col.is_valid(index),
            SeriesData::Float64(col) => col.is_valid(index),
            SeriesData::String(col) => col.is_valid(index),
            SeriesData::Binary(col) => col.is_valid(index),
            SeriesData::Date(col) => col.is_valid(index),
            SeriesData::Time(col) => col.is_valid(index),
            SeriesData::Datetime(col) => col.is_valid(index),
            SeriesData::Duration(col) => col.is_valid(index),
            SeriesData::List(col) => col.get(index).is_some(),
            SeriesData::Null(_) => false,
        }
    }

    pub fn slice(&self, offset: usize, len: usize) -> SeriesData {
        match self {
            SeriesData::Boolean(col) => SeriesData::Boolean(col.slice(offset, len)),
            SeriesData::Int8(col) => SeriesData::Int8(col.slice(offset, len)),
            SeriesData::Int16(col) => SeriesData::Int16(col.slice(offset, len)),
            SeriesData::Int32(col) => SeriesData::Int32(col.slice(offset, len)),
            SeriesData::Int64(col) => SeriesData::Int64(col.slice(offset, len)),
            SeriesData::UInt8(col) => SeriesData::UInt8(col.slice(offset, len)),
            SeriesData::UInt16(col) => SeriesData::UInt16(col.slice(offset, len)),
            SeriesData::UInt32(col) => SeriesData::UInt32(col.slice(offset, len)),
            SeriesData::UInt64(col) => SeriesData::UInt64(col.slice(offset, len)),
            SeriesData::Float32(col) => SeriesData::Float32(col.slice(offset, len)),
            SeriesData::Float64(col) => SeriesData::Float64(col.slice(offset, len)),
            SeriesData::String(col) => SeriesData::String(col.slice(offset, len)),
            SeriesData::Binary(col) => SeriesData::Binary(col.slice(offset, len)),
            SeriesData::Date(col) => SeriesData::Date(col.slice(offset, len)),
            SeriesData::Time(col) => SeriesData::Time(col.slice(offset, len)),
            SeriesData::Datetime(col) => SeriesData::Datetime(col.slice(offset, len)),
            SeriesData::Duration(col) => SeriesData::Duration(col.slice(offset, len)),
            SeriesData::List(col) => SeriesData::List(col.slice(offset, len)),
            SeriesData::Null(_) => SeriesData::Null(len),
        }
    }

    pub fn take(&self, indices: &[i64]) -> FacetResult<SeriesData> {
        Ok(map_series_data!(
            self,
            take_primitive,
            take_string,
            take_list,
            (indices),
            |_n| indices.len()
        ))
    }

    pub fn filter(&self, mask: &ChunkedColumn<bool>) -> FacetResult<SeriesData> {
        if mask.len() != self.len() {
            return Err(FacetError::Shape(format!(
                "filter mask length {} does not match column length {}",
                mask.len(),
                self.len()
            )));
        }
        Ok(map_series_data!(
            self,
            filter_primitive,
            filter_string,
            filter_list,
            (mask),
            |_n| mask.iter().filter(|v| matches!(v, Some(true))).count()
        ))
    }
}

/// Canonical 64-bit key form of a column, shared by group-by and join
pub enum KeyColumn {
    /// Per-row canonical bit pattern (floats normalized) plus validity
    Fixed {
        bits: Vec<u64>,
        validity: Option<Vec<bool>>,
    },
    /// Variable-length byte keys
    Bytes(StringChunked),
}

impl KeyColumn {
    pub fn len(&self) -> usize {
        match self {
            KeyColumn::Fixed { bits, .. } => bits.len(),
            KeyColumn::Bytes(col) => col.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validity of one row
    pub fn is_valid(&self, row: usize) -> bool {
        match self {
            KeyColumn::Fixed { validity, .. } => validity.as_ref().is_none_or(|v| v[row]),
            KeyColumn::Bytes(col) => col.is_valid(row),
        }
    }
}

fn fixed_key_bits<T, F>(col: &ChunkedColumn<T>, to_bits: F) -> KeyColumn
where
    T: crate::storage::chunk::NativeType + Default,
    F: Fn(T) -> u64,
{
    let (values, validity) = col.to_slice();
    let bits = values.into_iter().map(to_bits).collect();
    let validity = (col.null_count() > 0).then_some(validity);
    KeyColumn::Fixed { bits, validity }
}

/// A named column
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    data: SeriesData,
}

impl Series {
    /// Construct from anything with a native column representation
    pub fn new(name: impl Into<String>, values: impl IntoSeriesData) -> Self {
        Self {
            name: name.into(),
            data: values.into_series_data(),
        }
    }

    /// Construct from a typed payload
    pub fn from_data(name: impl Into<String>, data: SeriesData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// An all-null column with no concrete type
    pub fn full_null(name: impl Into<String>, len: usize) -> Self {
        Self::from_data(name, SeriesData::Null(len))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The same series under a new name
    pub fn with_name(&self, name: impl Into<String>) -> Series {
        Series {
            name: name.into(),
            data: self.data.clone(),
        }
    }

    pub fn data(&self) -> &SeriesData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    pub fn get(&self, index: usize) -> FacetResult<AnyValue> {
        if index >= self.len() {
            return Err(crate::shape_err!(
                "index {} out of bounds for series \"{}\" of length {}",
                index,
                self.name,
                self.len()
            ));
        }
        Ok(self.data.get(index))
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.data.is_valid(index)
    }

    /// Zero-copy sub-view
    pub fn slice(&self, offset: usize, len: usize) -> FacetResult<Series> {
        if offset + len > self.len() {
            return Err(FacetError::Shape(format!(
                "slice [{}, {}) out of bounds for series \"{}\" of length {}",
                offset,
                offset + len,
                self.name,
                self.len()
            )));
        }
        Ok(Series {
            name: self.name.clone(),
            data: self.data.slice(offset, len),
        })
    }

    pub fn head(&self, n: usize) -> Series {
        let n = n.min(self.len());
        Series {
            name: self.name.clone(),
            data: self.data.slice(0, n),
        }
    }

    pub fn tail(&self, n: usize) -> Series {
        let n = n.min(self.len());
        Series {
            name: self.name.clone(),
            data: self.data.slice(self.len() - n, n),
        }
    }

    /// Gather rows by index; `-1` gathers null
    pub fn take(&self, indices: &[i64]) -> FacetResult<Series> {
        Ok(Series {
            name: self.name.clone(),
            data: self.data.take(indices)?,
        })
    }

    /// Keep rows where the mask is true (null ⇒ false)
    pub fn filter(&self, mask: &ChunkedColumn<bool>) -> FacetResult<Series> {
        Ok(Series {
            name: self.name.clone(),
            data: self.data.filter(mask)?,
        })
    }

    /// Sort this series on itself
    pub fn sort(&self, descending: bool) -> FacetResult<Series> {
        let options = crate::execution::sort::SortOptions::default();
        let indices = crate::execution::sort::argsort(
            std::slice::from_ref(self),
            &[descending],
            &options,
        )?;
        self.take(&indices)
    }

    /// Cast to another logical type
    pub fn cast(&self, dtype: DataType) -> FacetResult<Series> {
        cast::cast_series(self, dtype)
    }

    /// The boolean payload, required by filtering
    pub fn bool_data(&self) -> FacetResult<&ChunkedColumn<bool>> {
        match &self.data {
            SeriesData::Boolean(col) => Ok(col),
            _ => Err(crate::schema_err!(
                "series \"{}\" has type {}, expected bool",
                self.name,
                self.dtype()
            )),
        }
    }

    /// The byte payload of String/Binary columns
    pub fn str_data(&self) -> FacetResult<&StringChunked> {
        match &self.data {
            SeriesData::String(col) | SeriesData::Binary(col) => Ok(col),
            _ => Err(crate::schema_err!(
                "series \"{}\" has type {}, expected str",
                self.name,
                self.dtype()
            )),
        }
    }

    /// Dense f64 materialization of any numeric column, for the
    /// floating-point aggregation kernels
    pub fn numeric_f64(&self) -> FacetResult<(Vec<f64>, Option<Vec<bool>>)> {
        macro_rules! widen {
            ($col:expr) => {{
                let (values, validity) = $col.to_slice();
                let wide = values.into_iter().map(|v| v as f64).collect();
                Ok((wide, ($col.null_count() > 0).then_some(validity)))
            }};
        }
        match &self.data {
            SeriesData::Int8(col) => widen!(col),
            SeriesData::Int16(col) => widen!(col),
            SeriesData::Int32(col) => widen!(col),
            SeriesData::Int64(col) => widen!(col),
            SeriesData::UInt8(col) => widen!(col),
            SeriesData::UInt16(col) => widen!(col),
            SeriesData::UInt32(col) => widen!(col),
            SeriesData::UInt64(col) => widen!(col),
            SeriesData::Float32(col) => widen!(col),
            SeriesData::Float64(col) => {
                let (values, validity) = col.to_slice();
                Ok((values, (col.null_count() > 0).then_some(validity)))
            }
            _ => Err(FacetError::Schema(format!(
                "series \"{}\" has type {}, expected a numeric type",
                self.name,
                self.dtype()
            ))),
        }
    }

    /// Canonical key form for grouping and joining
    pub fn to_key_column(&self) -> FacetResult<KeyColumn> {
        match &self.data {
            SeriesData::Boolean(col) => Ok(fixed_key_bits(col, |v| v as u64)),
            SeriesData::Int8(col) => Ok(fixed_key_bits(col, |v| v as u8 as u64)),
            SeriesData::Int16(col) => Ok(fixed_key_bits(col, |v| v as u16 as u64)),
            SeriesData::Int32(col) => Ok(fixed_key_bits(col, |v| v as u32 as u64)),
            SeriesData::Int64(col) => Ok(fixed_key_bits(col, |v| v as u64)),
            SeriesData::UInt8(col) => Ok(fixed_key_bits(col, |v| v as u64)),
            SeriesData::UInt16(col) => Ok(fixed_key_bits(col, |v| v as u64)),
            SeriesData::UInt32(col) => Ok(fixed_key_bits(col, |v| v as u64)),
            SeriesData::UInt64(col) => Ok(fixed_key_bits(col, |v| v)),
            SeriesData::Float32(col) => Ok(fixed_key_bits(col, canonical_f32_bits)),
            SeriesData::Float64(col) => Ok(fixed_key_bits(col, canonical_f64_bits)),
            SeriesData::String(col) | SeriesData::Binary(col) => {
                Ok(KeyColumn::Bytes(col.clone()))
            }
            SeriesData::Date(col) => Ok(fixed_key_bits(col, |v| v as u32 as u64)),
            SeriesData::Time(col) | SeriesData::Datetime(col) | SeriesData::Duration(col) => {
                Ok(fixed_key_bits(col, |v| v as u64))
            }
            SeriesData::List(_) => Err(FacetError::Schema(format!(
                "series \"{}\" of type list cannot be a key",
                self.name
            ))),
            SeriesData::Null(len) => Ok(KeyColumn::Fixed {
                bits: vec![0; *len],
                validity: Some(vec![false; *len]),
            }),
        }
    }

    /// Stable one-byte tag of the logical type, used in encoded multi-key
    /// tie-break strings
    pub fn key_tag(&self) -> u8 {
        match self.dtype() {
            DataType::Boolean => 1,
            DataType::Int8 => 2,
            DataType::Int16 => 3,
            DataType::Int32 => 4,
            DataType::Int64 => 5,
            DataType::UInt8 => 6,
            DataType::UInt16 => 7,
            DataType::UInt32 => 8,
            DataType::UInt64 => 9,
            DataType::Float32 => 10,
            DataType::Float64 => 11,
            DataType::String => 12,
            DataType::Binary => 13,
            DataType::Date => 14,
            DataType::Time => 15,
            DataType::Datetime => 16,
            DataType::Duration => 17,
            DataType::Null => 18,
            DataType::Unknown => 19,
            DataType::List => 20,
        }
    }

    /// Value-wise equality (names not considered)
    pub fn equals(&self, other: &Series) -> bool {
        if self.dtype() != other.dtype() || self.len() != other.len() {
            return false;
        }
        (0..self.len()).all(|i| self.data.get(i) == other.data.get(i))
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Series \"{}\" [{}], len {}",
            self.name,
            self.dtype(),
            self.len()
        )?;
        let shown = self.len().min(8);
        for i in 0..shown {
            writeln!(f, "  {}", self.data.get(i))?;
        }
        if shown < self.len() {
            writeln!(f, "  …")?;
        }
        Ok(())
    }
}

/// Conversion of native Rust containers into series payloads
pub trait IntoSeriesData {
    fn into_series_data(self) -> SeriesData;
}

macro_rules! impl_into_series_data {
    ($native:ty, $variant:ident) => {
        impl IntoSeriesData for &[$native] {
            fn into_series_data(self) -> SeriesData {
                SeriesData::$variant(ChunkedColumn::from_slice(self, None))
            }
        }

        impl IntoSeriesData for Vec<$native> {
            fn into_series_data(self) -> SeriesData {
                SeriesData::$variant(ChunkedColumn::from_vec(self, None))
            }
        }

        impl IntoSeriesData for &[Option<$native>] {
            fn into_series_data(self) -> SeriesData {
                SeriesData::$variant(ChunkedColumn::from_options(self))
            }
        }

        impl IntoSeriesData for Vec<Option<$native>> {
            fn into_series_data(self) -> SeriesData {
                SeriesData::$variant(ChunkedColumn::from_options(&self))
            }
        }

        impl<const N: usize> IntoSeriesData for &[$native; N] {
            fn into_series_data(self) -> SeriesData {
                SeriesData::$variant(ChunkedColumn::from_slice(self, None))
            }
        }

        impl<const N: usize> IntoSeriesData for &[Option<$native>; N] {
            fn into_series_data(self) -> SeriesData {
                SeriesData::$variant(ChunkedColumn::from_options(self))
            }
        }
    };
}

impl_into_series_data!(bool, Boolean);
impl_into_series_data!(i8, Int8);
impl_into_series_data!(i16, Int16);
impl_into_series_data!(i32, Int32);
impl_into_series_data!(i64, Int64);
impl_into_series_data!(u8, UInt8);
impl_into_series_data!(u16, UInt16);
impl_into_series_data!(u32, UInt32);
impl_into_series_data!(u64, UInt64);
impl_into_series_data!(f32, Float32);
impl_into_series_data!(f64, Float64);

impl IntoSeriesData for &[&str] {
    fn into_series_data(self) -> SeriesData {
        SeriesData::String(StringChunked::from_strs(self.iter().map(|s| Some(*s))))
    }
}

impl<const N: usize> IntoSeriesData for &[&str; N] {
    fn into_series_data(self) -> SeriesData {
        SeriesData::String(StringChunked::from_strs(self.iter().map(|s| Some(*s))))
    }
}

impl IntoSeriesData for Vec<&str> {
    fn into_series_data(self) -> SeriesData {
        SeriesData::String(StringChunked::from_strs(self.iter().map(|s| Some(*s))))
    }
}

impl IntoSeriesData for Vec<String> {
    fn into_series_data(self) -> SeriesData {
        SeriesData::String(StringChunked::from_strs(
            self.iter().map(|s| Some(s.as_str())),
        ))
    }
}

impl IntoSeriesData for &[Option<&str>] {
    fn into_series_data(self) -> SeriesData {
        SeriesData::String(StringChunked::from_strs(self.iter().copied()))
    }
}

impl<const N: usize> IntoSeriesData for &[Option<&str>; N] {
    fn into_series_data(self) -> SeriesData {
        SeriesData::String(StringChunked::from_strs(self.iter().copied()))
    }
}

impl IntoSeriesData for Vec<Option<String>> {
    fn into_series_data(self) -> SeriesData {
        SeriesData::String(StringChunked::from_strs(
            self.iter().map(|s| s.as_deref()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_get() {
        let s = Series::new("a", &[1i64, 2, 3]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.dtype(), DataType::Int64);
        assert_eq!(s.get(1).unwrap(), AnyValue::Int64(2));
        assert!(s.get(3).is_err());
    }

    #[test]
    fn test_new_with_nulls() {
        let s = Series::new("a", &[Some(1.5f64), None]);
        assert_eq!(s.null_count(), 1);
        assert_eq!(s.get(1).unwrap(), AnyValue::Null);
    }

    #[test]
    fn test_string_series() {
        let s = Series::new("names", &[Some("ada"), None, Some("grace")]);
        assert_eq!(s.dtype(), DataType::String);
        assert_eq!(s.get(0).unwrap(), AnyValue::from("ada"));
        assert_eq!(s.get(1).unwrap(), AnyValue::Null);
    }

    #[test]
    fn test_take_and_filter() {
        let s = Series::new("a", &[10i32, 20, 30]);
        let taken = s.take(&[2, -1, 0]).unwrap();
        assert_eq!(taken.get(0).unwrap(), AnyValue::Int32(30));
        assert_eq!(taken.get(1).unwrap(), AnyValue::Null);

        let mask = ChunkedColumn::from_slice(&[true, false, true], None);
        let filtered = s.filter(&mask).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.get(1).unwrap(), AnyValue::Int32(30));
    }

    #[test]
    fn test_slice_head_tail() {
        let s = Series::new("a", &[1i64, 2, 3, 4, 5]);
        assert_eq!(s.slice(1, 3).unwrap().get(0).unwrap(), AnyValue::Int64(2));
        assert_eq!(s.head(2).len(), 2);
        assert_eq!(s.tail(2).get(0).unwrap(), AnyValue::Int64(4));
        assert_eq!(s.head(99).len(), 5);
    }

    #[test]
    fn test_key_column_float_canonicalization() {
        let s = Series::new("f", &[0.0f64, -0.0, f64::NAN]);
        let KeyColumn::Fixed { bits, .. } = s.to_key_column().unwrap() else {
            panic!("expected fixed key column");
        };
        assert_eq!(bits[0], bits[1]);
        assert_eq!(bits[2], crate::execution::hash::CANONICAL_NAN_BITS);
    }

    #[test]
    fn test_equals() {
        let a = Series::new("x", &[1i64, 2]);
        let b = Series::new("y", &[1i64, 2]);
        let c = Series::new("x", &[1i64, 3]);
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }
}
