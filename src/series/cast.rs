//! Series casting
//!
//! Numeric casts go through checked conversion: a value outside the
//! target domain is an error, not a wrap. String parsing and rendering
//! cover the string edges of the lattice; temporal types reinterpret
//! their integer storage.

use crate::common::error::{FacetError, FacetResult};
use crate::series::{Series, SeriesData};
use crate::storage::chunk::NativeType;
use crate::storage::{ChunkedColumn, StringChunked};
use crate::types::DataType;
use num_traits::{NumCast, ToPrimitive};

fn cast_numeric<S, D>(col: &ChunkedColumn<S>, to: DataType) -> FacetResult<ChunkedColumn<D>>
where
    S: NativeType + ToPrimitive + std::fmt::Display,
    D: NativeType + NumCast + Default,
{
    let mut values = Vec::with_capacity(col.len());
    let mut validity = Vec::with_capacity(col.len());
    let mut any_null = false;
    for value in col.iter() {
        match value {
            Some(v) => {
                let converted: D = NumCast::from(v).ok_or_else(|| {
                    FacetError::Value(format!("cannot cast value {} to {}", v, to))
                })?;
                values.push(converted);
                validity.push(true);
            }
            None => {
                values.push(D::default());
                validity.push(false);
                any_null = true;
            }
        }
    }
    Ok(ChunkedColumn::from_slice(
        &values,
        any_null.then_some(validity.as_slice()),
    ))
}

fn numeric_to_string<S>(col: &ChunkedColumn<S>) -> StringChunked
where
    S: NativeType + std::fmt::Display,
{
    let rendered: Vec<Option<String>> = col.iter().map(|v| v.map(|x| x.to_string())).collect();
    StringChunked::from_strs(rendered.iter().map(|v| v.as_deref()))
}

fn string_to_numeric<D>(col: &StringChunked, to: DataType) -> FacetResult<ChunkedColumn<D>>
where
    D: NativeType + Default + std::str::FromStr,
{
    let mut values = Vec::with_capacity(col.len());
    let mut validity = Vec::with_capacity(col.len());
    let mut any_null = false;
    for value in col.iter() {
        match value {
            Some(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(|_| {
                    FacetError::Value(format!("cannot cast non-UTF-8 bytes to {}", to))
                })?;
                let parsed = text.trim().parse::<D>().map_err(|_| {
                    FacetError::Value(format!("cannot cast \"{}\" to {}", text, to))
                })?;
                values.push(parsed);
                validity.push(true);
            }
            None => {
                values.push(D::default());
                validity.push(false);
                any_null = true;
            }
        }
    }
    Ok(ChunkedColumn::from_slice(
        &values,
        any_null.then_some(validity.as_slice()),
    ))
}

fn bool_to_numeric<D>(col: &ChunkedColumn<bool>) -> ChunkedColumn<D>
where
    D: NativeType + NumCast + Default,
{
    let mut values = Vec::with_capacity(col.len());
    let mut validity = Vec::with_capacity(col.len());
    let mut any_null = false;
    for value in col.iter() {
        match value {
            Some(v) => {
                // 0 and 1 fit every numeric target.
                values.push(NumCast::from(v as u8).unwrap_or_default());
                validity.push(true);
            }
            None => {
                values.push(D::default());
                validity.push(false);
                any_null = true;
            }
        }
    }
    ChunkedColumn::from_slice(&values, any_null.then_some(validity.as_slice()))
}

/// Cast a numeric or boolean payload into the numeric target `D`
macro_rules! cast_into_numeric {
    ($data:expr, $to:expr, $target:ty, $variant:ident) => {
        match $data {
            SeriesData::Boolean(col) => Ok(SeriesData::$variant(bool_to_numeric::<$target>(col))),
            SeriesData::Int8(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::Int16(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::Int32(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::Int64(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::UInt8(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::UInt16(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::UInt32(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::UInt64(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::Float32(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::Float64(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::String(col) => Ok(SeriesData::$variant(string_to_numeric(col, $to)?)),
            SeriesData::Date(col) => Ok(SeriesData::$variant(cast_numeric(col, $to)?)),
            SeriesData::Time(col) | SeriesData::Datetime(col) | SeriesData::Duration(col) => {
                Ok(SeriesData::$variant(cast_numeric(col, $to)?))
            }
            SeriesData::Null(len) => Ok(SeriesData::$variant(null_column::<$target>(*len))),
            other => Err(FacetError::Schema(format!(
                "cannot cast {} to {}",
                other.dtype(),
                $to
            ))),
        }
    };
}

fn null_column<T: NativeType + Default>(len: usize) -> ChunkedColumn<T> {
    let values = vec![T::default(); len];
    let validity = vec![false; len];
    ChunkedColumn::from_slice(&values, Some(&validity))
}

pub(crate) fn cast_series(series: &Series, to: DataType) -> FacetResult<Series> {
    if series.dtype() == to {
        return Ok(series.clone());
    }
    let data = cast_data(series.data(), to)?;
    Ok(Series::from_data(series.name(), data))
}

fn cast_data(data: &SeriesData, to: DataType) -> FacetResult<SeriesData> {
    match to {
        DataType::Int8 => cast_into_numeric!(data, to, i8, Int8),
        DataType::Int16 => cast_into_numeric!(data, to, i16, Int16),
        DataType::Int32 => cast_into_numeric!(data, to, i32, Int32),
        DataType::Int64 => cast_into_numeric!(data, to, i64, Int64),
        DataType::UInt8 => cast_into_numeric!(data, to, u8, UInt8),
        DataType::UInt16 => cast_into_numeric!(data, to, u16, UInt16),
        DataType::UInt32 => cast_into_numeric!(data, to, u32, UInt32),
        DataType::UInt64 => cast_into_numeric!(data, to, u64, UInt64),
        DataType::Float32 => cast_into_numeric!(data, to, f32, Float32),
        DataType::Float64 => cast_into_numeric!(data, to, f64, Float64),
        DataType::String => match data {
            SeriesData::Boolean(col) => {
                let rendered: Vec<Option<String>> =
                    col.iter().map(|v| v.map(|b| b.to_string())).collect();
                Ok(SeriesData::String(StringChunked::from_strs(
                    rendered.iter().map(|v| v.as_deref()),
                )))
            }
            SeriesData::Int8(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::Int16(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::Int32(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::Int64(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::UInt8(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::UInt16(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::UInt32(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::UInt64(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::Float32(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::Float64(col) => Ok(SeriesData::String(numeric_to_string(col))),
            SeriesData::Binary(col) => Ok(SeriesData::String(col.clone())),
            SeriesData::Null(len) => {
                let nulls: Vec<Option<&str>> = vec![None; *len];
                Ok(SeriesData::String(StringChunked::from_strs(
                    nulls.into_iter(),
                )))
            }
            other => Err(FacetError::Schema(format!(
                "cannot cast {} to str",
                other.dtype()
            ))),
        },
        DataType::Binary => match data {
            SeriesData::String(col) | SeriesData::Binary(col) => {
                Ok(SeriesData::Binary(col.clone()))
            }
            other => Err(FacetError::Schema(format!(
                "cannot cast {} to binary",
                other.dtype()
            ))),
        },
        DataType::Boolean => match data {
            SeriesData::Boolean(col) => Ok(SeriesData::Boolean(col.clone())),
            SeriesData::Int8(col) => Ok(SeriesData::Boolean(numeric_to_bool(col))),
            SeriesData::Int16(col) => Ok(SeriesData::Boolean(numeric_to_bool(col))),
            SeriesData::Int32(col) => Ok(SeriesData::Boolean(numeric_to_bool(col))),
            SeriesData::Int64(col) => Ok(SeriesData::Boolean(numeric_to_bool(col))),
            SeriesData::UInt8(col) => Ok(SeriesData::Boolean(numeric_to_bool(col))),
            SeriesData::UInt16(col) => Ok(SeriesData::Boolean(numeric_to_bool(col))),
            SeriesData::UInt32(col) => Ok(SeriesData::Boolean(numeric_to_bool(col))),
            SeriesData::UInt64(col) => Ok(SeriesData::Boolean(numeric_to_bool(col))),
            SeriesData::Null(len) => Ok(SeriesData::Boolean(null_column::<bool>(*len))),
            other => Err(FacetError::Schema(format!(
                "cannot cast {} to bool",
                other.dtype()
            ))),
        },
        DataType::Date => match data {
            SeriesData::Date(col) => Ok(SeriesData::Date(col.clone())),
            SeriesData::Int32(col) => Ok(SeriesData::Date(col.clone())),
            SeriesData::Int64(col) => Ok(SeriesData::Date(cast_numeric(col, to)?)),
            SeriesData::Null(len) => Ok(SeriesData::Date(null_column::<i32>(*len))),
            other => Err(FacetError::Schema(format!(
                "cannot cast {} to date",
                other.dtype()
            ))),
        },
        DataType::Time | DataType::Datetime | DataType::Duration => {
            let col = match data {
                SeriesData::Time(col) | SeriesData::Datetime(col) | SeriesData::Duration(col) => {
                    col.clone()
                }
                SeriesData::Int64(col) => col.clone(),
                SeriesData::Int32(col) => cast_numeric(col, to)?,
                SeriesData::Null(len) => null_column::<i64>(*len),
                other => {
                    return Err(FacetError::Schema(format!(
                        "cannot cast {} to {}",
                        other.dtype(),
                        to
                    )))
                }
            };
            Ok(match to {
                DataType::Time => SeriesData::Time(col),
                DataType::Datetime => SeriesData::Datetime(col),
                _ => SeriesData::Duration(col),
            })
        }
        DataType::List | DataType::Null | DataType::Unknown => Err(FacetError::Schema(format!(
            "cannot cast {} to {}",
            data.dtype(),
            to
        ))),
    }
}

fn numeric_to_bool<S>(col: &ChunkedColumn<S>) -> ChunkedColumn<bool>
where
    S: NativeType + ToPrimitive,
{
    let mut values = Vec::with_capacity(col.len());
    let mut validity = Vec::with_capacity(col.len());
    let mut any_null = false;
    for value in col.iter() {
        match value {
            Some(v) => {
                values.push(v.to_f64().is_some_and(|x| x != 0.0));
                validity.push(true);
            }
            None => {
                values.push(false);
                validity.push(false);
                any_null = true;
            }
        }
    }
    ChunkedColumn::from_slice(&values, any_null.then_some(validity.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnyValue;

    #[test]
    fn test_widening_cast() {
        let s = Series::new("a", &[1i32, 2]);
        let wide = s.cast(DataType::Int64).unwrap();
        assert_eq!(wide.dtype(), DataType::Int64);
        assert_eq!(wide.get(0).unwrap(), AnyValue::Int64(1));
    }

    #[test]
    fn test_narrowing_cast_out_of_domain() {
        let s = Series::new("a", &[300i64]);
        assert!(s.cast(DataType::Int8).is_err());
        assert!(s.cast(DataType::UInt8).is_err());
        let ok = Series::new("b", &[-5i64]).cast(DataType::Int8).unwrap();
        assert_eq!(ok.get(0).unwrap(), AnyValue::Int8(-5));
    }

    #[test]
    fn test_string_parse_cast() {
        let s = Series::new("a", &["1", " 2 ", "3"]);
        let parsed = s.cast(DataType::Int64).unwrap();
        assert_eq!(parsed.get(1).unwrap(), AnyValue::Int64(2));

        let bad = Series::new("b", &["x"]);
        assert!(bad.cast(DataType::Int64).is_err());
    }

    #[test]
    fn test_numeric_to_string_cast() {
        let s = Series::new("a", &[Some(1.5f64), None]);
        let rendered = s.cast(DataType::String).unwrap();
        assert_eq!(rendered.get(0).unwrap(), AnyValue::from("1.5"));
        assert_eq!(rendered.get(1).unwrap(), AnyValue::Null);
    }

    #[test]
    fn test_date_reinterpret() {
        let s = Series::new("d", &[10i32, 20]);
        let date = s.cast(DataType::Date).unwrap();
        assert_eq!(date.dtype(), DataType::Date);
        assert_eq!(date.get(0).unwrap(), AnyValue::Date(10));
    }

    #[test]
    fn test_null_cast() {
        let s = Series::full_null("n", 3);
        let typed = s.cast(DataType::Float64).unwrap();
        assert_eq!(typed.dtype(), DataType::Float64);
        assert_eq!(typed.null_count(), 3);
    }
}
