//! Dynamic scalar values
//!
//! `AnyValue` is the boxed form of a single cell: element access on a
//! type-erased column, expression literals, and display rendering all go
//! through it. Hot kernels never touch `AnyValue`; they run on typed
//! buffers.

use crate::types::dtype::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single dynamically typed value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnyValue {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Binary(Vec<u8>),
    /// Days since epoch
    Date(i32),
    /// Nanoseconds since midnight
    Time(i64),
    /// Microseconds since epoch
    Datetime(i64),
    /// Microseconds
    Duration(i64),
    /// Variable-length list of values
    List(Vec<AnyValue>),
}

impl AnyValue {
    /// The logical type of this value
    pub fn dtype(&self) -> DataType {
        match self {
            AnyValue::Null => DataType::Null,
            AnyValue::Boolean(_) => DataType::Boolean,
            AnyValue::Int8(_) => DataType::Int8,
            AnyValue::Int16(_) => DataType::Int16,
            AnyValue::Int32(_) => DataType::Int32,
            AnyValue::Int64(_) => DataType::Int64,
            AnyValue::UInt8(_) => DataType::UInt8,
            AnyValue::UInt16(_) => DataType::UInt16,
            AnyValue::UInt32(_) => DataType::UInt32,
            AnyValue::UInt64(_) => DataType::UInt64,
            AnyValue::Float32(_) => DataType::Float32,
            AnyValue::Float64(_) => DataType::Float64,
            AnyValue::String(_) => DataType::String,
            AnyValue::Binary(_) => DataType::Binary,
            AnyValue::Date(_) => DataType::Date,
            AnyValue::Time(_) => DataType::Time,
            AnyValue::Datetime(_) => DataType::Datetime,
            AnyValue::Duration(_) => DataType::Duration,
            AnyValue::List(_) => DataType::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AnyValue::Null)
    }

    /// Numeric view as f64, if the value is numeric or boolean
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            AnyValue::Boolean(b) => Some(*b as u8 as f64),
            AnyValue::Int8(v) => Some(*v as f64),
            AnyValue::Int16(v) => Some(*v as f64),
            AnyValue::Int32(v) => Some(*v as f64),
            AnyValue::Int64(v) => Some(*v as f64),
            AnyValue::UInt8(v) => Some(*v as f64),
            AnyValue::UInt16(v) => Some(*v as f64),
            AnyValue::UInt32(v) => Some(*v as f64),
            AnyValue::UInt64(v) => Some(*v as f64),
            AnyValue::Float32(v) => Some(*v as f64),
            AnyValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view as i64, if the value is integral and in range
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            AnyValue::Boolean(b) => Some(*b as i64),
            AnyValue::Int8(v) => Some(*v as i64),
            AnyValue::Int16(v) => Some(*v as i64),
            AnyValue::Int32(v) => Some(*v as i64),
            AnyValue::Int64(v) => Some(*v),
            AnyValue::UInt8(v) => Some(*v as i64),
            AnyValue::UInt16(v) => Some(*v as i64),
            AnyValue::UInt32(v) => Some(*v as i64),
            AnyValue::UInt64(v) => i64::try_from(*v).ok(),
            AnyValue::Date(v) => Some(*v as i64),
            AnyValue::Time(v) | AnyValue::Datetime(v) | AnyValue::Duration(v) => Some(*v),
            _ => None,
        }
    }

    /// String view, if the value is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl PartialEq for AnyValue {
    fn eq(&self, other: &Self) -> bool {
        use AnyValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Datetime(a), Datetime(b)) => a == b,
            (Duration(a), Duration(b)) => a == b,
            (List(a), List(b)) => a == b,
            // Numeric values compare across widths.
            (a, b) => match (a.to_f64(), b.to_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Display for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyValue::Null => write!(f, "null"),
            AnyValue::Boolean(v) => write!(f, "{}", v),
            AnyValue::Int8(v) => write!(f, "{}", v),
            AnyValue::Int16(v) => write!(f, "{}", v),
            AnyValue::Int32(v) => write!(f, "{}", v),
            AnyValue::Int64(v) => write!(f, "{}", v),
            AnyValue::UInt8(v) => write!(f, "{}", v),
            AnyValue::UInt16(v) => write!(f, "{}", v),
            AnyValue::UInt32(v) => write!(f, "{}", v),
            AnyValue::UInt64(v) => write!(f, "{}", v),
            AnyValue::Float32(v) => write!(f, "{}", v),
            AnyValue::Float64(v) => write!(f, "{}", v),
            AnyValue::String(v) => write!(f, "{}", v),
            AnyValue::Binary(v) => write!(f, "b[{} bytes]", v.len()),
            AnyValue::Date(v) => {
                use chrono::{Duration, NaiveDate};
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
                match epoch.checked_add_signed(Duration::days(*v as i64)) {
                    Some(d) => write!(f, "{}", d),
                    None => write!(f, "date({})", v),
                }
            }
            AnyValue::Time(v) => write!(f, "time({}ns)", v),
            AnyValue::Datetime(v) => {
                use chrono::DateTime;
                match DateTime::from_timestamp_micros(*v) {
                    Some(ts) => write!(f, "{}", ts.naive_utc()),
                    None => write!(f, "datetime({})", v),
                }
            }
            AnyValue::Duration(v) => write!(f, "{}us", v),
            AnyValue::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for AnyValue {
    fn from(v: bool) -> Self {
        AnyValue::Boolean(v)
    }
}

impl From<i32> for AnyValue {
    fn from(v: i32) -> Self {
        AnyValue::Int32(v)
    }
}

impl From<i64> for AnyValue {
    fn from(v: i64) -> Self {
        AnyValue::Int64(v)
    }
}

impl From<f64> for AnyValue {
    fn from(v: f64) -> Self {
        AnyValue::Float64(v)
    }
}

impl From<&str> for AnyValue {
    fn from(v: &str) -> Self {
        AnyValue::String(v.to_string())
    }
}

impl From<String> for AnyValue {
    fn from(v: String) -> Self {
        AnyValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_mapping() {
        assert_eq!(AnyValue::Int32(5).dtype(), DataType::Int32);
        assert_eq!(AnyValue::Null.dtype(), DataType::Null);
        assert_eq!(AnyValue::from("x").dtype(), DataType::String);
    }

    #[test]
    fn test_cross_width_equality() {
        assert_eq!(AnyValue::Int32(5), AnyValue::Int64(5));
        assert_eq!(AnyValue::Float64(2.5), AnyValue::Float32(2.5));
        assert_ne!(AnyValue::Null, AnyValue::Int32(0));
    }

    #[test]
    fn test_date_display() {
        assert_eq!(AnyValue::Date(0).to_string(), "1970-01-01");
        assert_eq!(AnyValue::Date(365).to_string(), "1971-01-01");
    }
}
