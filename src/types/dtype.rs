//! Logical data types
//!
//! Data types are the user-facing types of columns. Integer, float and
//! boolean values are fixed-width and trivially copyable; String and Binary
//! values live in a shared byte buffer addressed by offsets; temporal types
//! are stored as integer moments.

use crate::common::error::{FacetError, FacetResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean (true/false)
    Boolean,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// UTF-8 string
    String,
    /// Arbitrary bytes
    Binary,
    /// Days since 1970-01-01
    Date,
    /// Nanoseconds since midnight
    Time,
    /// Microseconds since 1970-01-01 00:00:00 UTC
    Datetime,
    /// Microseconds of elapsed time
    Duration,
    /// Variable-length list of values; produced by top-k aggregation
    List,
    /// All-null column with no concrete type
    Null,
    /// Type not yet resolved
    Unknown,
}

impl DataType {
    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Check if this type is an integer type (signed or unsigned)
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        )
    }

    /// Check if this type is a signed integer
    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    /// Check if this type is an unsigned integer
    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        )
    }

    /// Check if this type is floating point
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Check if this type is temporal (date/time related)
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Time | DataType::Datetime | DataType::Duration
        )
    }

    /// Check if values of this type can be used as group-by / join keys
    pub fn is_keyable(&self) -> bool {
        self.is_numeric() || self.is_temporal() || matches!(self, DataType::Boolean | DataType::String)
    }

    /// Width in bits of the integer representation, if fixed-width
    pub fn bit_width(&self) -> Option<usize> {
        match self {
            DataType::Boolean | DataType::Int8 | DataType::UInt8 => Some(8),
            DataType::Int16 | DataType::UInt16 => Some(16),
            DataType::Int32 | DataType::UInt32 | DataType::Float32 | DataType::Date => Some(32),
            DataType::Int64
            | DataType::UInt64
            | DataType::Float64
            | DataType::Time
            | DataType::Datetime
            | DataType::Duration => Some(64),
            _ => None,
        }
    }

    /// The smallest type that can represent values of both inputs.
    ///
    /// Widening rules: int + int widens to the wider signed/unsigned family
    /// member, any float makes the result float, and mixed integer/float
    /// (or mixed signedness at 64 bits) widens to Float64.
    pub fn supertype(&self, other: &DataType) -> FacetResult<DataType> {
        use DataType::*;

        if self == other {
            return Ok(*self);
        }
        // Null yields to any concrete type.
        match (self, other) {
            (Null, dt) | (dt, Null) => return Ok(*dt),
            _ => {}
        }

        let result = match (self, other) {
            (Float64, dt) | (dt, Float64) if dt.is_numeric() => Some(Float64),
            (Float32, dt) | (dt, Float32) if dt.is_float() => Some(Float64),
            (Float32, dt) | (dt, Float32) if dt.is_integer() => Some(Float64),
            (a, b) if a.is_signed_integer() && b.is_signed_integer() => {
                Some(Self::wider_signed(a.bit_width().unwrap().max(b.bit_width().unwrap())))
            }
            (a, b) if a.is_unsigned_integer() && b.is_unsigned_integer() => {
                Some(Self::wider_unsigned(a.bit_width().unwrap().max(b.bit_width().unwrap())))
            }
            // Mixed signedness: widen to the next signed type, Float64 at 64 bits.
            (a, b) if a.is_integer() && b.is_integer() => {
                let bits = a.bit_width().unwrap().max(b.bit_width().unwrap());
                if bits >= 64 {
                    Some(Float64)
                } else {
                    Some(Self::wider_signed(bits * 2))
                }
            }
            (Boolean, dt) | (dt, Boolean) if dt.is_integer() => Some(*dt),
            (Date, Datetime) | (Datetime, Date) => Some(Datetime),
            _ => None,
        };

        result.ok_or_else(|| {
            FacetError::Schema(format!("no common type for {} and {}", self, other))
        })
    }

    fn wider_signed(bits: usize) -> DataType {
        match bits {
            8 => DataType::Int8,
            16 => DataType::Int16,
            32 => DataType::Int32,
            _ => DataType::Int64,
        }
    }

    fn wider_unsigned(bits: usize) -> DataType {
        match bits {
            8 => DataType::UInt8,
            16 => DataType::UInt16,
            32 => DataType::UInt32,
            _ => DataType::UInt64,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "bool",
            DataType::Int8 => "i8",
            DataType::Int16 => "i16",
            DataType::Int32 => "i32",
            DataType::Int64 => "i64",
            DataType::UInt8 => "u8",
            DataType::UInt16 => "u16",
            DataType::UInt32 => "u32",
            DataType::UInt64 => "u64",
            DataType::Float32 => "f32",
            DataType::Float64 => "f64",
            DataType::String => "str",
            DataType::Binary => "binary",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::Datetime => "datetime[us]",
            DataType::Duration => "duration[us]",
            DataType::List => "list",
            DataType::Null => "null",
            DataType::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A named column type, the unit of a frame schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub dtype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// An ordered set of fields
pub type Schema = Vec<Field>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_predicates() {
        assert!(DataType::Int32.is_numeric());
        assert!(DataType::Int32.is_integer());
        assert!(!DataType::Int32.is_float());

        assert!(DataType::Float32.is_numeric());
        assert!(DataType::Float32.is_float());
        assert!(!DataType::Float32.is_integer());

        assert!(DataType::Date.is_temporal());
        assert!(DataType::String.is_keyable());
        assert!(!DataType::Binary.is_keyable());
    }

    #[test]
    fn test_supertype_widening() {
        assert_eq!(
            DataType::Int8.supertype(&DataType::Int64).unwrap(),
            DataType::Int64
        );
        assert_eq!(
            DataType::UInt16.supertype(&DataType::UInt32).unwrap(),
            DataType::UInt32
        );
        assert_eq!(
            DataType::Int32.supertype(&DataType::Float32).unwrap(),
            DataType::Float64
        );
        assert_eq!(
            DataType::Float32.supertype(&DataType::Float64).unwrap(),
            DataType::Float64
        );
        // Mixed signedness widens to the next signed width.
        assert_eq!(
            DataType::Int16.supertype(&DataType::UInt16).unwrap(),
            DataType::Int32
        );
        assert_eq!(
            DataType::Int64.supertype(&DataType::UInt64).unwrap(),
            DataType::Float64
        );
    }

    #[test]
    fn test_supertype_null() {
        assert_eq!(
            DataType::Null.supertype(&DataType::String).unwrap(),
            DataType::String
        );
    }

    #[test]
    fn test_supertype_incompatible() {
        assert!(DataType::String.supertype(&DataType::Int64).is_err());
    }
}
