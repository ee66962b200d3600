//! Type system: logical types and dynamic values

pub mod dtype;
pub mod value;

pub use dtype::{DataType, Field, Schema};
pub use value::AnyValue;
