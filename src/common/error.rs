//! Error handling for the facet engine

use thiserror::Error;

/// Main error type for facet operations
#[derive(Error, Debug)]
pub enum FacetError {
    /// Column not found, type mismatch in a cast or expression, or join
    /// keys of incompatible types.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Column lengths not equal, empty input where non-empty is required,
    /// or slice bounds violated.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Invalid option or a value outside the target type's domain.
    #[error("Value error: {0}")]
    Value(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violated. Never expected under correct use.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FacetError>;

/// Result type alias for facet operations (alias for Result)
pub type FacetResult<T> = std::result::Result<T, FacetError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_err {
    ($msg:expr) => {
        $crate::common::error::FacetError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::FacetError::Internal(format!($fmt, $($arg)*))
    };
}

/// Macro for creating schema errors
#[macro_export]
macro_rules! schema_err {
    ($msg:expr) => {
        $crate::common::error::FacetError::Schema($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::FacetError::Schema(format!($fmt, $($arg)*))
    };
}

/// Macro for creating shape errors
#[macro_export]
macro_rules! shape_err {
    ($msg:expr) => {
        $crate::common::error::FacetError::Shape($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::FacetError::Shape(format!($fmt, $($arg)*))
    };
}
