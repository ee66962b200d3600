//! facet - In-Memory Columnar DataFrame Engine
//!
//! facet is an in-memory columnar DataFrame engine for interactive
//! analytics: filter, project, group-by, aggregate, join, sort and limit
//! pipelines over tabular data with nullable, typed columns, executed on
//! a data-parallel runtime with an optimizing lazy planner.

pub mod common;
pub mod execution;
pub mod expression;
pub mod extensions;
pub mod frame;
pub mod planner;
pub mod series;
pub mod storage;
pub mod types;

// Re-export common types for convenience
pub use common::{FacetError, FacetResult};

// Re-export the type system for convenience
pub use types::{AnyValue, DataType, Field, Schema};

// Re-export the columnar substrate for convenience
pub use storage::{ChunkedColumn, PrimitiveChunk, StringChunk, StringChunked, ValidityMask};

// Re-export the frame surface for convenience
pub use frame::{DataFrame, GroupBy};
pub use frame::lazy::{LazyFrame, LazyGroupBy};
pub use series::{Series, SeriesData};

// Re-export the expression builders for convenience
pub use expression::{col, lit, when, AggOp, Expr, Operator, UnaryOperator};

// Re-export execution entry points for convenience
pub use execution::{JoinType, SortOptions};

// Re-export plan types for convenience
pub use planner::{LogicalPlan, Optimizer};

#[cfg(test)]
mod tests {

    #[test]
    fn it_works() {
        let result = 2 + 2;
        assert_eq!(result, 4);
    }
}
