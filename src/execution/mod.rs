//! Execution kernels and the parallel runtime

pub mod aggregate;
pub mod executor;
pub mod filter;
pub mod group_by;
pub mod hash;
pub mod hash_table;
pub mod join;
pub mod parallel;
pub mod sort;
pub mod take;

pub use executor::execute_plan;
pub use group_by::GroupMap;
pub use join::{JoinResult, JoinType};
pub use parallel::{join2, max_threads, parallel_for, should_parallel};
pub use sort::SortOptions;
