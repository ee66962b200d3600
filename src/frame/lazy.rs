//! Lazy frames
//!
//! A `LazyFrame` records operations as a logical plan; nothing runs until
//! `collect`, which optimizes the plan and hands it to the executor.

use crate::common::error::FacetResult;
use crate::execution::executor::execute_plan;
use crate::execution::join::JoinType;
use crate::expression::Expr;
use crate::extensions::csv_reader::CsvReadOptions;
use crate::extensions::json_reader::JsonReadOptions;
use crate::frame::DataFrame;
use crate::planner::logical_plan::{scan_csv, scan_frame, scan_json, LogicalPlan};
use crate::planner::optimizer::Optimizer;
use std::path::Path;

/// A deferred computation over a frame
#[derive(Debug, Clone)]
pub struct LazyFrame {
    plan: LogicalPlan,
}

impl DataFrame {
    /// Defer further operations into a logical plan
    pub fn lazy(&self) -> LazyFrame {
        LazyFrame {
            plan: scan_frame(self.clone()),
        }
    }
}

impl LazyFrame {
    /// Lazily scan a CSV file
    pub fn scan_csv(path: impl AsRef<Path>, options: CsvReadOptions) -> FacetResult<LazyFrame> {
        Ok(LazyFrame {
            plan: scan_csv(path.as_ref(), options)?,
        })
    }

    /// Lazily scan a newline-delimited JSON file
    pub fn scan_ndjson(path: impl AsRef<Path>, options: JsonReadOptions) -> FacetResult<LazyFrame> {
        Ok(LazyFrame {
            plan: scan_json(path.as_ref(), options)?,
        })
    }

    /// Wrap an already-built plan
    pub fn from_plan(plan: LogicalPlan) -> LazyFrame {
        LazyFrame { plan }
    }

    pub fn plan(&self) -> &LogicalPlan {
        &self.plan
    }

    pub fn filter(self, predicate: Expr) -> LazyFrame {
        LazyFrame {
            plan: LogicalPlan::Filter {
                input: Box::new(self.plan),
                predicate,
            },
        }
    }

    pub fn select(self, exprs: Vec<Expr>) -> LazyFrame {
        LazyFrame {
            plan: LogicalPlan::Project {
                input: Box::new(self.plan),
                exprs,
            },
        }
    }

    /// Add or replace one column, keeping everything else
    pub fn with_column(self, name: &str, expr: Expr) -> FacetResult<LazyFrame> {
        let schema = self.plan.schema()?;
        let mut exprs: Vec<Expr> = schema
            .iter()
            .filter(|field| field.name != name)
            .map(|field| Expr::Column(field.name.clone()))
            .collect();
        exprs.push(expr.alias(name));
        Ok(self.select(exprs))
    }

    pub fn group_by<S: AsRef<str>>(self, keys: &[S]) -> LazyGroupBy {
        LazyGroupBy {
            input: self.plan,
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
        }
    }

    pub fn join<S: AsRef<str>>(
        self,
        other: LazyFrame,
        left_on: &[S],
        right_on: &[S],
        how: JoinType,
    ) -> LazyFrame {
        LazyFrame {
            plan: LogicalPlan::Join {
                left: Box::new(self.plan),
                right: Box::new(other.plan),
                left_on: left_on.iter().map(|s| s.as_ref().to_string()).collect(),
                right_on: right_on.iter().map(|s| s.as_ref().to_string()).collect(),
                how,
            },
        }
    }

    pub fn sort<S: AsRef<str>>(self, by: &[S], descending: Vec<bool>) -> LazyFrame {
        LazyFrame {
            plan: LogicalPlan::Sort {
                input: Box::new(self.plan),
                by: by.iter().map(|s| s.as_ref().to_string()).collect(),
                descending,
            },
        }
    }

    pub fn limit(self, n: usize) -> LazyFrame {
        LazyFrame {
            plan: LogicalPlan::Limit {
                input: Box::new(self.plan),
                n,
            },
        }
    }

    /// Render the plan as written
    pub fn explain(&self) -> String {
        self.plan.describe()
    }

    /// Render the plan after optimization
    pub fn explain_optimized(&self) -> FacetResult<String> {
        let optimized = Optimizer::new().optimize(self.plan.clone())?;
        Ok(optimized.describe())
    }

    /// Optimize and run the plan
    pub fn collect(&self) -> FacetResult<DataFrame> {
        let optimized = Optimizer::new().optimize(self.plan.clone())?;
        execute_plan(&optimized)
    }
}

/// A lazy frame with pending grouping keys
pub struct LazyGroupBy {
    input: LogicalPlan,
    keys: Vec<String>,
}

impl LazyGroupBy {
    pub fn agg(self, aggs: Vec<Expr>) -> LazyFrame {
        LazyFrame {
            plan: LogicalPlan::GroupBy {
                input: Box::new(self.input),
                keys: self.keys,
                aggs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{col, lit};
    use crate::series::Series;
    use crate::types::AnyValue;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("k", &["a", "b", "a", "b"]),
            Series::new("v", &[1i64, 2, 3, 4]),
        ])
        .unwrap()
    }

    #[test]
    fn test_lazy_matches_eager() {
        let eager = frame().filter(&col("v").gt(lit(1i64))).unwrap();
        let lazy = frame().lazy().filter(col("v").gt(lit(1i64))).collect().unwrap();
        assert!(eager.equals(&lazy));
    }

    #[test]
    fn test_lazy_group_by() {
        let out = frame()
            .lazy()
            .group_by(&["k"])
            .agg(vec![col("v").sum().alias("total")])
            .collect()
            .unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(out.column("total").unwrap().get(0).unwrap(), AnyValue::Int64(4));
        assert_eq!(out.column("total").unwrap().get(1).unwrap(), AnyValue::Int64(6));
    }

    #[test]
    fn test_with_column_keeps_schema_order() {
        let out = frame()
            .lazy()
            .with_column("doubled", col("v") + col("v"))
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(out.columns(), vec!["k", "v", "doubled"]);
    }

    #[test]
    fn test_explain_shows_pushdown() {
        let lazy = frame()
            .lazy()
            .select(vec![col("k"), col("v")])
            .filter(col("v").gt(lit(2i64)));
        let plain = lazy.explain();
        assert!(plain.starts_with("FILTER"));
        let optimized = lazy.explain_optimized().unwrap();
        assert!(optimized.contains("filters=["));
    }

    #[test]
    fn test_limit() {
        let out = frame().lazy().limit(3).collect().unwrap();
        assert_eq!(out.height(), 3);
    }
}
