//! Plan executor
//!
//! A bottom-up interpreter over the optimized logical plan: leaves
//! materialize their source, every other node maps onto the eager
//! kernels, and the final frame is the only thing that outlives the
//! evaluation. Plan evaluation is sequential across operators;
//! concurrency happens inside the kernels.

use crate::common::error::{FacetError, FacetResult};
use crate::expression::evaluator::eval_expr;
use crate::frame::DataFrame;
use crate::planner::logical_plan::{LogicalPlan, ScanSource};
use log::debug;

/// Evaluate an optimized plan into a concrete frame
pub fn execute_plan(plan: &LogicalPlan) -> FacetResult<DataFrame> {
    match plan {
        LogicalPlan::Scan {
            source,
            pushed_columns,
            pushed_filters,
            ..
        } => {
            let mut df = match source {
                ScanSource::Frame(df) => match pushed_columns {
                    Some(columns) => df.select(columns)?,
                    None => df.clone(),
                },
                ScanSource::Csv { path, options } => {
                    let mut options = options.clone();
                    if let Some(columns) = pushed_columns {
                        options.columns = Some(columns.clone());
                    }
                    crate::extensions::csv_reader::read_csv(path, &options)?
                }
                ScanSource::Json { path, options } => {
                    let mut options = options.clone();
                    if let Some(columns) = pushed_columns {
                        options.columns = Some(columns.clone());
                    }
                    crate::extensions::json_reader::read_ndjson(path, &options)?
                }
            };
            for predicate in pushed_filters {
                df = df.filter(predicate)?;
            }
            debug!("scan produced {} rows", df.height());
            Ok(df)
        }
        LogicalPlan::Filter { input, predicate } => {
            let df = execute_plan(input)?;
            df.filter(predicate)
        }
        LogicalPlan::Project { input, exprs } => {
            let df = execute_plan(input)?;
            let columns = exprs
                .iter()
                .map(|expr| {
                    Ok(eval_expr(&df, expr)
                        .map_err(|e| {
                            FacetError::Schema(format!("select({}): {}", expr, e))
                        })?
                        .with_name(expr.output_name()))
                })
                .collect::<FacetResult<Vec<_>>>()?;
            DataFrame::new(columns)
        }
        LogicalPlan::GroupBy { input, keys, aggs } => {
            let df = execute_plan(input)?;
            df.group_by(keys)?.agg(aggs)
        }
        LogicalPlan::Join {
            left,
            right,
            left_on,
            right_on,
            how,
        } => {
            let left_df = execute_plan(left)?;
            let right_df = execute_plan(right)?;
            left_df.join(&right_df, left_on, right_on, *how)
        }
        LogicalPlan::Sort {
            input,
            by,
            descending,
        } => {
            let df = execute_plan(input)?;
            df.sort(by, descending)
        }
        LogicalPlan::Limit { input, n } => {
            let df = execute_plan(input)?;
            Ok(df.head(*n))
        }
    }
}
