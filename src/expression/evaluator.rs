//! Expression evaluation
//!
//! Row-context evaluation turns an expression into a column of the frame's
//! height; group-context evaluation reduces aggregation nodes to one value
//! per group and applies any surrounding arithmetic per group in Float64.

use crate::common::error::{FacetError, FacetResult};
use crate::execution::group_by::GroupMap;
use crate::expression::{AggOp, Expr, Operator, UnaryOperator};
use crate::frame::DataFrame;
use crate::series::aggregate::{
    agg_corr, agg_count, agg_first_last, agg_median, agg_min_max, agg_sum, agg_top_k, stats,
};
use crate::series::{Series, SeriesData};
use crate::storage::{ChunkedColumn, StringChunked};
use crate::types::{AnyValue, DataType};

/// Evaluate an expression against a frame, producing one column of the
/// frame's height
pub fn eval_expr(df: &DataFrame, expr: &Expr) -> FacetResult<Series> {
    match expr {
        Expr::Column(name) => Ok(df.column(name)?.clone()),
        Expr::Literal(value) => broadcast_literal(value, df.height()),
        Expr::BinaryExpr { left, op, right } => {
            let left = eval_expr(df, left)?;
            let right = eval_expr(df, right)?;
            apply_binary(&left, *op, &right)
        }
        Expr::UnaryExpr { op, input } => {
            let input = eval_expr(df, input)?;
            apply_unary(&input, *op)
        }
        Expr::Ternary {
            predicate,
            truthy,
            falsy,
        } => {
            let predicate = eval_expr(df, predicate)?;
            let truthy = eval_expr(df, truthy)?;
            let falsy = eval_expr(df, falsy)?;
            apply_ternary(&predicate, &truthy, &falsy)
        }
        Expr::Alias { input, name } => Ok(eval_expr(df, input)?.with_name(name.clone())),
        Expr::Agg { .. } | Expr::TopK { .. } | Expr::Corr { .. } => Err(FacetError::Schema(
            format!("aggregation expression {} outside a group_by context", expr),
        )),
    }
}

/// Evaluate an aggregation expression against grouped rows, producing one
/// value per group
pub fn eval_grouped(df: &DataFrame, groups: &GroupMap, expr: &Expr) -> FacetResult<Series> {
    let group_ids = &groups.row_group_ids;
    let n_groups = groups.n_groups();
    match expr {
        Expr::Alias { input, name } => Ok(eval_grouped(df, groups, input)?.with_name(name.clone())),
        Expr::Literal(value) => broadcast_literal(value, n_groups),
        Expr::Agg { op, input } => {
            let values = eval_expr(df, input)?;
            match op {
                AggOp::Sum => agg_sum(&values, group_ids, n_groups),
                AggOp::Min => agg_min_max(&values, group_ids, n_groups, false),
                AggOp::Max => agg_min_max(&values, group_ids, n_groups, true),
                AggOp::Count => agg_count(&values, group_ids, n_groups),
                AggOp::Median => agg_median(&values, group_ids, n_groups),
                AggOp::First => agg_first_last(&values, group_ids, n_groups, false),
                AggOp::Last => agg_first_last(&values, group_ids, n_groups, true),
                AggOp::Mean | AggOp::Var | AggOp::Std => {
                    let stats = stats(&values, group_ids, n_groups)?;
                    let column = match op {
                        AggOp::Mean => stats.mean(),
                        AggOp::Var => stats.var(),
                        _ => stats.std(),
                    };
                    Ok(Series::from_data(
                        values.name(),
                        SeriesData::Float64(column),
                    ))
                }
            }
        }
        Expr::TopK { input, k, largest } => {
            let values = eval_expr(df, input)?;
            agg_top_k(&values, group_ids, n_groups, *k, *largest)
        }
        Expr::Corr { left, right } => {
            let left = eval_expr(df, left)?;
            let right = eval_expr(df, right)?;
            agg_corr(&left, &right, group_ids, n_groups)
        }
        // Arithmetic over aggregated scalars runs per group in Float64.
        Expr::BinaryExpr { left, op, right } => {
            let left = eval_grouped(df, groups, left)?;
            let right = eval_grouped(df, groups, right)?;
            if op.is_comparison() || op.is_logical() {
                apply_binary(&left, *op, &right)
            } else {
                apply_binary(&left.cast(DataType::Float64)?, *op, &right.cast(DataType::Float64)?)
            }
        }
        Expr::UnaryExpr { op, input } => {
            let input = eval_grouped(df, groups, input)?;
            apply_unary(&input, *op)
        }
        Expr::Ternary {
            predicate,
            truthy,
            falsy,
        } => {
            let predicate = eval_grouped(df, groups, predicate)?;
            let truthy = eval_grouped(df, groups, truthy)?;
            let falsy = eval_grouped(df, groups, falsy)?;
            apply_ternary(&predicate, &truthy, &falsy)
        }
        Expr::Column(name) => Err(FacetError::Schema(format!(
            "column \"{}\" used in an aggregation without an aggregate function",
            name
        ))),
    }
}

/// Materialize a literal as a constant column
fn broadcast_literal(value: &AnyValue, len: usize) -> FacetResult<Series> {
    let values = vec![value.clone(); len];
    series_from_any_values("literal", &values, value.dtype())
}

/// Build a typed series out of dynamic values of a known type
pub fn series_from_any_values(
    name: &str,
    values: &[AnyValue],
    dtype: DataType,
) -> FacetResult<Series> {
    macro_rules! collect_int {
        ($variant:ident, $native:ty) => {{
            let items: Vec<Option<$native>> = values
                .iter()
                .map(|v| v.to_i64().map(|x| x as $native))
                .collect();
            SeriesData::$variant(ChunkedColumn::from_options(&items))
        }};
    }
    let data = match dtype {
        DataType::Boolean => {
            let items: Vec<Option<bool>> = values
                .iter()
                .map(|v| match v {
                    AnyValue::Boolean(b) => Some(*b),
                    _ => None,
                })
                .collect();
            SeriesData::Boolean(ChunkedColumn::from_options(&items))
        }
        DataType::Int8 => collect_int!(Int8, i8),
        DataType::Int16 => collect_int!(Int16, i16),
        DataType::Int32 => collect_int!(Int32, i32),
        DataType::Int64 => collect_int!(Int64, i64),
        DataType::UInt8 => collect_int!(UInt8, u8),
        DataType::UInt16 => collect_int!(UInt16, u16),
        DataType::UInt32 => collect_int!(UInt32, u32),
        DataType::UInt64 => {
            let items: Vec<Option<u64>> = values
                .iter()
                .map(|v| match v {
                    AnyValue::UInt64(x) => Some(*x),
                    other => other.to_i64().map(|x| x as u64),
                })
                .collect();
            SeriesData::UInt64(ChunkedColumn::from_options(&items))
        }
        DataType::Float32 => {
            let items: Vec<Option<f32>> =
                values.iter().map(|v| v.to_f64().map(|x| x as f32)).collect();
            SeriesData::Float32(ChunkedColumn::from_options(&items))
        }
        DataType::Float64 => {
            let items: Vec<Option<f64>> = values.iter().map(|v| v.to_f64()).collect();
            SeriesData::Float64(ChunkedColumn::from_options(&items))
        }
        DataType::String => {
            let items: Vec<Option<&str>> = values.iter().map(|v| v.as_str()).collect();
            SeriesData::String(StringChunked::from_strs(items.into_iter()))
        }
        DataType::Binary => {
            let items: Vec<Option<&[u8]>> = values
                .iter()
                .map(|v| match v {
                    AnyValue::Binary(bytes) => Some(bytes.as_slice()),
                    _ => None,
                })
                .collect();
            SeriesData::Binary(StringChunked::from_bytes(items.into_iter()))
        }
        DataType::Date => collect_int!(Date, i32),
        DataType::Time => collect_int!(Time, i64),
        DataType::Datetime => collect_int!(Datetime, i64),
        DataType::Duration => collect_int!(Duration, i64),
        DataType::List => {
            let items: Vec<Option<Vec<AnyValue>>> = values
                .iter()
                .map(|v| match v {
                    AnyValue::List(items) => Some(items.clone()),
                    _ => None,
                })
                .collect();
            SeriesData::List(crate::series::ListColumn::new(items))
        }
        DataType::Null => SeriesData::Null(values.len()),
        DataType::Unknown => {
            return Err(FacetError::Schema(
                "cannot build a column of unknown type".to_string(),
            ))
        }
    };
    Ok(Series::from_data(name, data))
}

// ---------------------------------------------------------------------------
// Binary operators

pub fn apply_binary(left: &Series, op: Operator, right: &Series) -> FacetResult<Series> {
    if left.len() != right.len() {
        return Err(FacetError::Shape(format!(
            "operands of {} have lengths {} and {}",
            op,
            left.len(),
            right.len()
        )));
    }
    if op.is_logical() {
        return apply_logical(left, op, right);
    }
    if op.is_comparison() {
        return apply_comparison(left, op, right);
    }
    apply_arithmetic(left, op, right)
}

fn apply_logical(left: &Series, op: Operator, right: &Series) -> FacetResult<Series> {
    let left_col = left.bool_data()?;
    let right_col = right.bool_data()?;
    // Three-valued logic: false dominates and, true dominates or.
    let values: Vec<Option<bool>> = left_col
        .iter()
        .zip(right_col.iter())
        .map(|(a, b)| match op {
            Operator::And => match (a, b) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            _ => match (a, b) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
        })
        .collect();
    Ok(Series::from_data(
        left.name(),
        SeriesData::Boolean(ChunkedColumn::from_options(&values)),
    ))
}

fn compare_outcome(op: Operator, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        Operator::Eq => ordering == Equal,
        Operator::NotEq => ordering != Equal,
        Operator::Lt => ordering == Less,
        Operator::LtEq => ordering != Greater,
        Operator::Gt => ordering == Greater,
        Operator::GtEq => ordering != Less,
        _ => unreachable!("not a comparison"),
    }
}

fn apply_comparison(left: &Series, op: Operator, right: &Series) -> FacetResult<Series> {
    let values: Vec<Option<bool>> = match (left.dtype(), right.dtype()) {
        (DataType::String, DataType::String) | (DataType::Binary, DataType::Binary) => {
            let left_col = left.str_data()?;
            let right_col = right.str_data()?;
            left_col
                .iter()
                .zip(right_col.iter())
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => Some(compare_outcome(op, a.cmp(b))),
                    _ => None,
                })
                .collect()
        }
        (DataType::Boolean, DataType::Boolean) => {
            let left_col = left.bool_data()?;
            let right_col = right.bool_data()?;
            left_col
                .iter()
                .zip(right_col.iter())
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => Some(compare_outcome(op, a.cmp(&b))),
                    _ => None,
                })
                .collect()
        }
        (l, r) => {
            let common = l.supertype(&r).map_err(|_| {
                FacetError::Schema(format!("cannot compare {} with {}", l, r))
            })?;
            if common.is_float() || common == DataType::Null {
                let (a_values, a_validity) = left.cast(DataType::Float64)?.numeric_f64()?;
                let (b_values, b_validity) = right.cast(DataType::Float64)?.numeric_f64()?;
                (0..a_values.len())
                    .map(|i| {
                        let a_ok = a_validity.as_ref().is_none_or(|v| v[i]);
                        let b_ok = b_validity.as_ref().is_none_or(|v| v[i]);
                        if a_ok && b_ok {
                            a_values[i]
                                .partial_cmp(&b_values[i])
                                .map(|ordering| compare_outcome(op, ordering))
                        } else {
                            None
                        }
                    })
                    .collect()
            } else {
                let a = dense_i64_lossless(left)?;
                let b = dense_i64_lossless(right)?;
                a.iter()
                    .zip(&b)
                    .map(|(a, b)| match (a, b) {
                        (Some(a), Some(b)) => Some(compare_outcome(op, a.cmp(b))),
                        _ => None,
                    })
                    .collect()
            }
        }
    };
    Ok(Series::from_data(
        left.name(),
        SeriesData::Boolean(ChunkedColumn::from_options(&values)),
    ))
}

/// Integer comparison proxy: exact for every integer and temporal type
/// except UInt64 values above i64::MAX, which fail the conversion
fn dense_i64_lossless(series: &Series) -> FacetResult<Vec<Option<i64>>> {
    Ok((0..series.len())
        .map(|row| series.data().get(row).to_i64())
        .collect())
}

fn apply_arithmetic(left: &Series, op: Operator, right: &Series) -> FacetResult<Series> {
    let out_dtype = crate::expression::arithmetic_dtype(left.dtype(), right.dtype(), op)?;

    if out_dtype.is_float() || out_dtype == DataType::Null {
        let (a_values, a_validity) = left.cast(DataType::Float64)?.numeric_f64()?;
        let (b_values, b_validity) = right.cast(DataType::Float64)?.numeric_f64()?;
        let values: Vec<Option<f64>> = (0..a_values.len())
            .map(|i| {
                let a_ok = a_validity.as_ref().is_none_or(|v| v[i]);
                let b_ok = b_validity.as_ref().is_none_or(|v| v[i]);
                if !(a_ok && b_ok) {
                    return None;
                }
                let (a, b) = (a_values[i], b_values[i]);
                Some(match op {
                    Operator::Plus => a + b,
                    Operator::Minus => a - b,
                    Operator::Multiply => a * b,
                    // IEEE semantics: division by zero is inf/NaN.
                    Operator::Divide => a / b,
                    Operator::Modulo => a % b,
                    _ => unreachable!("not arithmetic"),
                })
            })
            .collect();
        let result = Series::from_data(
            left.name(),
            SeriesData::Float64(ChunkedColumn::from_options(&values)),
        );
        return if out_dtype == DataType::Float64 || out_dtype == DataType::Null {
            Ok(result)
        } else {
            result.cast(out_dtype)
        };
    }

    // Integer family: compute in i64, divide-by-zero is null, cast back to
    // the widened output type.
    let a = dense_i64_lossless(left)?;
    let b = dense_i64_lossless(right)?;
    let values: Vec<Option<i64>> = a
        .iter()
        .zip(&b)
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => match op {
                Operator::Plus => Some(a + b),
                Operator::Minus => Some(a - b),
                Operator::Multiply => Some(a * b),
                Operator::Divide => {
                    if *b == 0 {
                        None
                    } else {
                        Some(a / b)
                    }
                }
                Operator::Modulo => {
                    if *b == 0 {
                        None
                    } else {
                        Some(a % b)
                    }
                }
                _ => unreachable!("not arithmetic"),
            },
            _ => None,
        })
        .collect();
    let result = Series::from_data(
        left.name(),
        SeriesData::Int64(ChunkedColumn::from_options(&values)),
    );
    if out_dtype == DataType::Int64 {
        Ok(result)
    } else {
        result.cast(out_dtype)
    }
}

// ---------------------------------------------------------------------------
// Unary operators

fn apply_unary(input: &Series, op: UnaryOperator) -> FacetResult<Series> {
    match op {
        UnaryOperator::Not => {
            let col = input.bool_data()?;
            let values: Vec<Option<bool>> = col.iter().map(|v| v.map(|b| !b)).collect();
            Ok(Series::from_data(
                input.name(),
                SeriesData::Boolean(ChunkedColumn::from_options(&values)),
            ))
        }
        UnaryOperator::Neg => {
            if !input.dtype().is_numeric() {
                return Err(FacetError::Schema(format!(
                    "cannot negate series \"{}\" of type {}",
                    input.name(),
                    input.dtype()
                )));
            }
            if input.dtype().is_float() {
                let (values, validity) = input.numeric_f64()?;
                let negated: Vec<Option<f64>> = (0..values.len())
                    .map(|i| validity.as_ref().is_none_or(|v| v[i]).then(|| -values[i]))
                    .collect();
                let result = Series::from_data(
                    input.name(),
                    SeriesData::Float64(ChunkedColumn::from_options(&negated)),
                );
                return result.cast(input.dtype());
            }
            let values = dense_i64_lossless(input)?;
            let negated: Vec<Option<i64>> = values.iter().map(|v| v.map(|x| -x)).collect();
            let result = Series::from_data(
                input.name(),
                SeriesData::Int64(ChunkedColumn::from_options(&negated)),
            );
            result.cast(input.dtype())
        }
        UnaryOperator::IsNull => {
            let values: Vec<bool> = (0..input.len()).map(|row| !input.is_valid(row)).collect();
            Ok(Series::from_data(
                input.name(),
                SeriesData::Boolean(ChunkedColumn::from_slice(&values, None)),
            ))
        }
        UnaryOperator::IsNotNull => {
            let values: Vec<bool> = (0..input.len()).map(|row| input.is_valid(row)).collect();
            Ok(Series::from_data(
                input.name(),
                SeriesData::Boolean(ChunkedColumn::from_slice(&values, None)),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Conditional

fn apply_ternary(predicate: &Series, truthy: &Series, falsy: &Series) -> FacetResult<Series> {
    let mask = predicate.bool_data()?;
    let common = truthy.dtype().supertype(&falsy.dtype())?;
    let truthy = truthy.cast(common)?;
    let falsy = falsy.cast(common)?;

    let values: Vec<AnyValue> = mask
        .iter()
        .enumerate()
        .map(|(row, keep)| {
            // A null predicate selects the fallback branch.
            if matches!(keep, Some(true)) {
                truthy.data().get(row)
            } else {
                falsy.data().get(row)
            }
        })
        .collect();
    series_from_any_values(truthy.name(), &values, common)
}
