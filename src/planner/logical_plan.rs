//! Logical plan representation
//!
//! Plan nodes describe what to compute without prescribing how. The
//! output schema of every node is derivable without touching data, and
//! generic traversal goes through `children` / `with_children`.

use crate::common::error::{FacetError, FacetResult};
use crate::execution::join::JoinType;
use crate::expression::Expr;
use crate::extensions::csv_reader::CsvReadOptions;
use crate::extensions::json_reader::JsonReadOptions;
use crate::frame::DataFrame;
use crate::types::{Field, Schema};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Where a scan reads its rows from
#[derive(Debug, Clone)]
pub enum ScanSource {
    /// An in-memory frame
    Frame(DataFrame),
    /// A CSV file read through the csv reader
    Csv {
        path: PathBuf,
        options: CsvReadOptions,
    },
    /// A newline-delimited JSON file
    Json {
        path: PathBuf,
        options: JsonReadOptions,
    },
}

/// Logical plan node kinds
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// Produce rows from a source, after source-side column and filter
    /// pushdown
    Scan {
        source: ScanSource,
        /// Full source schema, before column pushdown
        schema: Schema,
        /// Columns the source should produce; None means all
        pushed_columns: Option<Vec<String>>,
        /// Predicates the source evaluates while scanning
        pushed_filters: Vec<Expr>,
    },
    Filter {
        input: Box<LogicalPlan>,
        predicate: Expr,
    },
    Project {
        input: Box<LogicalPlan>,
        exprs: Vec<Expr>,
    },
    GroupBy {
        input: Box<LogicalPlan>,
        keys: Vec<String>,
        aggs: Vec<Expr>,
    },
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        left_on: Vec<String>,
        right_on: Vec<String>,
        how: JoinType,
    },
    Sort {
        input: Box<LogicalPlan>,
        by: Vec<String>,
        descending: Vec<bool>,
    },
    Limit {
        input: Box<LogicalPlan>,
        n: usize,
    },
}

impl LogicalPlan {
    /// Derive the output schema without data
    pub fn schema(&self) -> FacetResult<Schema> {
        match self {
            LogicalPlan::Scan {
                schema,
                pushed_columns,
                ..
            } => match pushed_columns {
                None => Ok(schema.clone()),
                Some(columns) => columns
                    .iter()
                    .map(|name| {
                        schema
                            .iter()
                            .find(|field| &field.name == name)
                            .cloned()
                            .ok_or_else(|| {
                                FacetError::Schema(format!("column \"{}\" not found", name))
                            })
                    })
                    .collect(),
            },
            LogicalPlan::Filter { input, .. } => input.schema(),
            LogicalPlan::Project { input, exprs } => {
                let input_schema = input.schema()?;
                exprs
                    .iter()
                    .map(|expr| {
                        Ok(Field::new(expr.output_name(), expr.dtype(&input_schema)?))
                    })
                    .collect()
            }
            LogicalPlan::GroupBy { input, keys, aggs } => {
                let input_schema = input.schema()?;
                let mut fields = Vec::with_capacity(keys.len() + aggs.len());
                for key in keys {
                    let field = input_schema
                        .iter()
                        .find(|field| &field.name == key)
                        .cloned()
                        .ok_or_else(|| {
                            FacetError::Schema(format!("column \"{}\" not found", key))
                        })?;
                    fields.push(field);
                }
                for agg in aggs {
                    fields.push(Field::new(agg.output_name(), agg.dtype(&input_schema)?));
                }
                Ok(fields)
            }
            LogicalPlan::Join {
                left,
                right,
                left_on,
                right_on,
                how,
            } => {
                let left_schema = left.schema()?;
                if *how == JoinType::Semi || *how == JoinType::Anti {
                    return Ok(left_schema);
                }
                let right_schema = right.schema()?;
                let mut fields = left_schema.clone();
                for field in &right_schema {
                    let key_pair = right_on.iter().position(|name| name == &field.name);
                    if let Some(pair) = key_pair {
                        if left_on[pair] == field.name {
                            continue;
                        }
                    }
                    if left_schema.iter().any(|l| l.name == field.name) {
                        fields.push(Field::new(format!("{}_right", field.name), field.dtype));
                    } else {
                        fields.push(field.clone());
                    }
                }
                Ok(fields)
            }
            LogicalPlan::Sort { input, .. } => input.schema(),
            LogicalPlan::Limit { input, .. } => input.schema(),
        }
    }

    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Scan { .. } => vec![],
            LogicalPlan::Filter { input, .. } => vec![input],
            LogicalPlan::Project { input, .. } => vec![input],
            LogicalPlan::GroupBy { input, .. } => vec![input],
            LogicalPlan::Join { left, right, .. } => vec![left, right],
            LogicalPlan::Sort { input, .. } => vec![input],
            LogicalPlan::Limit { input, .. } => vec![input],
        }
    }

    /// Rebuild the node with replacement children, in `children()` order
    pub fn with_children(&self, mut children: Vec<LogicalPlan>) -> LogicalPlan {
        match self {
            LogicalPlan::Scan { .. } => self.clone(),
            LogicalPlan::Filter { predicate, .. } => LogicalPlan::Filter {
                input: Box::new(children.remove(0)),
                predicate: predicate.clone(),
            },
            LogicalPlan::Project { exprs, .. } => LogicalPlan::Project {
                input: Box::new(children.remove(0)),
                exprs: exprs.clone(),
            },
            LogicalPlan::GroupBy { keys, aggs, .. } => LogicalPlan::GroupBy {
                input: Box::new(children.remove(0)),
                keys: keys.clone(),
                aggs: aggs.clone(),
            },
            LogicalPlan::Join {
                left_on,
                right_on,
                how,
                ..
            } => {
                let left = children.remove(0);
                let right = children.remove(0);
                LogicalPlan::Join {
                    left: Box::new(left),
                    right: Box::new(right),
                    left_on: left_on.clone(),
                    right_on: right_on.clone(),
                    how: *how,
                }
            }
            LogicalPlan::Sort { by, descending, .. } => LogicalPlan::Sort {
                input: Box::new(children.remove(0)),
                by: by.clone(),
                descending: descending.clone(),
            },
            LogicalPlan::Limit { n, .. } => LogicalPlan::Limit {
                input: Box::new(children.remove(0)),
                n: *n,
            },
        }
    }

    /// Indented plan rendering for `explain`
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, 0);
        out
    }

    fn describe_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        match self {
            LogicalPlan::Scan {
                source,
                pushed_columns,
                pushed_filters,
                ..
            } => {
                let source_name = match source {
                    ScanSource::Frame(df) => format!("frame[{}x{}]", df.height(), df.width()),
                    ScanSource::Csv { path, .. } => format!("csv[{}]", path.display()),
                    ScanSource::Json { path, .. } => format!("json[{}]", path.display()),
                };
                let _ = write!(out, "{}SCAN {}", pad, source_name);
                if let Some(columns) = pushed_columns {
                    let _ = write!(out, " columns=[{}]", columns.join(", "));
                }
                if !pushed_filters.is_empty() {
                    let rendered: Vec<String> =
                        pushed_filters.iter().map(|f| f.to_string()).collect();
                    let _ = write!(out, " filters=[{}]", rendered.join(", "));
                }
                out.push('\n');
            }
            LogicalPlan::Filter { input, predicate } => {
                let _ = writeln!(out, "{}FILTER {}", pad, predicate);
                input.describe_into(out, depth + 1);
            }
            LogicalPlan::Project { input, exprs } => {
                let rendered: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                let _ = writeln!(out, "{}PROJECT [{}]", pad, rendered.join(", "));
                input.describe_into(out, depth + 1);
            }
            LogicalPlan::GroupBy { input, keys, aggs } => {
                let rendered: Vec<String> = aggs.iter().map(|e| e.to_string()).collect();
                let _ = writeln!(
                    out,
                    "{}GROUP BY [{}] agg [{}]",
                    pad,
                    keys.join(", "),
                    rendered.join(", ")
                );
                input.describe_into(out, depth + 1);
            }
            LogicalPlan::Join {
                left,
                right,
                left_on,
                right_on,
                how,
            } => {
                let _ = writeln!(
                    out,
                    "{}JOIN[{}] left_on=[{}] right_on=[{}]",
                    pad,
                    how,
                    left_on.join(", "),
                    right_on.join(", ")
                );
                left.describe_into(out, depth + 1);
                right.describe_into(out, depth + 1);
            }
            LogicalPlan::Sort {
                input,
                by,
                descending,
            } => {
                let keys: Vec<String> = by
                    .iter()
                    .zip(descending)
                    .map(|(name, desc)| {
                        format!("{}{}", name, if *desc { " desc" } else { "" })
                    })
                    .collect();
                let _ = writeln!(out, "{}SORT [{}]", pad, keys.join(", "));
                input.describe_into(out, depth + 1);
            }
            LogicalPlan::Limit { input, n } => {
                let _ = writeln!(out, "{}LIMIT {}", pad, n);
                input.describe_into(out, depth + 1);
            }
        }
    }
}

/// Scan node over an in-memory frame
pub fn scan_frame(df: DataFrame) -> LogicalPlan {
    let schema = df.schema();
    LogicalPlan::Scan {
        source: ScanSource::Frame(df),
        schema,
        pushed_columns: None,
        pushed_filters: Vec::new(),
    }
}

/// Scan node over a CSV file. The schema is inferred up front so that
/// plan schemas stay derivable without re-reading data at optimize time.
pub fn scan_csv(path: impl Into<PathBuf>, options: CsvReadOptions) -> FacetResult<LogicalPlan> {
    let path = path.into();
    let schema = crate::extensions::csv_reader::infer_schema(&path, &options)?;
    Ok(LogicalPlan::Scan {
        source: ScanSource::Csv { path, options },
        schema,
        pushed_columns: None,
        pushed_filters: Vec::new(),
    })
}

/// Scan node over a newline-delimited JSON file
pub fn scan_json(path: impl Into<PathBuf>, options: JsonReadOptions) -> FacetResult<LogicalPlan> {
    let path = path.into();
    let schema = crate::extensions::json_reader::infer_schema(&path, &options)?;
    Ok(LogicalPlan::Scan {
        source: ScanSource::Json { path, options },
        schema,
        pushed_columns: None,
        pushed_filters: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{col, lit};
    use crate::series::Series;
    use crate::types::DataType;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("a", &[1i64, 2]),
            Series::new("b", &[1.0f64, 2.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_scan_schema() {
        let plan = scan_frame(frame());
        let schema = plan.schema().unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0], Field::new("a", DataType::Int64));
    }

    #[test]
    fn test_project_schema_derivation() {
        let plan = LogicalPlan::Project {
            input: Box::new(scan_frame(frame())),
            exprs: vec![col("a"), (col("a") + col("b")).alias("c")],
        };
        let schema = plan.schema().unwrap();
        assert_eq!(schema[0], Field::new("a", DataType::Int64));
        assert_eq!(schema[1], Field::new("c", DataType::Float64));
    }

    #[test]
    fn test_group_by_schema() {
        let plan = LogicalPlan::GroupBy {
            input: Box::new(scan_frame(frame())),
            keys: vec!["a".to_string()],
            aggs: vec![col("b").sum().alias("total"), col("b").count().alias("n")],
        };
        let schema = plan.schema().unwrap();
        assert_eq!(schema[0], Field::new("a", DataType::Int64));
        assert_eq!(schema[1], Field::new("total", DataType::Float64));
        assert_eq!(schema[2], Field::new("n", DataType::Int64));
    }

    #[test]
    fn test_join_schema_suffixes() {
        let plan = LogicalPlan::Join {
            left: Box::new(scan_frame(frame())),
            right: Box::new(scan_frame(frame())),
            left_on: vec!["a".to_string()],
            right_on: vec!["a".to_string()],
            how: JoinType::Inner,
        };
        let schema = plan.schema().unwrap();
        let names: Vec<&str> = schema.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "b_right"]);
    }

    #[test]
    fn test_with_children_round_trip() {
        let plan = LogicalPlan::Filter {
            input: Box::new(scan_frame(frame())),
            predicate: col("a").gt(lit(0i64)),
        };
        let children: Vec<LogicalPlan> = plan.children().into_iter().cloned().collect();
        let rebuilt = plan.with_children(children);
        assert_eq!(plan.describe(), rebuilt.describe());
    }
}
