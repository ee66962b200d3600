//! Expression model
//!
//! A value expression is a closed tree of column references, literals,
//! binary and unary operators, aggregations and conditionals. Each node
//! derives its output type from the input schema without touching data;
//! evaluation lives in [`evaluator`].

pub mod evaluator;

use crate::common::error::{FacetError, FacetResult};
use crate::types::{AnyValue, DataType, Schema};
use std::collections::BTreeSet;
use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl Operator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::NotEq
                | Operator::Lt
                | Operator::LtEq
                | Operator::Gt
                | Operator::GtEq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::And => "and",
            Operator::Or => "or",
        };
        write!(f, "{}", symbol)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

/// Aggregation operators with a single column input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Sum,
    Mean,
    Min,
    Max,
    Count,
    Std,
    Var,
    Median,
    First,
    Last,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggOp::Sum => "sum",
            AggOp::Mean => "mean",
            AggOp::Min => "min",
            AggOp::Max => "max",
            AggOp::Count => "count",
            AggOp::Std => "std",
            AggOp::Var => "var",
            AggOp::Median => "median",
            AggOp::First => "first",
            AggOp::Last => "last",
        };
        write!(f, "{}", name)
    }
}

/// A value expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(AnyValue),
    BinaryExpr {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    UnaryExpr {
        op: UnaryOperator,
        input: Box<Expr>,
    },
    Agg {
        op: AggOp,
        input: Box<Expr>,
    },
    TopK {
        input: Box<Expr>,
        k: usize,
        largest: bool,
    },
    Corr {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        predicate: Box<Expr>,
        truthy: Box<Expr>,
        falsy: Box<Expr>,
    },
    Alias {
        input: Box<Expr>,
        name: String,
    },
}

/// Column reference
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Literal value
pub fn lit(value: impl Into<AnyValue>) -> Expr {
    Expr::Literal(value.into())
}

/// Start of a conditional chain: `when(pred).then(a).otherwise(b)`
pub fn when(predicate: Expr) -> When {
    When { predicate }
}

/// Partial conditional holding the predicate
pub struct When {
    predicate: Expr,
}

impl When {
    pub fn then(self, value: Expr) -> Then {
        Then {
            branches: vec![(self.predicate, value)],
        }
    }
}

/// Partial conditional holding completed branches
pub struct Then {
    branches: Vec<(Expr, Expr)>,
}

impl Then {
    /// Chain another predicate branch
    pub fn when(self, predicate: Expr) -> ChainedWhen {
        ChainedWhen {
            branches: self.branches,
            predicate,
        }
    }

    /// Close the chain with the fallback value
    pub fn otherwise(self, fallback: Expr) -> Expr {
        // Fold branches right to left into nested ternaries.
        self.branches
            .into_iter()
            .rev()
            .fold(fallback, |acc, (predicate, value)| Expr::Ternary {
                predicate: Box::new(predicate),
                truthy: Box::new(value),
                falsy: Box::new(acc),
            })
    }
}

/// Mid-chain predicate awaiting its value
pub struct ChainedWhen {
    branches: Vec<(Expr, Expr)>,
    predicate: Expr,
}

impl ChainedWhen {
    pub fn then(mut self, value: Expr) -> Then {
        self.branches.push((self.predicate, value));
        Then {
            branches: self.branches,
        }
    }
}

macro_rules! binary_method {
    ($method:ident, $op:ident) => {
        pub fn $method(self, other: Expr) -> Expr {
            Expr::BinaryExpr {
                left: Box::new(self),
                op: Operator::$op,
                right: Box::new(other),
            }
        }
    };
}

macro_rules! agg_method {
    ($method:ident, $op:ident) => {
        pub fn $method(self) -> Expr {
            Expr::Agg {
                op: AggOp::$op,
                input: Box::new(self),
            }
        }
    };
}

impl Expr {
    binary_method!(eq, Eq);
    binary_method!(neq, NotEq);
    binary_method!(lt, Lt);
    binary_method!(lt_eq, LtEq);
    binary_method!(gt, Gt);
    binary_method!(gt_eq, GtEq);
    binary_method!(and, And);
    binary_method!(or, Or);

    agg_method!(sum, Sum);
    agg_method!(mean, Mean);
    agg_method!(min, Min);
    agg_method!(max, Max);
    agg_method!(count, Count);
    agg_method!(std, Std);
    agg_method!(var, Var);
    agg_method!(median, Median);
    agg_method!(first, First);
    agg_method!(last, Last);

    pub fn not(self) -> Expr {
        Expr::UnaryExpr {
            op: UnaryOperator::Not,
            input: Box::new(self),
        }
    }

    pub fn neg(self) -> Expr {
        Expr::UnaryExpr {
            op: UnaryOperator::Neg,
            input: Box::new(self),
        }
    }

    pub fn is_null(self) -> Expr {
        Expr::UnaryExpr {
            op: UnaryOperator::IsNull,
            input: Box::new(self),
        }
    }

    pub fn is_not_null(self) -> Expr {
        Expr::UnaryExpr {
            op: UnaryOperator::IsNotNull,
            input: Box::new(self),
        }
    }

    /// The k largest (or smallest) values per group
    pub fn top_k(self, k: usize, largest: bool) -> Expr {
        Expr::TopK {
            input: Box::new(self),
            k,
            largest,
        }
    }

    /// Pearson correlation with another column, per group
    pub fn corr(self, other: Expr) -> Expr {
        Expr::Corr {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias {
            input: Box::new(self),
            name: name.into(),
        }
    }

    /// The name the evaluated column carries when no alias overrides it
    pub fn output_name(&self) -> String {
        match self {
            Expr::Column(name) => name.clone(),
            Expr::Literal(_) => "literal".to_string(),
            Expr::BinaryExpr { left, .. } => left.output_name(),
            Expr::UnaryExpr { input, .. } => input.output_name(),
            Expr::Agg { input, .. } => input.output_name(),
            Expr::TopK { input, .. } => input.output_name(),
            Expr::Corr { left, .. } => left.output_name(),
            Expr::Ternary { truthy, .. } => truthy.output_name(),
            Expr::Alias { name, .. } => name.clone(),
        }
    }

    /// Column names the expression reads
    pub fn root_columns(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Column(name) => {
                out.insert(name.clone());
            }
            Expr::Literal(_) => {}
            Expr::BinaryExpr { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::UnaryExpr { input, .. } => input.collect_columns(out),
            Expr::Agg { input, .. } => input.collect_columns(out),
            Expr::TopK { input, .. } => input.collect_columns(out),
            Expr::Corr { left, right } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Ternary {
                predicate,
                truthy,
                falsy,
            } => {
                predicate.collect_columns(out);
                truthy.collect_columns(out);
                falsy.collect_columns(out);
            }
            Expr::Alias { input, .. } => input.collect_columns(out),
        }
    }

    /// Whether any aggregation node appears in the tree
    pub fn has_agg(&self) -> bool {
        match self {
            Expr::Agg { .. } | Expr::TopK { .. } | Expr::Corr { .. } => true,
            Expr::Column(_) | Expr::Literal(_) => false,
            Expr::BinaryExpr { left, right, .. } => left.has_agg() || right.has_agg(),
            Expr::UnaryExpr { input, .. } => input.has_agg(),
            Expr::Ternary {
                predicate,
                truthy,
                falsy,
            } => predicate.has_agg() || truthy.has_agg() || falsy.has_agg(),
            Expr::Alias { input, .. } => input.has_agg(),
        }
    }

    /// Rewrite column references through a projection's aliases, for
    /// predicate pushdown below a Project
    pub fn rename_columns(&self, mapping: &std::collections::HashMap<String, String>) -> Expr {
        match self {
            Expr::Column(name) => match mapping.get(name) {
                Some(source) => Expr::Column(source.clone()),
                None => self.clone(),
            },
            Expr::Literal(_) => self.clone(),
            Expr::BinaryExpr { left, op, right } => Expr::BinaryExpr {
                left: Box::new(left.rename_columns(mapping)),
                op: *op,
                right: Box::new(right.rename_columns(mapping)),
            },
            Expr::UnaryExpr { op, input } => Expr::UnaryExpr {
                op: *op,
                input: Box::new(input.rename_columns(mapping)),
            },
            Expr::Agg { op, input } => Expr::Agg {
                op: *op,
                input: Box::new(input.rename_columns(mapping)),
            },
            Expr::TopK { input, k, largest } => Expr::TopK {
                input: Box::new(input.rename_columns(mapping)),
                k: *k,
                largest: *largest,
            },
            Expr::Corr { left, right } => Expr::Corr {
                left: Box::new(left.rename_columns(mapping)),
                right: Box::new(right.rename_columns(mapping)),
            },
            Expr::Ternary {
                predicate,
                truthy,
                falsy,
            } => Expr::Ternary {
                predicate: Box::new(predicate.rename_columns(mapping)),
                truthy: Box::new(truthy.rename_columns(mapping)),
                falsy: Box::new(falsy.rename_columns(mapping)),
            },
            Expr::Alias { input, name } => Expr::Alias {
                input: Box::new(input.rename_columns(mapping)),
                name: name.clone(),
            },
        }
    }

    /// Derive the output type against an input schema, without data
    pub fn dtype(&self, schema: &Schema) -> FacetResult<DataType> {
        match self {
            Expr::Column(name) => schema
                .iter()
                .find(|field| &field.name == name)
                .map(|field| field.dtype)
                .ok_or_else(|| FacetError::Schema(format!("column \"{}\" not found", name))),
            Expr::Literal(value) => Ok(value.dtype()),
            Expr::BinaryExpr { left, op, right } => {
                if op.is_comparison() || op.is_logical() {
                    return Ok(DataType::Boolean);
                }
                let left_type = left.dtype(schema)?;
                let right_type = right.dtype(schema)?;
                arithmetic_dtype(left_type, right_type, *op)
            }
            Expr::UnaryExpr { op, input } => match op {
                UnaryOperator::Not => Ok(DataType::Boolean),
                UnaryOperator::Neg => input.dtype(schema),
                UnaryOperator::IsNull | UnaryOperator::IsNotNull => Ok(DataType::Boolean),
            },
            Expr::Agg { op, input } => match op {
                AggOp::Mean | AggOp::Std | AggOp::Var | AggOp::Median => Ok(DataType::Float64),
                AggOp::Count => Ok(DataType::Int64),
                AggOp::Sum | AggOp::Min | AggOp::Max | AggOp::First | AggOp::Last => {
                    input.dtype(schema)
                }
            },
            Expr::TopK { .. } => Ok(DataType::List),
            Expr::Corr { .. } => Ok(DataType::Float64),
            Expr::Ternary { truthy, falsy, .. } => {
                let truthy_type = truthy.dtype(schema)?;
                let falsy_type = falsy.dtype(schema)?;
                truthy_type.supertype(&falsy_type)
            }
            Expr::Alias { input, .. } => input.dtype(schema),
        }
    }
}

/// Widening for arithmetic: any float operand widens to Float64 unless
/// both are Float32; integer pairs keep the wider integer.
pub fn arithmetic_dtype(left: DataType, right: DataType, op: Operator) -> FacetResult<DataType> {
    if !left.is_numeric() && left != DataType::Null {
        return Err(FacetError::Schema(format!(
            "operator {} is not defined for {}",
            op, left
        )));
    }
    if !right.is_numeric() && right != DataType::Null {
        return Err(FacetError::Schema(format!(
            "operator {} is not defined for {}",
            op, right
        )));
    }
    left.supertype(&right)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "col({})", name),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::BinaryExpr { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expr::UnaryExpr { op, input } => match op {
                UnaryOperator::Not => write!(f, "not({})", input),
                UnaryOperator::Neg => write!(f, "-({})", input),
                UnaryOperator::IsNull => write!(f, "{}.is_null()", input),
                UnaryOperator::IsNotNull => write!(f, "{}.is_not_null()", input),
            },
            Expr::Agg { op, input } => write!(f, "{}({})", op, input),
            Expr::TopK { input, k, largest } => {
                write!(f, "top_k({}, {}, largest={})", input, k, largest)
            }
            Expr::Corr { left, right } => write!(f, "corr({}, {})", left, right),
            Expr::Ternary {
                predicate,
                truthy,
                falsy,
            } => write!(f, "when({}) then({}) otherwise({})", predicate, truthy, falsy),
            Expr::Alias { input, name } => write!(f, "{}.alias({})", input, name),
        }
    }
}

macro_rules! impl_expr_op {
    ($trait:ident, $method:ident, $op:ident) => {
        impl std::ops::$trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::BinaryExpr {
                    left: Box::new(self),
                    op: Operator::$op,
                    right: Box::new(rhs),
                }
            }
        }
    };
}

impl_expr_op!(Add, add, Plus);
impl_expr_op!(Sub, sub, Minus);
impl_expr_op!(Mul, mul, Multiply);
impl_expr_op!(Div, div, Divide);
impl_expr_op!(Rem, rem, Modulo);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    fn schema() -> Schema {
        vec![
            Field::new("a", DataType::Int32),
            Field::new("b", DataType::Float64),
            Field::new("s", DataType::String),
        ]
    }

    #[test]
    fn test_dtype_derivation() {
        let schema = schema();
        assert_eq!(col("a").dtype(&schema).unwrap(), DataType::Int32);
        assert_eq!(
            (col("a") + col("a")).dtype(&schema).unwrap(),
            DataType::Int32
        );
        assert_eq!(
            (col("a") * col("b")).dtype(&schema).unwrap(),
            DataType::Float64
        );
        assert_eq!(
            col("a").gt(lit(0i64)).dtype(&schema).unwrap(),
            DataType::Boolean
        );
        assert_eq!(col("a").mean().dtype(&schema).unwrap(), DataType::Float64);
        assert_eq!(col("a").count().dtype(&schema).unwrap(), DataType::Int64);
        assert_eq!(col("a").sum().dtype(&schema).unwrap(), DataType::Int32);
        assert_eq!(
            col("a").top_k(3, true).dtype(&schema).unwrap(),
            DataType::List
        );
    }

    #[test]
    fn test_dtype_errors() {
        let schema = schema();
        assert!(col("missing").dtype(&schema).is_err());
        assert!((col("s") + col("a")).dtype(&schema).is_err());
    }

    #[test]
    fn test_output_name_and_alias() {
        assert_eq!(col("a").sum().output_name(), "a");
        assert_eq!(col("a").sum().alias("total").output_name(), "total");
        assert_eq!((col("a") + col("b")).output_name(), "a");
    }

    #[test]
    fn test_root_columns() {
        let expr = (col("a") + col("b")).gt(lit(1i64)).and(col("c").is_null());
        let columns: Vec<String> = expr.root_columns().into_iter().collect();
        assert_eq!(columns, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_has_agg() {
        assert!(!col("a").has_agg());
        assert!(col("a").sum().has_agg());
        assert!((col("a").max() - col("b").min()).has_agg());
    }

    #[test]
    fn test_when_chain() {
        let expr = when(col("a").gt(lit(0i64)))
            .then(lit(1i64))
            .when(col("a").lt(lit(0i64)))
            .then(lit(-1i64))
            .otherwise(lit(0i64));
        // Two nested ternaries.
        let Expr::Ternary { falsy, .. } = expr else {
            panic!("expected ternary");
        };
        assert!(matches!(*falsy, Expr::Ternary { .. }));
    }
}
