//! Plan optimizer
//!
//! Rule-driven rewrites applied in a fixed order until no rule fires.
//! Every rule preserves the observable output: row count, column set,
//! and per-cell values and nulls.

use crate::common::error::FacetResult;
use crate::execution::join::JoinType;
use crate::expression::Expr;
use crate::planner::logical_plan::LogicalPlan;
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// A logical rewrite; `rewrite` returns None when the plan is unchanged
pub trait OptimizerRule {
    fn name(&self) -> &'static str;

    fn rewrite(&self, plan: &LogicalPlan) -> FacetResult<Option<LogicalPlan>>;
}

/// The rule pipeline
pub struct Optimizer {
    rules: Vec<Box<dyn OptimizerRule>>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    /// The standard rule set, in application order
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(CombineFilters),
                Box::new(PredicatePushdown),
                Box::new(ProjectionPushdown),
                Box::new(CommonSubexprElimination),
            ],
        }
    }

    /// Apply the rules in order until a full pass changes nothing
    pub fn optimize(&self, plan: LogicalPlan) -> FacetResult<LogicalPlan> {
        const MAX_PASSES: usize = 8;
        let mut plan = plan;
        for _ in 0..MAX_PASSES {
            let mut changed = false;
            for rule in &self.rules {
                if let Some(rewritten) = rule.rewrite(&plan)? {
                    debug!("optimizer rule {} fired", rule.name());
                    plan = rewritten;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        Ok(plan)
    }
}

/// Apply `rewrite` to every child; Some when any child changed
fn rewrite_children<F>(plan: &LogicalPlan, rewrite: &F) -> FacetResult<Option<LogicalPlan>>
where
    F: Fn(&LogicalPlan) -> FacetResult<Option<LogicalPlan>>,
{
    let mut changed = false;
    let mut children = Vec::new();
    for child in plan.children() {
        match rewrite(child)? {
            Some(new_child) => {
                changed = true;
                children.push(new_child);
            }
            None => children.push(child.clone()),
        }
    }
    Ok(changed.then(|| plan.with_children(children)))
}

// ---------------------------------------------------------------------------
// Rule 1: adjacent filters combine into one conjunction

struct CombineFilters;

impl OptimizerRule for CombineFilters {
    fn name(&self) -> &'static str {
        "combine_filters"
    }

    fn rewrite(&self, plan: &LogicalPlan) -> FacetResult<Option<LogicalPlan>> {
        if let LogicalPlan::Filter { input, predicate } = plan {
            if let LogicalPlan::Filter {
                input: inner_input,
                predicate: inner_predicate,
            } = &**input
            {
                let combined = LogicalPlan::Filter {
                    input: inner_input.clone(),
                    predicate: inner_predicate.clone().and(predicate.clone()),
                };
                // Re-run on the combined node: longer chains collapse fully.
                return Ok(Some(match self.rewrite(&combined)? {
                    Some(collapsed) => collapsed,
                    None => combined,
                }));
            }
        }
        rewrite_children(plan, &|child| self.rewrite(child))
    }
}

// ---------------------------------------------------------------------------
// Rule 2: predicates move toward the sources they constrain

struct PredicatePushdown;

impl PredicatePushdown {
    /// Output-name → right-child-column mapping of a join's right side
    fn right_output_map(
        left: &LogicalPlan,
        right: &LogicalPlan,
        left_on: &[String],
        right_on: &[String],
    ) -> FacetResult<HashMap<String, String>> {
        let left_schema = left.schema()?;
        let mut map = HashMap::new();
        for field in right.schema()? {
            let key_pair = right_on.iter().position(|name| name == &field.name);
            if let Some(pair) = key_pair {
                if left_on[pair] == field.name {
                    continue;
                }
            }
            if left_schema.iter().any(|l| l.name == field.name) {
                map.insert(format!("{}_right", field.name), field.name);
            } else {
                map.insert(field.name.clone(), field.name);
            }
        }
        Ok(map)
    }
}

impl OptimizerRule for PredicatePushdown {
    fn name(&self) -> &'static str {
        "predicate_pushdown"
    }

    fn rewrite(&self, plan: &LogicalPlan) -> FacetResult<Option<LogicalPlan>> {
        if let LogicalPlan::Filter { input, predicate } = plan {
            match &**input {
                LogicalPlan::Scan {
                    source,
                    schema,
                    pushed_columns,
                    pushed_filters,
                } => {
                    let mut pushed_filters = pushed_filters.clone();
                    pushed_filters.push(predicate.clone());
                    return Ok(Some(LogicalPlan::Scan {
                        source: source.clone(),
                        schema: schema.clone(),
                        pushed_columns: pushed_columns.clone(),
                        pushed_filters,
                    }));
                }
                LogicalPlan::Project {
                    input: project_input,
                    exprs,
                } => {
                    // Push below the projection when every referenced
                    // output is a plain (possibly renamed) column.
                    let mut mapping = HashMap::new();
                    for expr in exprs {
                        let core = strip_alias(expr);
                        if let Expr::Column(source) = core {
                            mapping.insert(expr.output_name(), source.clone());
                        }
                    }
                    let referenced = predicate.root_columns();
                    if referenced.iter().all(|name| mapping.contains_key(name)) {
                        let renamed = predicate.rename_columns(&mapping);
                        return Ok(Some(LogicalPlan::Project {
                            input: Box::new(LogicalPlan::Filter {
                                input: project_input.clone(),
                                predicate: renamed,
                            }),
                            exprs: exprs.clone(),
                        }));
                    }
                }
                LogicalPlan::Join {
                    left,
                    right,
                    left_on,
                    right_on,
                    how,
                } => {
                    let referenced = predicate.root_columns();
                    let left_schema = left.schema()?;
                    let on_left = referenced
                        .iter()
                        .all(|name| left_schema.iter().any(|f| &f.name == name));
                    let can_push_left = matches!(
                        how,
                        JoinType::Inner | JoinType::Left | JoinType::Semi | JoinType::Anti
                    );
                    if on_left && can_push_left {
                        return Ok(Some(LogicalPlan::Join {
                            left: Box::new(LogicalPlan::Filter {
                                input: left.clone(),
                                predicate: predicate.clone(),
                            }),
                            right: right.clone(),
                            left_on: left_on.clone(),
                            right_on: right_on.clone(),
                            how: *how,
                        }));
                    }
                    let right_map = Self::right_output_map(left, right, left_on, right_on)?;
                    let on_right = referenced
                        .iter()
                        .all(|name| right_map.contains_key(name));
                    let can_push_right = matches!(how, JoinType::Inner | JoinType::Right);
                    if on_right && can_push_right {
                        let renamed = predicate.rename_columns(&right_map);
                        return Ok(Some(LogicalPlan::Join {
                            left: left.clone(),
                            right: Box::new(LogicalPlan::Filter {
                                input: right.clone(),
                                predicate: renamed,
                            }),
                            left_on: left_on.clone(),
                            right_on: right_on.clone(),
                            how: *how,
                        }));
                    }
                }
                LogicalPlan::GroupBy {
                    input: group_input,
                    keys,
                    aggs,
                } => {
                    // Key-only predicates filter the same groups either way.
                    let referenced = predicate.root_columns();
                    if referenced.iter().all(|name| keys.contains(name)) {
                        return Ok(Some(LogicalPlan::GroupBy {
                            input: Box::new(LogicalPlan::Filter {
                                input: group_input.clone(),
                                predicate: predicate.clone(),
                            }),
                            keys: keys.clone(),
                            aggs: aggs.clone(),
                        }));
                    }
                }
                LogicalPlan::Sort {
                    input: sort_input,
                    by,
                    descending,
                } => {
                    // Filtering commutes with a stable sort.
                    return Ok(Some(LogicalPlan::Sort {
                        input: Box::new(LogicalPlan::Filter {
                            input: sort_input.clone(),
                            predicate: predicate.clone(),
                        }),
                        by: by.clone(),
                        descending: descending.clone(),
                    }));
                }
                // Filters never move below a Limit, and adjacent filters
                // are the combine rule's business.
                LogicalPlan::Filter { .. } | LogicalPlan::Limit { .. } => {}
            }
        }
        rewrite_children(plan, &|child| self.rewrite(child))
    }
}

// ---------------------------------------------------------------------------
// Rule 3: scans produce only the columns the plan reads

struct ProjectionPushdown;

impl ProjectionPushdown {
    /// Rewrite with the set of columns the parent needs (None = all).
    /// Returns the new plan and whether anything changed.
    fn push(
        plan: &LogicalPlan,
        required: Option<&BTreeSet<String>>,
    ) -> FacetResult<(LogicalPlan, bool)> {
        match plan {
            LogicalPlan::Scan {
                source,
                schema,
                pushed_columns,
                pushed_filters,
            } => {
                let Some(required) = required else {
                    return Ok((plan.clone(), false));
                };
                // Keep columns the pushed filters read alive too.
                let mut keep = required.clone();
                for filter in pushed_filters {
                    keep.extend(filter.root_columns());
                }
                let narrowed: Vec<String> = schema
                    .iter()
                    .map(|field| field.name.clone())
                    .filter(|name| keep.contains(name))
                    .collect();
                if Some(&narrowed) == pushed_columns.as_ref()
                    || narrowed.len() == schema.len() && pushed_columns.is_none()
                {
                    return Ok((plan.clone(), false));
                }
                Ok((
                    LogicalPlan::Scan {
                        source: source.clone(),
                        schema: schema.clone(),
                        pushed_columns: Some(narrowed),
                        pushed_filters: pushed_filters.clone(),
                    },
                    true,
                ))
            }
            LogicalPlan::Filter { input, predicate } => {
                let child_required = required.map(|required| {
                    let mut set = required.clone();
                    set.extend(predicate.root_columns());
                    set
                });
                let (new_input, changed) = Self::push(input, child_required.as_ref())?;
                Ok((
                    LogicalPlan::Filter {
                        input: Box::new(new_input),
                        predicate: predicate.clone(),
                    },
                    changed,
                ))
            }
            LogicalPlan::Project { input, exprs } => {
                let mut child_required = BTreeSet::new();
                for expr in exprs {
                    child_required.extend(expr.root_columns());
                }
                let (new_input, changed) = Self::push(input, Some(&child_required))?;
                Ok((
                    LogicalPlan::Project {
                        input: Box::new(new_input),
                        exprs: exprs.clone(),
                    },
                    changed,
                ))
            }
            LogicalPlan::GroupBy { input, keys, aggs } => {
                let mut child_required: BTreeSet<String> = keys.iter().cloned().collect();
                for agg in aggs {
                    child_required.extend(agg.root_columns());
                }
                let (new_input, changed) = Self::push(input, Some(&child_required))?;
                Ok((
                    LogicalPlan::GroupBy {
                        input: Box::new(new_input),
                        keys: keys.clone(),
                        aggs: aggs.clone(),
                    },
                    changed,
                ))
            }
            LogicalPlan::Join {
                left,
                right,
                left_on,
                right_on,
                how,
            } => {
                let (left_required, right_required) = match required {
                    None => (None, None),
                    Some(required) => {
                        let left_schema = left.schema()?;
                        let right_map =
                            PredicatePushdown::right_output_map(left, right, left_on, right_on)?;
                        let mut left_set: BTreeSet<String> = left_on.iter().cloned().collect();
                        let mut right_set: BTreeSet<String> = right_on.iter().cloned().collect();
                        for name in required {
                            if left_schema.iter().any(|f| &f.name == name) {
                                left_set.insert(name.clone());
                            } else if let Some(source) = right_map.get(name) {
                                right_set.insert(source.clone());
                            }
                        }
                        (Some(left_set), Some(right_set))
                    }
                };
                let (new_left, left_changed) = Self::push(left, left_required.as_ref())?;
                let (new_right, right_changed) = Self::push(right, right_required.as_ref())?;
                Ok((
                    LogicalPlan::Join {
                        left: Box::new(new_left),
                        right: Box::new(new_right),
                        left_on: left_on.clone(),
                        right_on: right_on.clone(),
                        how: *how,
                    },
                    left_changed || right_changed,
                ))
            }
            LogicalPlan::Sort {
                input,
                by,
                descending,
            } => {
                let child_required = required.map(|required| {
                    let mut set = required.clone();
                    set.extend(by.iter().cloned());
                    set
                });
                let (new_input, changed) = Self::push(input, child_required.as_ref())?;
                Ok((
                    LogicalPlan::Sort {
                        input: Box::new(new_input),
                        by: by.clone(),
                        descending: descending.clone(),
                    },
                    changed,
                ))
            }
            LogicalPlan::Limit { input, n } => {
                let (new_input, changed) = Self::push(input, required)?;
                Ok((
                    LogicalPlan::Limit {
                        input: Box::new(new_input),
                        n: *n,
                    },
                    changed,
                ))
            }
        }
    }
}

impl OptimizerRule for ProjectionPushdown {
    fn name(&self) -> &'static str {
        "projection_pushdown"
    }

    fn rewrite(&self, plan: &LogicalPlan) -> FacetResult<Option<LogicalPlan>> {
        let (rewritten, changed) = Self::push(plan, None)?;
        Ok(changed.then_some(rewritten))
    }
}

// ---------------------------------------------------------------------------
// Rule 4: syntactically equal expressions evaluate once

struct CommonSubexprElimination;

fn strip_alias(expr: &Expr) -> &Expr {
    match expr {
        Expr::Alias { input, .. } => strip_alias(input),
        other => other,
    }
}

/// Plan an expression list with duplicates evaluated once: the inner list
/// holds each distinct core under its first output name; the outer list
/// re-derives every original output as a rename. None when there is
/// nothing to share.
fn share_duplicates(exprs: &[Expr]) -> Option<(Vec<Expr>, Vec<Expr>)> {
    let mut first_name_of_core: Vec<(&Expr, String)> = Vec::new();
    let mut any_shared = false;

    for expr in exprs {
        let core = strip_alias(expr);
        match first_name_of_core.iter().find(|(seen, _)| *seen == core) {
            Some(_) => {
                // A repeated bare column costs nothing; only computed
                // duplicates are worth sharing.
                if !matches!(core, Expr::Column(_)) {
                    any_shared = true;
                }
            }
            None => first_name_of_core.push((core, expr.output_name())),
        }
    }
    if !any_shared {
        return None;
    }

    let inner: Vec<Expr> = first_name_of_core
        .iter()
        .map(|(core, name)| (*core).clone().alias(name.clone()))
        .collect();
    let outer: Vec<Expr> = exprs
        .iter()
        .map(|expr| {
            let core = strip_alias(expr);
            let source = first_name_of_core
                .iter()
                .find(|(seen, _)| *seen == core)
                .map(|(_, name)| name.clone())
                .unwrap_or_else(|| expr.output_name());
            Expr::Column(source).alias(expr.output_name())
        })
        .collect();
    Some((inner, outer))
}

impl OptimizerRule for CommonSubexprElimination {
    fn name(&self) -> &'static str {
        "common_subexpr_elimination"
    }

    fn rewrite(&self, plan: &LogicalPlan) -> FacetResult<Option<LogicalPlan>> {
        match plan {
            LogicalPlan::Project { input, exprs } => {
                if let Some((inner, outer)) = share_duplicates(exprs) {
                    return Ok(Some(LogicalPlan::Project {
                        input: Box::new(LogicalPlan::Project {
                            input: input.clone(),
                            exprs: inner,
                        }),
                        exprs: outer,
                    }));
                }
            }
            LogicalPlan::GroupBy { input, keys, aggs } => {
                if let Some((inner, outer)) = share_duplicates(aggs) {
                    let mut outer_with_keys: Vec<Expr> =
                        keys.iter().map(|key| Expr::Column(key.clone())).collect();
                    outer_with_keys.extend(outer);
                    return Ok(Some(LogicalPlan::Project {
                        input: Box::new(LogicalPlan::GroupBy {
                            input: input.clone(),
                            keys: keys.clone(),
                            aggs: inner,
                        }),
                        exprs: outer_with_keys,
                    }));
                }
            }
            _ => {}
        }
        rewrite_children(plan, &|child| self.rewrite(child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{col, lit};
    use crate::frame::DataFrame;
    use crate::planner::logical_plan::scan_frame;
    use crate::series::Series;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("a", &[1i64, 2, 3]),
            Series::new("b", &[10i64, 20, 30]),
            Series::new("c", &["x", "y", "z"]),
        ])
        .unwrap()
    }

    fn optimize(plan: LogicalPlan) -> LogicalPlan {
        Optimizer::new().optimize(plan).unwrap()
    }

    #[test]
    fn test_combine_filters() {
        let plan = LogicalPlan::Filter {
            input: Box::new(LogicalPlan::Filter {
                input: Box::new(LogicalPlan::Limit {
                    input: Box::new(scan_frame(frame())),
                    n: 2,
                }),
                predicate: col("a").gt(lit(0i64)),
            }),
            predicate: col("b").lt(lit(25i64)),
        };
        let optimized = optimize(plan);
        // One conjunction filter above the limit.
        let LogicalPlan::Filter { input, predicate } = &optimized else {
            panic!("expected filter, got:\n{}", optimized.describe());
        };
        assert!(predicate.to_string().contains("and"));
        assert!(matches!(&**input, LogicalPlan::Limit { .. }));
    }

    #[test]
    fn test_filter_reaches_scan() {
        let plan = LogicalPlan::Filter {
            input: Box::new(scan_frame(frame())),
            predicate: col("a").gt(lit(1i64)),
        };
        let optimized = optimize(plan);
        let LogicalPlan::Scan { pushed_filters, .. } = &optimized else {
            panic!("expected scan, got:\n{}", optimized.describe());
        };
        assert_eq!(pushed_filters.len(), 1);
    }

    #[test]
    fn test_filter_pushes_below_projection() {
        let plan = LogicalPlan::Filter {
            input: Box::new(LogicalPlan::Project {
                input: Box::new(scan_frame(frame())),
                exprs: vec![col("a").alias("renamed"), col("b")],
            }),
            predicate: col("renamed").gt(lit(1i64)),
        };
        let optimized = optimize(plan);
        // The filter lands in the scan, rewritten back to "a".
        let LogicalPlan::Project { input, .. } = &optimized else {
            panic!("expected project, got:\n{}", optimized.describe());
        };
        let LogicalPlan::Scan { pushed_filters, .. } = &**input else {
            panic!("expected scan below project");
        };
        assert!(pushed_filters[0].to_string().contains("col(a)"));
    }

    #[test]
    fn test_filter_stays_above_computed_projection() {
        let plan = LogicalPlan::Filter {
            input: Box::new(LogicalPlan::Project {
                input: Box::new(scan_frame(frame())),
                exprs: vec![(col("a") + col("b")).alias("s")],
            }),
            predicate: col("s").gt(lit(10i64)),
        };
        let optimized = optimize(plan);
        assert!(matches!(optimized, LogicalPlan::Filter { .. }));
    }

    #[test]
    fn test_projection_pushdown_narrows_scan() {
        let plan = LogicalPlan::Project {
            input: Box::new(scan_frame(frame())),
            exprs: vec![col("a")],
        };
        let optimized = optimize(plan);
        let LogicalPlan::Project { input, .. } = &optimized else {
            panic!("expected project, got:\n{}", optimized.describe());
        };
        let LogicalPlan::Scan { pushed_columns, .. } = &**input else {
            panic!("expected scan below project");
        };
        assert_eq!(pushed_columns.as_deref(), Some(&["a".to_string()][..]));
    }

    #[test]
    fn test_cse_shares_computed_duplicates() {
        let shared = col("a") + col("b");
        let plan = LogicalPlan::Project {
            input: Box::new(scan_frame(frame())),
            exprs: vec![
                shared.clone().alias("x"),
                shared.clone().alias("y"),
                col("c"),
            ],
        };
        let optimized = optimize(plan);
        let LogicalPlan::Project { input, exprs } = &optimized else {
            panic!("expected project, got:\n{}", optimized.describe());
        };
        assert_eq!(exprs.len(), 3);
        let LogicalPlan::Project { exprs: inner, .. } = &**input else {
            panic!("expected inner project");
        };
        // The sum appears once in the inner projection.
        let sums = inner
            .iter()
            .filter(|e| e.to_string().contains('+'))
            .count();
        assert_eq!(sums, 1);
    }

    #[test]
    fn test_optimized_schema_is_stable() {
        let plan = LogicalPlan::Filter {
            input: Box::new(LogicalPlan::Project {
                input: Box::new(scan_frame(frame())),
                exprs: vec![col("a"), col("b")],
            }),
            predicate: col("a").gt(lit(0i64)),
        };
        let before = plan.schema().unwrap();
        let after = optimize(plan).schema().unwrap();
        assert_eq!(before, after);
    }
}
