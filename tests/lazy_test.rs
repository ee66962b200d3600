//! Lazy plan and optimizer end-to-end scenarios

use facet::extensions::csv_reader::CsvReadOptions;
use facet::{col, lit, AnyValue, DataFrame, JoinType, LazyFrame, Series};
use pretty_assertions::assert_eq;
use std::io::Write;

fn frame() -> DataFrame {
    DataFrame::new(vec![
        Series::new("a", &[-1i64, 2, 3, 4]),
        Series::new("b", &[10i64, 20, 30, 40]),
        Series::new("c", &["w", "x", "y", "z"]),
    ])
    .unwrap()
}

/// Filter-project and project-filter plans produce identical frames.
#[test]
fn test_filter_pushdown_equivalence() {
    let filtered_then_projected = frame()
        .lazy()
        .filter(col("a").gt(lit(0i64)))
        .select(vec![col("a"), col("b")])
        .collect()
        .unwrap();

    let projected_then_filtered = frame()
        .lazy()
        .select(vec![col("a"), col("b")])
        .filter(col("a").gt(lit(0i64)))
        .collect()
        .unwrap();

    assert!(filtered_then_projected.equals(&projected_then_filtered));
    assert_eq!(filtered_then_projected.height(), 3);
}

/// The optimizer output is visible in explain_optimized.
#[test]
fn test_explain_shows_rewrites() {
    let lazy = frame()
        .lazy()
        .select(vec![col("a")])
        .filter(col("a").gt(lit(0i64)));

    let unoptimized = lazy.explain();
    assert!(unoptimized.starts_with("FILTER"));
    assert!(unoptimized.contains("PROJECT"));

    let optimized = lazy.explain_optimized().unwrap();
    // The filter reaches the scan and the scan narrows to one column.
    assert!(optimized.contains("filters=["));
    assert!(optimized.contains("columns=[a]"));
}

/// Optimization must not change the derived schema.
#[test]
fn test_optimizer_preserves_schema_and_rows() {
    let lazy = frame()
        .lazy()
        .filter(col("b").lt(lit(35i64)))
        .select(vec![col("c"), (col("a") + col("b")).alias("sum")])
        .sort(&["sum"], vec![true]);

    let collected = lazy.collect().unwrap();
    assert_eq!(collected.columns(), vec!["c", "sum"]);
    assert_eq!(collected.height(), 3);
    assert_eq!(collected.column("sum").unwrap().get(0).unwrap(), AnyValue::Int64(33));
}

/// Shared computed expressions evaluate once but produce both outputs.
#[test]
fn test_cse_preserves_output() {
    let shared = col("a") * col("b");
    let out = frame()
        .lazy()
        .select(vec![
            shared.clone().alias("p1"),
            shared.clone().alias("p2"),
        ])
        .collect()
        .unwrap();
    assert_eq!(out.columns(), vec!["p1", "p2"]);
    let p1 = out.column("p1").unwrap();
    let p2 = out.column("p2").unwrap();
    assert!(p1.equals(p2));
}

/// Group-by through the lazy surface with pushdown-eligible filters.
#[test]
fn test_lazy_group_by_pipeline() {
    let df = DataFrame::new(vec![
        Series::new("store", &["a", "b", "a", "b", "a"]),
        Series::new("units", &[1i64, 2, 3, 4, 5]),
    ])
    .unwrap();

    let out = df
        .lazy()
        .filter(col("units").gt(lit(1i64)))
        .group_by(&["store"])
        .agg(vec![
            col("units").sum().alias("total"),
            col("units").count().alias("n"),
        ])
        .sort(&["total"], vec![true])
        .collect()
        .unwrap();

    assert_eq!(out.height(), 2);
    assert_eq!(out.column("store").unwrap().get(0).unwrap(), AnyValue::from("a"));
    assert_eq!(out.column("total").unwrap().get(0).unwrap(), AnyValue::Int64(8));
    assert_eq!(out.column("n").unwrap().get(0).unwrap(), AnyValue::Int64(2));
}

/// Lazy joins optimize and execute like their eager counterparts.
#[test]
fn test_lazy_join_matches_eager() {
    let left = frame();
    let right = DataFrame::new(vec![
        Series::new("a", &[2i64, 3]),
        Series::new("d", &[200i64, 300]),
    ])
    .unwrap();

    let eager = left.join(&right, &["a"], &["a"], JoinType::Inner).unwrap();
    let lazy = left
        .lazy()
        .join(right.lazy(), &["a"], &["a"], JoinType::Inner)
        .collect()
        .unwrap();
    assert!(eager.equals(&lazy));
}

/// Predicates referencing one join side move below the join.
#[test]
fn test_predicate_pushdown_through_join() {
    let left = frame();
    let right = DataFrame::new(vec![
        Series::new("a", &[2i64, 3, 4]),
        Series::new("d", &[200i64, 300, 400]),
    ])
    .unwrap();

    let lazy = left
        .lazy()
        .join(right.lazy(), &["a"], &["a"], JoinType::Inner)
        .filter(col("d").gt(lit(250i64)));

    let optimized = lazy.explain_optimized().unwrap();
    // The d predicate lands in the right-side scan.
    let join_pos = optimized.find("JOIN").unwrap();
    let filter_pos = optimized.find("filters=[").unwrap();
    assert!(filter_pos > join_pos);

    let out = lazy.collect().unwrap();
    assert_eq!(out.height(), 2);
}

/// Scanning CSV lazily pushes the selected columns into the reader.
#[test]
fn test_lazy_csv_scan() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"a,b,c\n1,x,9\n2,y,8\n3,z,7\n").unwrap();

    let lazy = LazyFrame::scan_csv(file.path(), CsvReadOptions::default())
        .unwrap()
        .select(vec![col("a"), col("c")])
        .filter(col("a").gt_eq(lit(2i64)));

    let optimized = lazy.explain_optimized().unwrap();
    assert!(optimized.contains("columns=[a, c]"));

    let out = lazy.collect().unwrap();
    assert_eq!(out.columns(), vec!["a", "c"]);
    assert_eq!(out.height(), 2);
    assert_eq!(out.column("c").unwrap().get(0).unwrap(), AnyValue::Int64(8));
}

/// Limit caps the produced rows.
#[test]
fn test_limit() {
    let out = frame()
        .lazy()
        .sort(&["a"], vec![true])
        .limit(2)
        .collect()
        .unwrap();
    assert_eq!(out.height(), 2);
    assert_eq!(out.column("a").unwrap().get(0).unwrap(), AnyValue::Int64(4));
}
