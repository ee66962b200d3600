//! Join end-to-end scenarios

use facet::{AnyValue, DataFrame, JoinType, Series};
use pretty_assertions::assert_eq;

/// Inner join on int64 keys with duplicates on both sides.
#[test]
fn test_inner_join_with_duplicates() {
    let left = DataFrame::new(vec![
        Series::new("id", &[1i64, 2, 2, 3]),
        Series::new("l", &["p", "q", "r", "s"]),
    ])
    .unwrap();
    let right = DataFrame::new(vec![
        Series::new("id", &[2i64, 2, 4]),
        Series::new("r", &["x", "y", "z"]),
    ])
    .unwrap();

    let out = left.join(&right, &["id"], &["id"], JoinType::Inner).unwrap();
    assert_eq!(out.height(), 4);
    // Left row order, right row order within each left row.
    let ids: Vec<AnyValue> = (0..4)
        .map(|i| out.column("id").unwrap().get(i).unwrap())
        .collect();
    assert_eq!(ids, vec![AnyValue::Int64(2); 4]);
    let l: Vec<AnyValue> = (0..4)
        .map(|i| out.column("l").unwrap().get(i).unwrap())
        .collect();
    assert_eq!(
        l,
        vec![
            AnyValue::from("q"),
            AnyValue::from("q"),
            AnyValue::from("r"),
            AnyValue::from("r"),
        ]
    );
    let r: Vec<AnyValue> = (0..4)
        .map(|i| out.column("r").unwrap().get(i).unwrap())
        .collect();
    assert_eq!(
        r,
        vec![
            AnyValue::from("x"),
            AnyValue::from("y"),
            AnyValue::from("x"),
            AnyValue::from("y"),
        ]
    );
}

/// Left join with a null key: the row survives with null right columns.
#[test]
fn test_left_join_with_null_key() {
    let left = DataFrame::new(vec![
        Series::new("id", &[Some(1i64), None, Some(3)]),
        Series::new("l", &["a", "b", "c"]),
    ])
    .unwrap();
    let right = DataFrame::new(vec![
        Series::new("id", &[1i64, 3]),
        Series::new("r", &["x", "y"]),
    ])
    .unwrap();

    let out = left.join(&right, &["id"], &["id"], JoinType::Left).unwrap();
    assert_eq!(out.height(), 3);
    assert_eq!(out.column("r").unwrap().get(0).unwrap(), AnyValue::from("x"));
    assert_eq!(out.column("r").unwrap().get(1).unwrap(), AnyValue::Null);
    assert_eq!(out.column("r").unwrap().get(2).unwrap(), AnyValue::from("y"));
    // The null-keyed left row keeps its own columns.
    assert_eq!(out.column("l").unwrap().get(1).unwrap(), AnyValue::from("b"));
}

/// Inner join with unique keys on both sides has intersection cardinality,
/// and left join height is at least the left height.
#[test]
fn test_join_cardinalities() {
    let left = DataFrame::new(vec![Series::new("k", &[1i64, 2, 3, 4])]).unwrap();
    let right = DataFrame::new(vec![Series::new("k", &[3i64, 4, 5])]).unwrap();

    let inner = left.join(&right, &["k"], &["k"], JoinType::Inner).unwrap();
    assert_eq!(inner.height(), 2);

    let left_join = left.join(&right, &["k"], &["k"], JoinType::Left).unwrap();
    assert!(left_join.height() >= left.height());
    assert_eq!(left_join.height(), 4);
}

#[test]
fn test_right_and_outer_joins() {
    let left = DataFrame::new(vec![
        Series::new("id", &[1i64, 2]),
        Series::new("l", &["a", "b"]),
    ])
    .unwrap();
    let right = DataFrame::new(vec![
        Series::new("id", &[2i64, 9]),
        Series::new("r", &["x", "y"]),
    ])
    .unwrap();

    let right_join = left.join(&right, &["id"], &["id"], JoinType::Right).unwrap();
    assert_eq!(right_join.height(), 2);
    // Unmatched right row carries nulls from the left payload columns,
    // but the coalesced key keeps its right-side value.
    assert_eq!(right_join.column("id").unwrap().get(1).unwrap(), AnyValue::Int64(9));
    assert_eq!(right_join.column("l").unwrap().get(1).unwrap(), AnyValue::Null);
    assert_eq!(right_join.column("r").unwrap().get(1).unwrap(), AnyValue::from("y"));

    let outer = left.join(&right, &["id"], &["id"], JoinType::Outer).unwrap();
    assert_eq!(outer.height(), 3);
    assert_eq!(outer.column("id").unwrap().get(0).unwrap(), AnyValue::Int64(1));
    assert_eq!(outer.column("r").unwrap().get(0).unwrap(), AnyValue::Null);
    assert_eq!(outer.column("id").unwrap().get(2).unwrap(), AnyValue::Int64(9));
    assert_eq!(outer.column("l").unwrap().get(2).unwrap(), AnyValue::Null);
    assert_eq!(outer.column("r").unwrap().get(2).unwrap(), AnyValue::from("y"));
}

#[test]
fn test_semi_anti_and_cross() {
    let left = DataFrame::new(vec![
        Series::new("id", &[1i64, 2, 3]),
        Series::new("l", &["a", "b", "c"]),
    ])
    .unwrap();
    let right = DataFrame::new(vec![Series::new("id", &[2i64, 2])]).unwrap();

    let semi = left.join(&right, &["id"], &["id"], JoinType::Semi).unwrap();
    // Semi keeps each matching left row once, with the left schema.
    assert_eq!(semi.height(), 1);
    assert_eq!(semi.columns(), vec!["id", "l"]);

    let anti = left.join(&right, &["id"], &["id"], JoinType::Anti).unwrap();
    assert_eq!(anti.height(), 2);

    let cross = left.cross_join(&right).unwrap();
    assert_eq!(cross.height(), 6);
    assert_eq!(cross.columns(), vec!["id", "l", "id_right"]);
}

/// String keys join through the byte-keyed table.
#[test]
fn test_string_key_join() {
    let left = DataFrame::new(vec![
        Series::new("name", &[Some("ada"), Some("alan"), None]),
        Series::new("v", &[1i64, 2, 3]),
    ])
    .unwrap();
    let right = DataFrame::new(vec![
        Series::new("name", &[Some("alan"), None]),
        Series::new("w", &[10i64, 20]),
    ])
    .unwrap();

    let out = left
        .join(&right, &["name"], &["name"], JoinType::Left)
        .unwrap();
    assert_eq!(out.height(), 3);
    assert_eq!(out.column("w").unwrap().get(0).unwrap(), AnyValue::Null);
    assert_eq!(out.column("w").unwrap().get(1).unwrap(), AnyValue::Int64(10));
    // Null never joins null.
    assert_eq!(out.column("w").unwrap().get(2).unwrap(), AnyValue::Null);
}

/// Multi-key joins normalize both sides onto shared dictionary codes.
#[test]
fn test_two_key_join_end_to_end() {
    let left = DataFrame::new(vec![
        Series::new("a", &[1i64, 1, 2]),
        Series::new("b", &["x", "y", "x"]),
        Series::new("payload", &[100i64, 200, 300]),
    ])
    .unwrap();
    let right = DataFrame::new(vec![
        Series::new("a", &[1i64, 2]),
        Series::new("b", &["y", "x"]),
        Series::new("score", &[7i64, 8]),
    ])
    .unwrap();

    let out = left
        .join(&right, &["a", "b"], &["a", "b"], JoinType::Inner)
        .unwrap();
    assert_eq!(out.height(), 2);
    assert_eq!(out.columns(), vec!["a", "b", "payload", "score"]);
    assert_eq!(out.column("payload").unwrap().get(0).unwrap(), AnyValue::Int64(200));
    assert_eq!(out.column("score").unwrap().get(0).unwrap(), AnyValue::Int64(7));
}

/// Incompatible key types surface a schema error with the join context.
#[test]
fn test_incompatible_key_types() {
    let left = DataFrame::new(vec![Series::new("k", &["a"])]).unwrap();
    let right = DataFrame::new(vec![Series::new("k", &[1i64])]).unwrap();
    let err = left.join(&right, &["k"], &["k"], JoinType::Inner).unwrap_err();
    assert!(err.to_string().contains("incompatible"));
}
