//! Query normalization against realistic multi-day search reports.

use tributary::frame::{Frame, Value};
use tributary::report::{NormalizeMode, NormalizeOptions, ReportError, ReportFrame};

/// Two days of search data where "rust lang" and "rustlang" are the same
/// intent spelled differently. Derived columns are present so aggregation
/// policy interplay is visible after the collapse.
fn daily_queries() -> ReportFrame {
    let frame = Frame::from_columns(vec![
        (
            "date",
            vec![
                Value::from("2024-05-01"),
                Value::from("2024-05-01"),
                Value::from("2024-05-02"),
            ],
        ),
        (
            "query",
            vec![
                Value::from("rust lang"),
                Value::from("rustlang"),
                Value::from("rust lang"),
            ],
        ),
        ("clicks", vec![Value::Int(2), Value::Int(8), Value::Int(4)]),
        (
            "impressions",
            vec![Value::Int(20), Value::Int(80), Value::Int(40)],
        ),
        (
            "ctr",
            vec![Value::Float(0.1), Value::Float(0.1), Value::Float(0.1)],
        ),
        (
            "position",
            vec![Value::Float(6.0), Value::Float(4.0), Value::Float(8.0)],
        ),
    ])
    .unwrap();
    ReportFrame::new(frame)
}

#[test]
fn test_buckets_are_scoped_by_remaining_dimensions() {
    let out = daily_queries()
        .normalize_queries(&NormalizeOptions::new())
        .unwrap();

    // The two 2024-05-01 rows collapse; 2024-05-02 spells its query the same
    // way but belongs to another date bucket.
    assert_eq!(out.len(), 2);
    assert_eq!(out.frame().cell("date", 0), Value::from("2024-05-01"));
    assert_eq!(out.frame().cell("query", 0), Value::from("rustlang"));
    assert_eq!(out.frame().cell("date", 1), Value::from("2024-05-02"));
    assert_eq!(out.frame().cell("query", 1), Value::from("rust lang"));
}

#[test]
fn test_collapse_reaggregates_derived_metrics_per_policy() {
    let out = daily_queries()
        .normalize_queries(&NormalizeOptions::new())
        .unwrap();

    // Counts sum, ctr is recomputed from the summed counts, position is the
    // impression-weighted mean rather than a plain average.
    assert_eq!(out.frame().cell("clicks", 0), Value::Int(10));
    assert_eq!(out.frame().cell("impressions", 0), Value::Int(100));
    assert_eq!(out.frame().cell("ctr", 0), Value::Float(10.0 / 100.0));
    assert_eq!(
        out.frame().cell("position", 0),
        Value::Float((6.0 * 20.0 + 4.0 * 80.0) / 100.0)
    );
}

#[test]
fn test_remove_all_and_collapse_bucket_differently() {
    let frame = Frame::from_columns(vec![
        (
            "query",
            vec![
                Value::from("foo  bar"),
                Value::from("foo bar"),
                Value::from("foobar"),
            ],
        ),
        (
            "impressions",
            vec![Value::Int(1), Value::Int(2), Value::Int(4)],
        ),
    ])
    .unwrap();
    let report = ReportFrame::new(frame);

    let removed = report
        .normalize_queries(&NormalizeOptions::new().with_mode(NormalizeMode::RemoveAll))
        .unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed.frame().cell("query", 0), Value::from("foobar"));
    assert_eq!(removed.frame().cell("impressions", 0), Value::Int(7));

    let collapsed = report
        .normalize_queries(&NormalizeOptions::new().with_mode(NormalizeMode::Collapse))
        .unwrap();
    assert_eq!(collapsed.len(), 2);
    assert_eq!(collapsed.frame().cell("query", 0), Value::from("foo bar"));
    assert_eq!(collapsed.frame().cell("impressions", 0), Value::Int(3));
    assert_eq!(collapsed.frame().cell("query", 1), Value::from("foobar"));
}

#[test]
fn test_equal_evidence_keeps_the_earlier_spelling() {
    let frame = Frame::from_columns(vec![
        ("query", vec![Value::from("a b"), Value::from("ab")]),
        ("impressions", vec![Value::Int(5), Value::Int(5)]),
    ])
    .unwrap();
    let out = ReportFrame::new(frame)
        .normalize_queries(&NormalizeOptions::new())
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.frame().cell("query", 0), Value::from("a b"));
}

#[test]
fn test_prefer_by_lower_is_better_column() {
    let frame = Frame::from_columns(vec![
        ("query", vec![Value::from("rust  lang"), Value::from("rust lang")]),
        ("position", vec![Value::Float(3.0), Value::Float(12.0)]),
        ("impressions", vec![Value::Int(1), Value::Int(100)]),
    ])
    .unwrap();
    let out = ReportFrame::new(frame)
        .normalize_queries(&NormalizeOptions::new().with_prefer_by("position"))
        .unwrap();

    // The default policy ranks position lower-is-better, so the 3.0 row's
    // spelling represents the bucket despite its thin impressions.
    assert_eq!(out.len(), 1);
    assert_eq!(out.frame().cell("query", 0), Value::from("rust  lang"));
}

#[test]
fn test_ungrouped_run_attaches_key_without_dropping_rows() {
    let out = daily_queries()
        .normalize_queries(&NormalizeOptions::new().with_group(false))
        .unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(
        out.frame().cell("query_normalized", 0),
        Value::from("rustlang")
    );
    assert_eq!(
        out.frame().cell("query_normalized", 1),
        Value::from("rustlang")
    );
    // Original spellings survive alongside the key.
    assert_eq!(out.frame().cell("query", 0), Value::from("rust lang"));
    assert!(out.dimensions().contains(&"query_normalized".to_string()));
}

#[test]
fn test_ungrouped_run_is_stable_when_repeated() {
    let options = NormalizeOptions::new().with_group(false);
    let once = daily_queries().normalize_queries(&options).unwrap();
    let twice = once.normalize_queries(&options).unwrap();

    assert_eq!(once.frame(), twice.frame());
    let key_columns = twice
        .frame()
        .names()
        .into_iter()
        .filter(|name| *name == "query_normalized")
        .count();
    assert_eq!(key_columns, 1);
}

#[test]
fn test_custom_column_and_evidence() {
    let frame = Frame::from_columns(vec![
        (
            "page",
            vec![Value::from("/docs /intro"), Value::from("/docs/intro")],
        ),
        ("sessions", vec![Value::Int(3), Value::Int(30)]),
    ])
    .unwrap();
    let out = ReportFrame::new(frame)
        .normalize_queries(
            &NormalizeOptions::new()
                .with_column("page")
                .with_prefer_by("sessions"),
        )
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.frame().cell("page", 0), Value::from("/docs/intro"));
    assert_eq!(out.frame().cell("sessions", 0), Value::Int(33));
}

#[test]
fn test_string_prefer_by_is_rejected() {
    let err = daily_queries()
        .normalize_queries(&NormalizeOptions::new().with_prefer_by("date"))
        .unwrap_err();
    assert!(matches!(err, ReportError::NotNumeric(name) if name == "date"));
}
