use insta::assert_snapshot;
use tributary::frame::{Frame, Value};
use tributary::report::{AggregateMethod, AggregatePolicy, GroupOptions, ReportFrame};

fn search_report() -> ReportFrame {
    let frame = Frame::from_columns(vec![
        (
            "query",
            vec![Value::from("rust"), Value::from("rust"), Value::from("pandas")],
        ),
        ("clicks", vec![Value::Int(10), Value::Int(20), Value::Int(1)]),
        (
            "impressions",
            vec![Value::Int(100), Value::Int(300), Value::Int(50)],
        ),
        (
            "ctr",
            vec![Value::Float(0.1), Value::Float(0.0667), Value::Float(0.02)],
        ),
        (
            "position",
            vec![Value::Float(5.0), Value::Float(8.0), Value::Float(2.0)],
        ),
    ])
    .unwrap();
    ReportFrame::new(frame)
}

#[test]
fn test_group_sort_head_chain() {
    let top = search_report()
        .group(&GroupOptions::new())
        .unwrap()
        .sort(&["clicks"], &[false])
        .unwrap()
        .head(1);

    assert_eq!(top.len(), 1);
    assert_eq!(top.frame().cell("query", 0), Value::from("rust"));
    assert_eq!(top.frame().cell("clicks", 0), Value::Int(30));
}

#[test]
fn test_default_policy_recomputes_rates_under_grouping() {
    let grouped = search_report().group(&GroupOptions::new()).unwrap();

    // rust: ctr = (10+20)/(100+300), position = (5*100 + 8*300)/400
    assert_eq!(grouped.frame().cell("ctr", 0), Value::Float(30.0 / 400.0));
    assert_eq!(grouped.frame().cell("position", 0), Value::Float(7.25));
    // pandas passes through with a single row
    assert_eq!(grouped.frame().cell("ctr", 1), Value::Float(0.02));
    assert_eq!(grouped.frame().cell("position", 1), Value::Float(2.0));
}

#[test]
fn test_plain_policy_sums_everything() {
    let grouped = search_report()
        .with_policy(AggregatePolicy::plain())
        .aggregate(&["query"])
        .unwrap();

    assert_eq!(grouped.frame().cell("position", 0), Value::Float(13.0));
}

#[test]
fn test_custom_policy_declarations() {
    let frame = Frame::from_columns(vec![
        ("page", vec![Value::from("/a"), Value::from("/a")]),
        ("sessions", vec![Value::Int(10), Value::Int(30)]),
        (
            "avg_duration",
            vec![Value::Float(60.0), Value::Float(20.0)],
        ),
    ])
    .unwrap();
    let policy = AggregatePolicy::plain().weighted("avg_duration", "sessions");

    let grouped = ReportFrame::new(frame)
        .with_policy(policy)
        .aggregate(&["page"])
        .unwrap();

    // (60*10 + 20*30) / 40 = 30
    assert_eq!(grouped.frame().cell("avg_duration", 0), Value::Float(30.0));
}

#[test]
fn test_group_method_applies_to_plain_metrics() {
    let grouped = search_report()
        .group(
            &GroupOptions::new()
                .with_metrics(["clicks"])
                .with_method(AggregateMethod::Max),
        )
        .unwrap();

    assert_eq!(grouped.frame().names(), vec!["query", "clicks"]);
    assert_eq!(grouped.frame().cell("clicks", 0), Value::Int(20));
}

#[test]
fn test_requested_metrics_missing_from_frame_are_dropped() {
    let grouped = search_report()
        .group(&GroupOptions::new().with_metrics(["clicks", "conversions"]))
        .unwrap();
    assert_eq!(grouped.frame().names(), vec!["query", "clicks"]);
}

#[test]
fn test_empty_result_keeps_declared_shape() {
    let frame = Frame::with_names(&["query", "clicks"]);
    let report = ReportFrame::with_dimensions(frame, &["query"]).unwrap();

    let chained = report
        .group(&GroupOptions::new())
        .unwrap()
        .fill()
        .unwrap()
        .select(&["query", "clicks"])
        .unwrap();

    assert!(chained.is_empty());
    assert_eq!(chained.frame().names(), vec!["query", "clicks"]);
    assert_eq!(chained.dimensions(), &["query".to_string()]);
}

#[test]
fn test_chain_never_mutates_the_source() {
    let report = search_report();
    let _ = report.group(&GroupOptions::new()).unwrap();
    let _ = report.rename("query", "term").unwrap();
    let _ = report.drop(&["ctr"]).unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(
        report.frame().names(),
        vec!["query", "clicks", "impressions", "ctr", "position"]
    );
}

#[test]
fn test_sort_total_order_across_types() {
    let frame = Frame::from_columns(vec![(
        "v",
        vec![Value::from("zz"), Value::Null, Value::Int(5)],
    )])
    .unwrap();
    let sorted = ReportFrame::new(frame).sort(&["v"], &[true]).unwrap();

    assert_eq!(sorted.frame().cell("v", 0), Value::Null);
    assert_eq!(sorted.frame().cell("v", 1), Value::Int(5));
    assert_eq!(sorted.frame().cell("v", 2), Value::from("zz"));
}

#[test]
fn test_render_aligns_columns() {
    let frame = Frame::from_columns(vec![
        ("query", vec![Value::from("rust"), Value::from("pandas")]),
        ("clicks", vec![Value::Int(10), Value::Int(3)]),
    ])
    .unwrap();
    let report = ReportFrame::new(frame);

    assert_snapshot!(report.to_string(), @r"
    query   clicks
    rust        10
    pandas       3
    ");
}
