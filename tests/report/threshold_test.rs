//! Impression floors over a cross-site report.

use tributary::config::Settings;
use tributary::frame::{Frame, Value};
use tributary::query::Site;
use tributary::report::{ClickFilter, ImpressionFilter, ReportFrame};

fn fleet() -> Vec<Site> {
    vec![
        Site::new()
            .with("site", "alpha")
            .with("url", "https://alpha.example.com")
            .with("min_impressions", 100i64),
        Site::new()
            .with("site", "beta")
            .with("url", "https://beta.example.com")
            .with("min_impressions", 10i64),
        Site::new().with("site", "gamma"),
    ]
}

/// Merged rows from three sites; gamma has no configured floor.
fn cross_site_report() -> ReportFrame {
    let frame = Frame::from_columns(vec![
        (
            "site",
            vec![
                Value::from("alpha"),
                Value::from("alpha"),
                Value::from("beta"),
                Value::from("beta"),
                Value::from("gamma"),
            ],
        ),
        (
            "query",
            vec![
                Value::from("rust frames"),
                Value::from("rust joins"),
                Value::from("rust frames"),
                Value::from("beta only"),
                Value::from("tiny site"),
            ],
        ),
        (
            "clicks",
            vec![
                Value::Int(0),
                Value::Int(3),
                Value::Int(0),
                Value::Int(0),
                Value::Int(0),
            ],
        ),
        (
            "impressions",
            vec![
                Value::Int(40),
                Value::Int(60),
                Value::Int(50),
                Value::Int(4),
                Value::Int(2),
            ],
        ),
    ])
    .unwrap();
    ReportFrame::new(frame)
}

#[test]
fn test_each_row_resolves_its_own_sites_floor() {
    let sites = fleet();
    let out = cross_site_report()
        .filter_impressions(&ImpressionFilter::new().with_sites(&sites))
        .unwrap();

    // 50 clears beta's floor of 10; both alpha rows miss its floor of 100;
    // gamma has no floor so its 2 impressions pass.
    assert_eq!(out.len(), 2);
    assert_eq!(out.frame().cell("site", 0), Value::from("beta"));
    assert_eq!(out.frame().cell("site", 1), Value::from("gamma"));
}

#[test]
fn test_keep_clicked_saves_converted_rows_from_the_floor() {
    let sites = fleet();
    let out = cross_site_report()
        .filter_impressions(
            &ImpressionFilter::new()
                .with_sites(&sites)
                .with_keep_clicked(true),
        )
        .unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(out.frame().cell("query", 0), Value::from("rust joins"));
    assert_eq!(out.frame().cell("query", 1), Value::from("rust frames"));
    assert_eq!(out.frame().cell("query", 2), Value::from("tiny site"));
}

#[test]
fn test_floors_parsed_from_settings_apply() {
    let settings = Settings::from_str(
        r#"
        [[sites]]
        site = "alpha"
        url = "https://alpha.example.com"
        min_impressions = 100

        [[sites]]
        site = "beta"
        url = "https://beta.example.com"
        min_impressions = 10
        "#,
    )
    .unwrap();

    let out = cross_site_report()
        .filter_impressions(&ImpressionFilter::new().with_sites(&settings.sites))
        .unwrap();
    assert_eq!(out.len(), 2);
}

#[test]
fn test_rows_match_sites_through_a_custom_key() {
    let sites = vec![Site::new()
        .with("property", "p1")
        .with("min_impressions", 25i64)];
    let frame = Frame::from_columns(vec![
        ("property", vec![Value::from("p1"), Value::from("p1")]),
        ("impressions", vec![Value::Int(30), Value::Int(20)]),
    ])
    .unwrap();
    let out = ReportFrame::new(frame)
        .filter_impressions(
            &ImpressionFilter::new()
                .with_sites(&sites)
                .with_site_key("property"),
        )
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.frame().cell("impressions", 0), Value::Int(30));
}

#[test]
fn test_ceiling_cuts_runaway_rows() {
    let frame = Frame::from_columns(vec![
        (
            "query",
            vec![Value::from("normal"), Value::from("bot spike")],
        ),
        ("impressions", vec![Value::Int(500), Value::Int(250_000)]),
    ])
    .unwrap();
    let out = ReportFrame::new(frame)
        .filter_impressions(&ImpressionFilter::new().with_min(100.0).with_max(10_000.0))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.frame().cell("query", 0), Value::from("normal"));
}

#[test]
fn test_null_impressions_fail_a_set_floor() {
    let frame = Frame::from_columns(vec![
        ("query", vec![Value::from("a"), Value::from("b")]),
        ("impressions", vec![Value::Null, Value::Int(200)]),
    ])
    .unwrap();
    let out = ReportFrame::new(frame)
        .filter_impressions(&ImpressionFilter::new().with_min(100.0))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.frame().cell("query", 0), Value::from("b"));
}

#[test]
fn test_filtered_rows_do_not_reach_rollups() {
    let sites = fleet();
    let totals = cross_site_report()
        .filter_impressions(&ImpressionFilter::new().with_sites(&sites))
        .unwrap()
        .aggregate(&["site"])
        .unwrap();

    assert_eq!(totals.len(), 2);
    assert_eq!(totals.frame().cell("site", 0), Value::from("beta"));
    assert_eq!(totals.frame().cell("impressions", 0), Value::Int(50));
    assert_eq!(totals.frame().cell("impressions", 1), Value::Int(2));
}

#[test]
fn test_click_window() {
    let out = cross_site_report()
        .filter_clicks(&ClickFilter::new().with_min(1.0).with_max(5.0))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.frame().cell("clicks", 0), Value::Int(3));
}

#[test]
fn test_click_filter_without_clicks_column_is_a_no_op() {
    let frame = Frame::from_columns(vec![
        ("page", vec![Value::from("/a")]),
        ("sessions", vec![Value::Int(9)]),
    ])
    .unwrap();
    let out = ReportFrame::new(frame)
        .filter_clicks(&ClickFilter::new().with_min(10.0))
        .unwrap();
    assert_eq!(out.len(), 1);
}
