//! End-to-end runs against recorded fixture files.

use std::fs;

use tempfile::TempDir;
use tributary::frame::Value;
use tributary::query::{
    DimensionInput, FixtureSource, MergeMode, MetricInput, MetricSpec, QueryError, RunOptions,
    Runner, Site, SourceError,
};

fn write_fixture(dir: &TempDir, id: &str, json: &str) {
    fs::write(dir.path().join(format!("{id}.json")), json).unwrap();
}

fn alpha() -> Site {
    Site::new()
        .with("site", "alpha")
        .with("url", "https://alpha.example.com")
        .with("cv", "purchase_complete")
        .with("cv_filter", "eventName==purchase")
}

fn beta() -> Site {
    Site::new()
        .with("site", "beta")
        .with("url", "https://beta.example.com")
        .with("cv", "signup_complete")
        .with("cv_filter", "eventName==signup")
}

fn dates() -> Vec<DimensionInput> {
    vec![DimensionInput::from("date")]
}

/// Page views plus each site's own conversion event.
fn conversion_metrics() -> Vec<MetricInput> {
    vec![
        MetricInput::from(MetricSpec::new("pv")),
        MetricInput::from(MetricSpec::new("site.cv").with_filter_m("site.cv_filter")),
    ]
}

const ALPHA: &str = r#"[
    {
        "frame": { "columns": [
            { "name": "date", "values": ["2024-01-01", "2024-01-02"] },
            { "name": "pv", "values": [100, 200] }
        ] }
    },
    {
        "filter_m": "eventName==purchase",
        "frame": { "columns": [
            { "name": "date", "values": ["2024-01-02"] },
            { "name": "purchase_complete", "values": [3] }
        ] }
    }
]"#;

const BETA: &str = r#"[
    {
        "frame": { "columns": [
            { "name": "date", "values": ["2024-01-01"] },
            { "name": "pv", "values": [50] }
        ] }
    },
    {
        "filter_m": "eventName==signup",
        "frame": { "columns": [
            { "name": "date", "values": ["2024-01-01"] },
            { "name": "signup_complete", "values": [7] }
        ] }
    }
]"#;

#[test]
fn test_run_joins_call_groups_from_one_file() {
    let dir = TempDir::new().unwrap();
    write_fixture(&dir, "alpha", ALPHA);
    let source = FixtureSource::new(dir.path());
    let runner = Runner::new(&source);

    let report = runner
        .run(&alpha(), &dates(), &conversion_metrics(), &RunOptions::new())
        .unwrap();

    assert_eq!(report.dimensions(), &["date".to_string()]);
    assert_eq!(report.frame().names(), vec!["date", "pv", "cv"]);
    assert_eq!(report.len(), 2);
    // 2024-01-01 had page views but no purchases recorded.
    assert_eq!(report.frame().cell("cv", 0), Value::Int(0));
    assert_eq!(report.frame().cell("pv", 1), Value::Int(200));
    assert_eq!(report.frame().cell("cv", 1), Value::Int(3));
}

#[test]
fn test_run_all_tags_rows_and_rollups_span_sites() {
    let dir = TempDir::new().unwrap();
    write_fixture(&dir, "alpha", ALPHA);
    write_fixture(&dir, "beta", BETA);
    let source = FixtureSource::new(dir.path());
    let runner = Runner::new(&source);

    let report = runner
        .run_all(
            &[alpha(), beta()],
            &dates(),
            &conversion_metrics(),
            &RunOptions::new(),
        )
        .unwrap();

    assert_eq!(report.frame().names(), vec!["site", "date", "pv", "cv"]);
    assert_eq!(report.len(), 3);
    assert_eq!(report.frame().cell("site", 0), Value::from("alpha"));
    assert_eq!(report.frame().cell("site", 2), Value::from("beta"));
    assert_eq!(report.frame().cell("cv", 2), Value::Int(7));

    // The tag is not a dimension, so a date rollup spans both sites and the
    // tag column washes out.
    let totals = report.aggregate(&["date"]).unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!(totals.frame().cell("pv", 0), Value::Int(150));
    assert_eq!(totals.frame().cell("cv", 0), Value::Int(7));
    assert_eq!(totals.frame().cell("pv", 1), Value::Int(200));
    assert_eq!(totals.frame().cell("site", 0), Value::Null);
}

#[test]
fn test_missing_file_fails_run_but_only_skips_in_run_all() {
    let dir = TempDir::new().unwrap();
    write_fixture(&dir, "alpha", ALPHA);
    let source = FixtureSource::new(dir.path());
    let runner = Runner::new(&source);

    let err = runner
        .run(&beta(), &dates(), &conversion_metrics(), &RunOptions::new())
        .unwrap_err();
    match err {
        QueryError::Source(SourceError::MissingFixture { site }) => assert_eq!(site, "beta"),
        other => panic!("unexpected error: {other}"),
    }

    let report = runner
        .run_all(
            &[alpha(), beta()],
            &dates(),
            &conversion_metrics(),
            &RunOptions::new(),
        )
        .unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report.frame().cell("site", 0), Value::from("alpha"));
    assert_eq!(report.frame().cell("site", 1), Value::from("alpha"));
}

#[test]
fn test_unmatched_entry_is_a_source_error() {
    let dir = TempDir::new().unwrap();
    // Only the purchase-filtered entry exists, so the unfiltered page-view
    // call has nothing to read.
    write_fixture(
        &dir,
        "alpha",
        r#"[
            {
                "filter_m": "eventName==purchase",
                "frame": { "columns": [
                    { "name": "date", "values": ["2024-01-01"] },
                    { "name": "purchase_complete", "values": [1] }
                ] }
            }
        ]"#,
    );
    let source = FixtureSource::new(dir.path());
    let runner = Runner::new(&source);

    let err = runner
        .run(&alpha(), &dates(), &conversion_metrics(), &RunOptions::new())
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Source(SourceError::NoMatchingEntry { .. })
    ));
}

#[test]
fn test_merge_mode_decides_unmatched_conversion_rows() {
    let dir = TempDir::new().unwrap();
    write_fixture(
        &dir,
        "alpha",
        r#"[
            {
                "frame": { "columns": [
                    { "name": "date", "values": ["2024-01-01"] },
                    { "name": "pv", "values": [100] }
                ] }
            },
            {
                "filter_m": "eventName==purchase",
                "frame": { "columns": [
                    { "name": "date", "values": ["2024-01-01", "2024-01-02"] },
                    { "name": "purchase_complete", "values": [5, 7] }
                ] }
            }
        ]"#,
    );
    let source = FixtureSource::new(dir.path());
    let runner = Runner::new(&source);

    let outer = runner
        .run(&alpha(), &dates(), &conversion_metrics(), &RunOptions::new())
        .unwrap();
    assert_eq!(outer.len(), 2);
    // Conversions on a date with no page-view row keep the date, zero pv.
    assert_eq!(outer.frame().cell("date", 1), Value::from("2024-01-02"));
    assert_eq!(outer.frame().cell("pv", 1), Value::Int(0));
    assert_eq!(outer.frame().cell("cv", 1), Value::Int(7));

    let left = runner
        .run(
            &alpha(),
            &dates(),
            &conversion_metrics(),
            &RunOptions::new().with_merge(MergeMode::Left),
        )
        .unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left.frame().cell("cv", 0), Value::Int(5));
}

#[test]
fn test_limit_truncates_each_call() {
    let dir = TempDir::new().unwrap();
    write_fixture(
        &dir,
        "gamma",
        r#"[
            {
                "frame": { "columns": [
                    { "name": "date", "values": ["2024-01-01", "2024-01-02", "2024-01-03"] },
                    { "name": "pv", "values": [1, 2, 3] }
                ] }
            }
        ]"#,
    );
    let source = FixtureSource::new(dir.path());
    let runner = Runner::new(&source);
    let site = Site::new().with("site", "gamma");

    let report = runner
        .run(
            &site,
            &dates(),
            &[MetricInput::from("pv")],
            &RunOptions::new().with_limit(2),
        )
        .unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report.frame().cell("date", 1), Value::from("2024-01-02"));
}

#[test]
fn test_site_indirection_selects_each_sites_segment() {
    let dir = TempDir::new().unwrap();
    write_fixture(
        &dir,
        "alpha",
        r#"[
            {
                "frame": { "columns": [
                    { "name": "date", "values": ["2024-01-01"] },
                    { "name": "pv", "values": [999] }
                ] }
            },
            {
                "filter_d": "country==jpn",
                "frame": { "columns": [
                    { "name": "date", "values": ["2024-01-01"] },
                    { "name": "pv", "values": [111] }
                ] }
            }
        ]"#,
    );
    write_fixture(
        &dir,
        "beta",
        r#"[
            {
                "filter_d": "country==usa",
                "frame": { "columns": [
                    { "name": "date", "values": ["2024-01-01"] },
                    { "name": "pv", "values": [222] }
                ] }
            }
        ]"#,
    );
    let source = FixtureSource::new(dir.path());
    let runner = Runner::new(&source);
    let sites = [
        alpha().with("segment", "country==jpn"),
        beta().with("segment", "country==usa"),
    ];

    let report = runner
        .run_all(
            &sites,
            &dates(),
            &[MetricInput::from("pv")],
            &RunOptions::new().with_filter_d("site.segment"),
        )
        .unwrap();

    assert_eq!(report.len(), 2);
    assert_eq!(report.frame().cell("pv", 0), Value::Int(111));
    assert_eq!(report.frame().cell("pv", 1), Value::Int(222));
}

#[test]
fn test_custom_item_key_names_files_and_tags() {
    let dir = TempDir::new().unwrap();
    write_fixture(
        &dir,
        "p1",
        r#"[
            {
                "frame": { "columns": [
                    { "name": "date", "values": ["2024-01-01"] },
                    { "name": "pv", "values": [42] }
                ] }
            }
        ]"#,
    );
    let source = FixtureSource::new(dir.path()).with_item_key("property");
    let runner = Runner::new(&source);
    let sites = [Site::new().with("property", "p1")];

    let report = runner
        .run_all(
            &sites,
            &dates(),
            &[MetricInput::from("pv")],
            &RunOptions::new().with_item_key("property"),
        )
        .unwrap();

    assert_eq!(report.frame().names(), vec!["property", "date", "pv"]);
    assert_eq!(report.frame().cell("property", 0), Value::from("p1"));
    assert_eq!(report.frame().cell("pv", 0), Value::Int(42));
}
