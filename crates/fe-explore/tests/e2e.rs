#![forbid(unsafe_code)]

//! End-to-end runs over CSV-shaped inputs.

use fe_explore::{
    ExploreError, FilterOptions, PercentOptions, filter_common_categories, get_percent,
    sort_by_common_categories,
};
use fe_io::{read_csv_str, write_csv_string};
use fe_period::Freq;
use fe_types::{DType, Scalar, parse_timestamp};
use fe_viz::{ArrowKwargs, ArrowOptions, Figure, draw_arrow};

fn ts(text: &str) -> Scalar {
    Scalar::Timestamp(parse_timestamp(text).expect("valid timestamp literal"))
}

fn shares(frame: &fe_frame::DataFrame, name: &str) -> Vec<f64> {
    frame
        .column(name)
        .expect("share column")
        .values()
        .iter()
        .map(|value| value.to_f64().expect("share"))
        .collect()
}

#[test]
fn filter_default_and_strict_threshold() {
    let frame = read_csv_str("cat\nA\nA\nA\nB\nC\n").expect("csv");

    let all = filter_common_categories(&frame, "cat", &FilterOptions::default()).expect("filter");
    assert_eq!(all.len(), 5);

    let options = FilterOptions {
        threshold: 0.3,
        ..FilterOptions::default()
    };
    let common = filter_common_categories(&frame, "cat", &options).expect("filter");
    assert_eq!(common.len(), 3);
    assert!(
        common
            .column("cat")
            .expect("cat")
            .values()
            .iter()
            .all(|value| *value == Scalar::Utf8("A".to_owned()))
    );
}

#[test]
fn weekly_percent_fills_gap_between_observed_weeks() {
    let csv = "\
week,channel
2024-01-02,email
2024-01-03,web
2024-01-05,web
2024-01-30,email
";
    let frame = read_csv_str(csv).expect("csv");
    assert_eq!(frame.column("week").expect("week").dtype(), DType::Timestamp);

    let out = get_percent(&frame, "channel", &PercentOptions::default()).expect("percent");
    assert_eq!(
        out.column("week").expect("week").values(),
        &[
            ts("2024-01-01"),
            ts("2024-01-08"),
            ts("2024-01-15"),
            ts("2024-01-22"),
            ts("2024-01-29"),
        ]
    );

    let email = shares(&out, "email");
    let web = shares(&out, "web");
    assert!((email[0] - 1.0 / 3.0).abs() < 1e-12);
    assert!((web[0] - 2.0 / 3.0).abs() < 1e-12);
    assert!(email[1..4].iter().all(|share| share.is_nan()));
    assert_eq!((email[4], web[4]), (1.0, 0.0));

    let rendered = write_csv_string(&out).expect("write");
    assert!(rendered.starts_with("week,email,web\n"));
    assert!(rendered.contains("2024-01-08,,\n"));
    assert!(rendered.ends_with("2024-01-29,1,0\n"));
}

#[test]
fn monthly_percent_from_text_dates() {
    let frame = read_csv_str("day,kind\n2024-01-31,x\n2024-03-02,y\n2024-03-09,x\n")
        .expect("csv");
    let options = PercentOptions {
        group_col: "day".to_owned(),
        freq: "MS".parse::<Freq>().expect("freq"),
    };
    let out = get_percent(&frame, "kind", &options).expect("percent");
    assert_eq!(out.len(), 3);
    assert_eq!(shares(&out, "x")[2], 0.5);
}

#[test]
fn missing_grouping_column_is_a_descriptive_error() {
    let frame = read_csv_str("cat\nA\n").expect("csv");
    let err = get_percent(&frame, "cat", &PercentOptions::default()).expect_err("no week");
    assert!(matches!(err, ExploreError::MissingColumn { ref name, .. } if name == "week"));
    assert!(err.to_string().contains("week"));
}

#[test]
fn sort_then_filter_pipeline() {
    let frame = read_csv_str("cat,n\nb,1\na,2\nb,3\nc,4\nb,5\na,6\n").expect("csv");
    let sorted = sort_by_common_categories(&frame, "cat").expect("sort");
    let rendered = write_csv_string(&sorted).expect("write");
    assert_eq!(rendered, "cat,n\nb,1\nb,3\nb,5\na,2\na,6\nc,4\n");

    let options = FilterOptions {
        threshold: 2.0,
        normalize: false,
        sort_by_common: true,
    };
    let kept = filter_common_categories(&frame, "cat", &options).expect("filter");
    assert_eq!(
        write_csv_string(&kept).expect("write"),
        "cat,n\nb,1\nb,3\nb,5\na,2\na,6\n"
    );
}

#[test]
fn arrows_annotate_a_figure() {
    let mut fig = Figure::new(320.0, 240.0);
    let options: ArrowOptions =
        serde_json::from_str(r#"{"radius": 0.2, "color": "tab:red"}"#).expect("options");
    draw_arrow(&[0.1, 0.9], &[0.5, 0.5], &mut fig, &options).expect("arrow");
    draw_arrow(
        &[0.9, 0.1],
        &[0.5, 0.5],
        &mut fig,
        &ArrowOptions {
            invert: true,
            kw: ArrowKwargs {
                arrowstyle: Some("-|>".parse().expect("style")),
                ..ArrowKwargs::default()
            },
            ..options.clone()
        },
    )
    .expect("arrow");

    assert_eq!(fig.patches().len(), 2);
    let svg = fig.to_svg();
    assert_eq!(svg.matches("<path ").count(), 2);
    assert!(svg.contains("#d62728"));
    assert!(draw_arrow(&[0.1, 0.9, 0.0], &[0.5, 0.5], &mut fig, &options).is_err());
    assert_eq!(fig.patches().len(), 2);
}
