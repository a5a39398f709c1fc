#![forbid(unsafe_code)]

//! Property checks for the exploration helpers and arrow drawer.

use proptest::prelude::*;

use fe_explore::{
    FilterOptions, PercentOptions, filter_common_categories, get_percent,
    sort_by_common_categories,
};
use fe_frame::DataFrame;
use fe_types::{NullKind, Scalar, parse_timestamp};
use fe_viz::{ArrowOptions, Figure, draw_arrow};

const NANOS_PER_DAY: i64 = 86_400_000_000_000;

// ---------------------------------------------------------------------------
// Strategy generators
// ---------------------------------------------------------------------------

fn arb_category() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        6 => "[a-d]".prop_map(Scalar::Utf8),
        1 => Just(Scalar::Null(NullKind::Null)),
    ]
}

/// Day offsets from Monday 2024-01-01 paired with a category each.
fn arb_dated_rows(max_len: usize) -> impl Strategy<Value = Vec<(i64, Scalar)>> {
    proptest::collection::vec((0i64..120, arb_category()), 1..=max_len)
}

fn arb_categories(max_len: usize) -> impl Strategy<Value = Vec<Scalar>> {
    proptest::collection::vec(arb_category(), 0..=max_len)
}

fn dated_frame(rows: &[(i64, Scalar)]) -> DataFrame {
    let base = parse_timestamp("2024-01-01").expect("base date");
    let weeks = rows
        .iter()
        .map(|(day, _)| Scalar::Timestamp(base + day * NANOS_PER_DAY))
        .collect();
    let cats = rows.iter().map(|(_, cat)| cat.clone()).collect();
    DataFrame::from_dict(vec![("week", weeks), ("cat", cats)]).expect("frame")
}

fn category_frame(cats: Vec<Scalar>) -> DataFrame {
    let ids = (0..cats.len() as i64).map(Scalar::Int64).collect();
    DataFrame::from_dict(vec![("cat", cats), ("id", ids)]).expect("frame")
}

fn share_rows(frame: &DataFrame, group_col: &str) -> Vec<Vec<f64>> {
    let names = frame
        .column_names()
        .into_iter()
        .filter(|name| name.as_str() != group_col)
        .collect::<Vec<_>>();
    (0..frame.len())
        .map(|row| {
            names
                .iter()
                .map(|name| {
                    frame
                        .column(name)
                        .and_then(|column| column.value(row))
                        .and_then(|value| value.to_f64().ok())
                        .unwrap_or(f64::NAN)
                })
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Percent calculator
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// One output row per week between the first and last observed week.
    #[test]
    fn prop_percent_rows_cover_full_week_range(rows in arb_dated_rows(40)) {
        let frame = dated_frame(&rows);
        let out = get_percent(&frame, "cat", &PercentOptions::default()).expect("percent");

        let first = rows.iter().map(|(day, _)| day / 7).min().expect("rows");
        let last = rows.iter().map(|(day, _)| day / 7).max().expect("rows");
        prop_assert_eq!(out.len() as i64, last - first + 1);
    }

    /// Shares in a group sum to one, or are all NaN for an empty group.
    #[test]
    fn prop_percent_groups_sum_to_one_or_nan(rows in arb_dated_rows(40)) {
        let frame = dated_frame(&rows);
        let out = get_percent(&frame, "cat", &PercentOptions::default()).expect("percent");
        let has_missing_category = rows.iter().any(|(_, cat)| cat.is_missing());

        for shares in share_rows(&out, "week") {
            if shares.iter().all(|share| share.is_nan()) {
                continue;
            }
            prop_assert!(shares.iter().all(|share| !share.is_nan()));
            let total: f64 = shares.iter().sum();
            if has_missing_category {
                prop_assert!(total <= 1.0 + 1e-9);
            } else {
                prop_assert!((total - 1.0).abs() < 1e-9, "group total {}", total);
            }
        }
    }

    /// Categorical grouping keeps one row per distinct key, plus one for a
    /// missing key.
    #[test]
    fn prop_percent_categorical_rows_match_distinct_keys(cats in arb_categories(30)) {
        let frame = category_frame(cats.clone());
        let options = PercentOptions {
            group_col: "cat".to_owned(),
            ..PercentOptions::default()
        };
        let out = get_percent(&frame, "id", &options).expect("percent");

        let mut distinct = cats
            .iter()
            .filter(|cat| !cat.is_missing())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        distinct.sort();
        distinct.dedup();
        let missing_row = usize::from(cats.iter().any(Scalar::is_missing));
        prop_assert_eq!(out.len(), distinct.len() + missing_row);
    }
}

// ---------------------------------------------------------------------------
// Category filter and sorter
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Raising the threshold never keeps more rows.
    #[test]
    fn prop_filter_is_monotone_in_threshold(
        cats in arb_categories(30),
        low in 0.0f64..1.0,
        bump in 0.0f64..1.0,
    ) {
        let frame = category_frame(cats);
        let loose = FilterOptions { threshold: low, ..FilterOptions::default() };
        let strict = FilterOptions { threshold: low + bump, ..FilterOptions::default() };

        let kept_loose = filter_common_categories(&frame, "cat", &loose).expect("filter");
        let kept_strict = filter_common_categories(&frame, "cat", &strict).expect("filter");
        prop_assert!(kept_strict.len() <= kept_loose.len());
    }

    /// Every kept row's category meets the threshold.
    #[test]
    fn prop_filter_keeps_only_frequent_categories(
        cats in arb_categories(30),
        threshold in 0.0f64..0.6,
    ) {
        let non_missing = cats.iter().filter(|cat| !cat.is_missing()).count();
        let frame = category_frame(cats.clone());
        let options = FilterOptions { threshold, ..FilterOptions::default() };
        let out = filter_common_categories(&frame, "cat", &options).expect("filter");

        for value in out.column("cat").expect("cat").values() {
            prop_assert!(!value.is_missing());
            let count = cats.iter().filter(|cat| cat.semantic_eq(value)).count();
            prop_assert!(count as f64 / non_missing as f64 >= threshold);
        }
    }

    /// Sorting permutes rows so category counts never increase.
    #[test]
    fn prop_sort_orders_by_non_increasing_frequency(cats in arb_categories(30)) {
        let frame = category_frame(cats.clone());
        let out = sort_by_common_categories(&frame, "cat").expect("sort");
        prop_assert_eq!(out.len(), cats.len());

        let counts = out
            .column("cat")
            .expect("cat")
            .values()
            .iter()
            .map(|value| {
                if value.is_missing() {
                    0
                } else {
                    cats.iter().filter(|cat| cat.semantic_eq(value)).count()
                }
            })
            .collect::<Vec<_>>();
        prop_assert!(counts.windows(2).all(|pair| pair[0] >= pair[1]));

        let mut ids = out
            .column("id")
            .expect("id")
            .values()
            .iter()
            .map(|value| value.to_f64().expect("id") as usize)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        prop_assert_eq!(ids, (0..cats.len()).collect::<Vec<_>>());
    }
}

// ---------------------------------------------------------------------------
// Arrow drawer
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Inverting an arrow flips the side its curve bends towards.
    #[test]
    fn prop_invert_flips_curvature_sign(
        tail in (0.0f64..1.0, 0.0f64..1.0),
        head in (0.0f64..1.0, 0.0f64..1.0),
        radius in 0.05f64..2.0,
    ) {
        prop_assume!((tail.0 - head.0).hypot(tail.1 - head.1) > 1e-3);
        let mut fig = Figure::new(400.0, 300.0);
        let forward = ArrowOptions { radius, ..ArrowOptions::default() };
        let inverted = ArrowOptions { invert: true, ..forward.clone() };

        let bend = draw_arrow(&[tail.0, tail.1], &[head.0, head.1], &mut fig, &forward)
            .expect("arrow")
            .curvature();
        let flipped = draw_arrow(&[tail.0, tail.1], &[head.0, head.1], &mut fig, &inverted)
            .expect("arrow")
            .curvature();

        prop_assert!(bend < 0.0);
        prop_assert!(flipped > 0.0);
        prop_assert_eq!(fig.patches().len(), 2);
    }
}
