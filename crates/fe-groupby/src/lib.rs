#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap};

use fe_columnar::{Column, ColumnError};
use fe_frame::{DataFrame, FrameError, Series};
use fe_index::{Index, IndexLabel};
use fe_types::{DType, Scalar};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupByOptions {
    /// Skip rows whose key is missing.
    pub dropna: bool,
    /// Emit groups in ascending key order instead of first-seen order.
    pub sort: bool,
}

impl Default for GroupByOptions {
    fn default() -> Self {
        Self {
            dropna: true,
            sort: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum GroupByError {
    #[error("groupby keys with missing values require dropna=true")]
    MissingKeyUnsupported,
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Column(#[from] ColumnError),
}

fn group_label(value: &Scalar, options: GroupByOptions) -> Result<Option<IndexLabel>, GroupByError> {
    match IndexLabel::from_scalar(value) {
        Some(label) => Ok(Some(label)),
        None if options.dropna => Ok(None),
        None => Err(GroupByError::MissingKeyUnsupported),
    }
}

/// Key -> row count, in first-seen order.
fn count_by_key(
    keys: &[Scalar],
    options: GroupByOptions,
) -> Result<(Vec<IndexLabel>, HashMap<IndexLabel, usize>), GroupByError> {
    let mut ordering = Vec::<IndexLabel>::new();
    let mut counts = HashMap::<IndexLabel, usize>::new();
    for key in keys {
        let Some(label) = group_label(key, options)? else {
            continue;
        };
        let entry = counts.entry(label.clone()).or_insert_with(|| {
            ordering.push(label);
            0
        });
        *entry += 1;
    }
    if options.sort {
        ordering.sort();
    }
    Ok((ordering, counts))
}

fn count_scalar(count: usize) -> Scalar {
    Scalar::Int64(i64::try_from(count).unwrap_or(i64::MAX))
}

/// Number of rows per group.
///
/// Matches `df.groupby(by).size()`: the result is an `Int64` Series named
/// `size` indexed by group key.
pub fn groupby_size(
    frame: &DataFrame,
    by: &str,
    options: GroupByOptions,
) -> Result<Series, GroupByError> {
    let keys = frame.require_column(by)?;
    let (ordering, counts) = count_by_key(keys.values(), options)?;

    let values = ordering
        .iter()
        .map(|label| count_scalar(counts[label]))
        .collect::<Vec<_>>();
    let column = Column::new(DType::Int64, values)?;
    Ok(Series::new("size", Index::new(ordering), column)?)
}

/// Row counts per `(by, column)` pair, pivoted into a key x category matrix.
///
/// Matches `df.groupby([by, column]).size().unstack(fill_value=0)`: one row
/// per group key, one `Int64` column per observed category (named by the
/// category's text form, ascending), absent pairs filled with `0`. Rows
/// whose key or category is missing are skipped.
pub fn groupby_size_unstack(
    frame: &DataFrame,
    by: &str,
    column: &str,
    options: GroupByOptions,
) -> Result<DataFrame, GroupByError> {
    let keys = frame.require_column(by)?;
    let categories = frame.require_column(column)?;

    let mut key_ordering = Vec::<IndexLabel>::new();
    let mut key_slots = HashMap::<IndexLabel, usize>::new();
    let mut cells = BTreeMap::<IndexLabel, HashMap<usize, usize>>::new();

    for (key, category) in keys.values().iter().zip(categories.values()) {
        let Some(key_label) = group_label(key, options)? else {
            continue;
        };
        let Some(category_label) = group_label(category, options)? else {
            continue;
        };
        let next_slot = key_slots.len();
        let slot = *key_slots.entry(key_label.clone()).or_insert_with(|| {
            key_ordering.push(key_label);
            next_slot
        });
        *cells
            .entry(category_label)
            .or_default()
            .entry(slot)
            .or_insert(0) += 1;
    }

    let mut row_order: Vec<usize> = (0..key_ordering.len()).collect();
    if options.sort {
        row_order.sort_by(|&a, &b| key_ordering[a].cmp(&key_ordering[b]));
    }

    let mut columns = BTreeMap::new();
    let mut column_order = Vec::with_capacity(cells.len());
    for (category, per_key) in &cells {
        let name = category.to_string();
        let values = row_order
            .iter()
            .map(|slot| count_scalar(per_key.get(slot).copied().unwrap_or(0)))
            .collect::<Vec<_>>();
        if columns
            .insert(name.clone(), Column::new(DType::Int64, values)?)
            .is_some()
        {
            return Err(FrameError::CompatibilityRejected(format!(
                "categories render to the duplicate column name '{name}'"
            ))
            .into());
        }
        column_order.push(name);
    }

    let index = Index::new(
        row_order
            .iter()
            .map(|&slot| key_ordering[slot].clone())
            .collect(),
    );
    Ok(DataFrame::new_with_column_order(
        index,
        columns,
        column_order,
    )?)
}

#[cfg(test)]
mod tests {
    use fe_frame::DataFrame;
    use fe_index::IndexLabel;
    use fe_types::{NullKind, Scalar};

    use super::{GroupByError, GroupByOptions, groupby_size, groupby_size_unstack};

    fn utf8(value: &str) -> Scalar {
        Scalar::Utf8(value.to_owned())
    }

    fn frame() -> DataFrame {
        DataFrame::from_dict(vec![
            (
                "g",
                vec![utf8("y"), utf8("x"), utf8("y"), Scalar::Null(NullKind::Null)],
            ),
            ("c", vec![utf8("b"), utf8("a"), utf8("a"), utf8("a")]),
        ])
        .expect("frame")
    }

    #[test]
    fn size_counts_rows_per_sorted_key() {
        let out = groupby_size(&frame(), "g", GroupByOptions::default()).expect("size");
        assert_eq!(out.index().labels(), &["x".into(), "y".into()]);
        assert_eq!(out.values(), &[Scalar::Int64(1), Scalar::Int64(2)]);
    }

    #[test]
    fn size_can_keep_first_seen_order() {
        let options = GroupByOptions {
            dropna: true,
            sort: false,
        };
        let out = groupby_size(&frame(), "g", options).expect("size");
        assert_eq!(out.index().labels(), &["y".into(), "x".into()]);
    }

    #[test]
    fn size_rejects_missing_keys_without_dropna() {
        let options = GroupByOptions {
            dropna: false,
            sort: true,
        };
        assert!(matches!(
            groupby_size(&frame(), "g", options),
            Err(GroupByError::MissingKeyUnsupported)
        ));
    }

    #[test]
    fn size_reports_missing_column() {
        assert!(matches!(
            groupby_size(&frame(), "nope", GroupByOptions::default()),
            Err(GroupByError::Frame(fe_frame::FrameError::MissingColumn { .. }))
        ));
    }

    #[test]
    fn unstack_zero_fills_absent_pairs() {
        let out = groupby_size_unstack(&frame(), "g", "c", GroupByOptions::default())
            .expect("unstack");
        assert_eq!(out.column_names(), vec!["a", "b"]);
        assert_eq!(
            out.index().labels(),
            &[IndexLabel::from("x"), IndexLabel::from("y")]
        );
        assert_eq!(
            out.column("a").expect("a").values(),
            &[Scalar::Int64(1), Scalar::Int64(1)]
        );
        assert_eq!(
            out.column("b").expect("b").values(),
            &[Scalar::Int64(0), Scalar::Int64(1)]
        );
    }

    #[test]
    fn unstack_skips_missing_categories() {
        let frame = DataFrame::from_dict(vec![
            ("g", vec![Scalar::Int64(1), Scalar::Int64(1)]),
            ("c", vec![utf8("a"), Scalar::Null(NullKind::Null)]),
        ])
        .expect("frame");
        let out =
            groupby_size_unstack(&frame, "g", "c", GroupByOptions::default()).expect("unstack");
        assert_eq!(out.column_names(), vec!["a"]);
        assert_eq!(out.column("a").expect("a").values(), &[Scalar::Int64(1)]);
    }
}
