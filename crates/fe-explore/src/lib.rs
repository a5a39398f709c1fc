#![forbid(unsafe_code)]

//! Exploratory helpers over record tables: per-group category shares and
//! frequency-based category ordering and filtering.

use std::collections::{BTreeMap, HashSet};

use fe_columnar::{Column, ColumnError};
use fe_frame::{DataFrame, FrameError, Series};
use fe_groupby::{GroupByError, GroupByOptions, groupby_size, groupby_size_unstack};
use fe_index::{Index, IndexLabel};
use fe_period::{Freq, PeriodError, period_range, period_start};
use fe_types::{DType, Scalar, count_na};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("column '{name}' not found in DataFrame; available columns: {available:?}")]
    MissingColumn {
        name: String,
        available: Vec<String>,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    GroupBy(#[from] GroupByError),
    #[error(transparent)]
    Period(#[from] PeriodError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentOptions {
    pub group_col: String,
    /// Bucket width when `group_col` holds timestamps.
    pub freq: Freq,
}

impl Default for PercentOptions {
    fn default() -> Self {
        Self {
            group_col: "week".to_owned(),
            freq: Freq::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Minimum frequency a category needs to be kept.
    pub threshold: f64,
    /// Compare shares of non-missing values instead of raw counts.
    pub normalize: bool,
    /// Regroup kept rows by descending category frequency.
    pub sort_by_common: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            normalize: true,
            sort_by_common: false,
        }
    }
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ExploreError> {
    df.column(name).ok_or_else(|| ExploreError::MissingColumn {
        name: name.to_owned(),
        available: df.column_names().into_iter().cloned().collect(),
    })
}

fn require_series(df: &DataFrame, name: &str) -> Result<Series, ExploreError> {
    require_column(df, name)?;
    Ok(df.series(name)?)
}

/// Replace timestamp keys with the start of their `freq` bucket, dropping
/// `NaT` rows.
///
/// Returns the bucketed frame and every bucket between the first and last
/// observed one.
fn bucket_by_period(
    df: &DataFrame,
    group_col: &str,
    keys: &Column,
    freq: Freq,
) -> Result<(DataFrame, Vec<IndexLabel>), ExploreError> {
    let dropped = count_na(keys.values());
    if dropped > 0 {
        warn!("dropping {dropped} rows with missing '{group_col}' timestamps");
    }
    let frame = df.dropna_subset(group_col)?;

    let starts = frame
        .require_column(group_col)?
        .values()
        .iter()
        .filter_map(|value| match value {
            Scalar::Timestamp(nanos) => Some(period_start(*nanos, freq)),
            _ => None,
        })
        .collect::<Result<Vec<_>, _>>()?;

    let full_range = match (starts.iter().min(), starts.iter().max()) {
        (Some(&first), Some(&last)) => period_range(first, last, freq)?
            .into_iter()
            .map(IndexLabel::Timestamp)
            .collect(),
        _ => Vec::new(),
    };

    let bucketed = Column::new(
        DType::Timestamp,
        starts.into_iter().map(Scalar::Timestamp).collect(),
    )?;
    Ok((frame.with_column(group_col, bucketed)?, full_range))
}

/// Distinct keys in first-seen order. Missing keys share one `None` slot.
fn distinct_key_slots(keys: &Column) -> Vec<Option<IndexLabel>> {
    let mut seen = HashSet::new();
    keys.values()
        .iter()
        .map(IndexLabel::from_scalar)
        .filter(|slot| seen.insert(slot.clone()))
        .collect()
}

fn count_at(column: &Column, row: usize) -> Result<f64, ExploreError> {
    match column.value(row) {
        Some(value) => Ok(value.to_f64().map_err(ColumnError::from)?),
        None => Ok(0.0),
    }
}

/// Share of each category within every group.
///
/// One row per group key over the full key range, the group key first and
/// then one `Float64` column per observed category (ascending). Groups with
/// no rows keep their row, with `NaN` shares. Rows whose category is missing
/// count towards their group's total without getting a column.
///
/// Timestamp group columns are bucketed at `options.freq` and the range is
/// gap-free between the first and last bucket; `NaT` keys are dropped. Any
/// other group column uses its distinct values in first-seen order, where a
/// missing key keeps a row of its own with a missing key and `NaN` shares.
pub fn get_percent(
    df: &DataFrame,
    cat_col: &str,
    options: &PercentOptions,
) -> Result<DataFrame, ExploreError> {
    let group_col = options.group_col.as_str();
    let keys = require_column(df, group_col)?;
    require_column(df, cat_col)?;

    let (frame, slots) = if keys.dtype() == DType::Timestamp {
        let (frame, full_range) = bucket_by_period(df, group_col, keys, options.freq)?;
        debug!(
            "get_percent: bucketing '{group_col}' at {} into {} periods",
            options.freq,
            full_range.len()
        );
        (frame, full_range.into_iter().map(Some).collect::<Vec<_>>())
    } else {
        let slots = distinct_key_slots(keys);
        debug!(
            "get_percent: grouping on {} distinct '{group_col}' values",
            slots.len()
        );
        (df.clone(), slots)
    };
    let full_range = slots.iter().flatten().cloned().collect::<Vec<_>>();

    let zero = Scalar::Int64(0);
    let groupby = GroupByOptions::default();

    let sizes = groupby_size(&frame, group_col, groupby)?;
    let positions = sizes.index().get_indexer(&Index::new(full_range.clone()));
    let totals = sizes.column().reindex_with_fill(&positions, &zero)?;

    let counts = groupby_size_unstack(&frame, group_col, cat_col, groupby)?
        .reindex_with_fill(full_range, &zero)?;
    if counts.has_column(group_col) {
        return Err(FrameError::CompatibilityRejected(format!(
            "category value '{group_col}' collides with the group column name"
        ))
        .into());
    }

    // Row of `counts` and `totals` behind each output slot.
    let mut rows = Vec::with_capacity(slots.len());
    let mut next = 0;
    for slot in &slots {
        rows.push(slot.as_ref().map(|_| next));
        if slot.is_some() {
            next += 1;
        }
    }

    let group_values = slots
        .iter()
        .map(|slot| {
            slot.as_ref()
                .map_or_else(|| Scalar::missing_for_dtype(keys.dtype()), IndexLabel::to_scalar)
        })
        .collect::<Vec<_>>();

    let mut columns = BTreeMap::new();
    let mut column_order = Vec::with_capacity(counts.num_columns() + 1);
    columns.insert(group_col.to_owned(), Column::new(keys.dtype(), group_values)?);
    column_order.push(group_col.to_owned());

    for name in counts.column_names() {
        let count_column = counts.require_column(name)?;
        let shares = rows
            .iter()
            .map(|row| match row {
                Some(row) => {
                    let count = count_at(count_column, *row)?;
                    let total = count_at(&totals, *row)?;
                    Ok(Scalar::Float64(count / total))
                }
                None => Ok(Scalar::Float64(f64::NAN)),
            })
            .collect::<Result<Vec<_>, ExploreError>>()?;
        columns.insert(name.clone(), Column::new(DType::Float64, shares)?);
        column_order.push(name.clone());
    }

    Ok(DataFrame::new_with_column_order(
        Index::range(slots.len()).map_err(FrameError::from)?,
        columns,
        column_order,
    )?)
}

/// Regroup rows so the most frequent categories come first.
///
/// Categories are ordered by descending count, ties by first appearance;
/// rows keep their relative order within a category and rows with a missing
/// category go last. The result has a fresh `0..n` index.
pub fn sort_by_common_categories(df: &DataFrame, cat_col: &str) -> Result<DataFrame, ExploreError> {
    let series = require_series(df, cat_col)?;
    let order = series.value_count_pairs();

    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); order.len() + 1];
    for (row, value) in series.values().iter().enumerate() {
        let rank = order
            .iter()
            .position(|(category, _)| category.semantic_eq(value))
            .unwrap_or(order.len());
        buckets[rank].push(row);
    }
    debug!(
        "sort_by_common_categories: {} categories over {} rows",
        order.len(),
        df.len()
    );

    let positions = buckets.concat();
    Ok(df.take_rows(&positions)?.reset_index(true)?)
}

/// Keep rows whose category frequency reaches `options.threshold`.
///
/// Rows with a missing category are dropped. Kept rows retain their labels
/// unless `options.sort_by_common` regroups them.
pub fn filter_common_categories(
    df: &DataFrame,
    cat_col: &str,
    options: &FilterOptions,
) -> Result<DataFrame, ExploreError> {
    let series = require_series(df, cat_col)?;
    let frequencies = series.value_counts(options.normalize)?;

    let keep = series
        .value_count_pairs()
        .into_iter()
        .zip(frequencies.values())
        .filter(|(_, frequency)| {
            frequency
                .to_f64()
                .is_ok_and(|frequency| frequency >= options.threshold)
        })
        .map(|((category, _), _)| category)
        .collect::<Vec<_>>();
    debug!(
        "filter_common_categories: keeping {} of {} categories at threshold {}",
        keep.len(),
        frequencies.len(),
        options.threshold
    );

    let filtered = df.filter_rows(&series.isin(&keep)?)?;
    if options.sort_by_common {
        sort_by_common_categories(&filtered, cat_col)
    } else {
        Ok(filtered)
    }
}
