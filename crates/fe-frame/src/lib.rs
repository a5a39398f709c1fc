#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use fe_columnar::{Column, ColumnError};
use fe_index::{Index, IndexError, IndexLabel};
use fe_types::{DType, Scalar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("index length ({index_len}) does not match column length ({column_len})")]
    LengthMismatch { index_len: usize, column_len: usize },
    #[error("column '{name}' does not exist in the DataFrame")]
    MissingColumn { name: String },
    #[error("unsupported frame operation: {0}")]
    CompatibilityRejected(String),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: String,
    index: Index,
    column: Column,
}

impl Series {
    pub fn new(name: impl Into<String>, index: Index, column: Column) -> Result<Self, FrameError> {
        if index.len() != column.len() {
            return Err(FrameError::LengthMismatch {
                index_len: index.len(),
                column_len: column.len(),
            });
        }

        Ok(Self {
            name: name.into(),
            index,
            column,
        })
    }

    pub fn from_values(
        name: impl Into<String>,
        index_labels: Vec<IndexLabel>,
        values: Vec<Scalar>,
    ) -> Result<Self, FrameError> {
        let index = Index::new(index_labels);
        let column = Column::from_values(values)?;
        Self::new(name, index, column)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn column(&self) -> &Column {
        &self.column
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        self.column.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.column.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.column.is_empty()
    }

    /// Distinct non-missing values with their occurrence counts.
    ///
    /// Sorted by count descending; ties keep first-appearance order.
    #[must_use]
    pub fn value_count_pairs(&self) -> Vec<(Scalar, usize)> {
        let mut counts: Vec<(Scalar, usize)> = Vec::new();

        for value in self.column.values() {
            if value.is_missing() {
                continue;
            }

            if let Some((_, count)) = counts
                .iter_mut()
                .find(|(existing, _)| existing.semantic_eq(value))
            {
                *count += 1;
            } else {
                counts.push((value.clone(), 1));
            }
        }

        // Stable descending sort keeps first-seen ordering for tied counts.
        counts.sort_by(|(_, left_count), (_, right_count)| right_count.cmp(left_count));
        counts
    }

    /// Matches `pd.Series.value_counts(normalize=...)` with `dropna=True`.
    ///
    /// Raw counts are `Int64`; normalized shares are `Float64` over the
    /// non-missing values.
    pub fn value_counts(&self, normalize: bool) -> Result<Self, FrameError> {
        let counts = self.value_count_pairs();
        let total: usize = counts.iter().map(|(_, count)| count).sum();

        let mut labels = Vec::with_capacity(counts.len());
        let mut values = Vec::with_capacity(counts.len());
        for (value, count) in counts {
            let label = IndexLabel::from_scalar(&value).ok_or_else(|| {
                FrameError::CompatibilityRejected(
                    "value_counts produced a label for a missing value".to_owned(),
                )
            })?;
            labels.push(label);
            values.push(if normalize {
                Scalar::Float64(count as f64 / total as f64)
            } else {
                Scalar::Int64(i64::try_from(count).unwrap_or(i64::MAX))
            });
        }

        let name = if normalize { "proportion" } else { "count" };
        Self::new(name, Index::new(labels), Column::from_values(values)?)
    }

    /// Boolean mask of membership in `test_values`; matches `Series.isin`.
    pub fn isin(&self, test_values: &[Scalar]) -> Result<Self, FrameError> {
        Self::new(
            self.name.clone(),
            self.index.clone(),
            self.column.isin(test_values)?,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    index: Index,
    columns: BTreeMap<String, Column>,
    column_order: Vec<String>,
}

impl DataFrame {
    fn validate_column_lengths(
        index: &Index,
        columns: &BTreeMap<String, Column>,
    ) -> Result<(), FrameError> {
        for column in columns.values() {
            if column.len() != index.len() {
                return Err(FrameError::LengthMismatch {
                    index_len: index.len(),
                    column_len: column.len(),
                });
            }
        }
        Ok(())
    }

    pub fn new_with_column_order(
        index: Index,
        columns: BTreeMap<String, Column>,
        column_order: Vec<String>,
    ) -> Result<Self, FrameError> {
        Self::validate_column_lengths(&index, &columns)?;
        if column_order.len() != columns.len()
            || column_order.iter().any(|name| !columns.contains_key(name))
        {
            return Err(FrameError::CompatibilityRejected(
                "column order must name every column exactly once".to_owned(),
            ));
        }
        Ok(Self {
            index,
            columns,
            column_order,
        })
    }

    /// Build a frame from named value lists, keeping the given column order
    /// and a default `0..n` index.
    ///
    /// Matches `pd.DataFrame({"a": [...], "b": [...]})`.
    pub fn from_dict(data: Vec<(&str, Vec<Scalar>)>) -> Result<Self, FrameError> {
        let len = data.first().map_or(0, |(_, values)| values.len());
        let mut columns = BTreeMap::new();
        let mut column_order = Vec::with_capacity(data.len());
        for (name, values) in data {
            if columns
                .insert(name.to_owned(), Column::from_values(values)?)
                .is_some()
            {
                return Err(FrameError::CompatibilityRejected(format!(
                    "duplicate column name '{name}'"
                )));
            }
            column_order.push(name.to_owned());
        }
        Self::new_with_column_order(Index::range(len)?, columns, column_order)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.column_order.len()
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Column names in observable DataFrame order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&String> {
        self.column_order.iter().collect()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Like [`DataFrame::column`] but fails with [`FrameError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> Result<&Column, FrameError> {
        self.columns
            .get(name)
            .ok_or_else(|| FrameError::MissingColumn {
                name: name.to_owned(),
            })
    }

    /// Extract one column as a Series sharing this frame's index.
    pub fn series(&self, name: &str) -> Result<Series, FrameError> {
        let column = self.require_column(name)?;
        Series::new(name, self.index.clone(), column.clone())
    }

    fn ordered_columns(&self) -> impl Iterator<Item = (&String, &Column)> {
        self.column_order
            .iter()
            .filter_map(|name| self.columns.get(name).map(|column| (name, column)))
    }

    /// Add or replace a column. Matches `df['name'] = values`.
    pub fn with_column(&self, name: impl Into<String>, column: Column) -> Result<Self, FrameError> {
        if column.len() != self.len() {
            return Err(FrameError::LengthMismatch {
                index_len: self.len(),
                column_len: column.len(),
            });
        }
        let name = name.into();
        let mut columns = self.columns.clone();
        columns.insert(name.clone(), column);
        let mut column_order = self.column_order.clone();
        if !column_order.contains(&name) {
            column_order.push(name);
        }
        Self::new_with_column_order(self.index.clone(), columns, column_order)
    }

    /// Filter rows where `mask` is `True`. Matches `df[bool_series]`.
    ///
    /// Mask rows line up with frame rows by position; missing mask values
    /// count as `False`. Kept rows retain their index labels.
    pub fn filter_rows(&self, mask: &Series) -> Result<Self, FrameError> {
        if mask.len() != self.len() {
            return Err(FrameError::LengthMismatch {
                index_len: self.len(),
                column_len: mask.len(),
            });
        }
        if let Some(offending) = mask
            .values()
            .iter()
            .find(|value| !matches!(value, Scalar::Bool(_) | Scalar::Null(_)))
        {
            return Err(FrameError::CompatibilityRejected(format!(
                "boolean mask required for filter_rows; found dtype {:?}",
                offending.dtype()
            )));
        }

        let positions: Vec<usize> = mask
            .values()
            .iter()
            .enumerate()
            .filter_map(|(pos, v)| matches!(v, Scalar::Bool(true)).then_some(pos))
            .collect();
        self.take_rows(&positions)
    }

    /// Select rows by position, in the given order, keeping their labels.
    pub fn take_rows(&self, positions: &[usize]) -> Result<Self, FrameError> {
        if let Some(&position) = positions.iter().find(|&&p| p >= self.len()) {
            return Err(FrameError::CompatibilityRejected(format!(
                "row position {position} out of bounds for length {}",
                self.len()
            )));
        }

        let index = self.index.take(positions);
        let mut columns = BTreeMap::new();
        for (name, column) in self.ordered_columns() {
            columns.insert(name.clone(), column.take(positions)?);
        }
        Self::new_with_column_order(index, columns, self.column_order.clone())
    }

    /// Drop rows whose value in `column` is missing.
    ///
    /// Matches `df.dropna(subset=[column])`.
    pub fn dropna_subset(&self, column: &str) -> Result<Self, FrameError> {
        let subset = self.require_column(column)?;
        let positions: Vec<usize> = subset
            .values()
            .iter()
            .enumerate()
            .filter_map(|(pos, v)| (!v.is_missing()).then_some(pos))
            .collect();
        self.take_rows(&positions)
    }

    /// Replace the index with a default `0..n` range.
    ///
    /// With `drop == false` the old labels become a leading `index` column.
    pub fn reset_index(&self, drop: bool) -> Result<Self, FrameError> {
        let index = Index::range(self.len())?;
        if drop {
            return Self::new_with_column_order(
                index,
                self.columns.clone(),
                self.column_order.clone(),
            );
        }

        if self.columns.contains_key("index") {
            return Err(FrameError::CompatibilityRejected(
                "reset_index cannot insert 'index' column because it already exists".to_owned(),
            ));
        }
        let label_values = self
            .index
            .labels()
            .iter()
            .map(IndexLabel::to_scalar)
            .collect::<Vec<_>>();
        let mut columns = self.columns.clone();
        columns.insert("index".to_owned(), Column::from_values(label_values)?);
        let mut column_order = Vec::with_capacity(self.column_order.len() + 1);
        column_order.push("index".to_owned());
        column_order.extend(self.column_order.iter().cloned());
        Self::new_with_column_order(index, columns, column_order)
    }

    /// Reindex rows onto `new_labels`, filling absent labels with `fill`.
    ///
    /// Matches `df.reindex(labels, fill_value=fill)`. Duplicate source
    /// labels resolve to their first occurrence.
    pub fn reindex_with_fill(
        &self,
        new_labels: Vec<IndexLabel>,
        fill: &Scalar,
    ) -> Result<Self, FrameError> {
        let target = Index::new(new_labels);
        let positions = self.index.get_indexer(&target);
        let mut columns = BTreeMap::new();
        for (name, column) in self.ordered_columns() {
            columns.insert(name.clone(), column.reindex_with_fill(&positions, fill)?);
        }
        Self::new_with_column_order(target, columns, self.column_order.clone())
    }

    /// Dtype of every column, in column order.
    #[must_use]
    pub fn dtypes(&self) -> Vec<(&str, DType)> {
        self.ordered_columns()
            .map(|(name, column)| (name.as_str(), column.dtype()))
            .collect()
    }
}
