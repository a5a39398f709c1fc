#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use fe_types::{Scalar, format_timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A float label ordered by `f64::total_cmp`, so float keys sort numerically.
///
/// `-0.0` folds into `0.0`. `NaN` never becomes a label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct FloatKey(f64);

impl FloatKey {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value + 0.0)
    }

    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl From<f64> for FloatKey {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<FloatKey> for f64 {
    fn from(key: FloatKey) -> Self {
        key.0
    }
}

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatKey {}

impl PartialOrd for FloatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for FloatKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IndexLabel {
    Bool(bool),
    Int64(i64),
    Float64(FloatKey),
    Utf8(String),
    Timestamp(i64),
}

impl From<i64> for IndexLabel {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<&str> for IndexLabel {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for IndexLabel {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl fmt::Display for IndexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", if *v { "True" } else { "False" }),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{:?}", v.get()),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", format_timestamp(*v)),
        }
    }
}

impl IndexLabel {
    /// Convert a cell value into a label.
    ///
    /// Missing values, `NaN` included, have no label.
    #[must_use]
    pub fn from_scalar(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Null(_) => None,
            Scalar::Float64(v) if v.is_nan() => None,
            Scalar::Bool(v) => Some(Self::Bool(*v)),
            Scalar::Int64(v) => Some(Self::Int64(*v)),
            Scalar::Float64(v) => Some(Self::Float64(FloatKey::new(*v))),
            Scalar::Utf8(v) => Some(Self::Utf8(v.clone())),
            Scalar::Timestamp(v) => Some(Self::Timestamp(*v)),
        }
    }

    #[must_use]
    pub fn to_scalar(&self) -> Scalar {
        match self {
            Self::Bool(v) => Scalar::Bool(*v),
            Self::Int64(v) => Scalar::Int64(*v),
            Self::Float64(v) => Scalar::Float64(v.get()),
            Self::Utf8(v) => Scalar::Utf8(v.clone()),
            Self::Timestamp(v) => Scalar::Timestamp(*v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    labels: Vec<IndexLabel>,
}

impl Index {
    #[must_use]
    pub fn new(labels: Vec<IndexLabel>) -> Self {
        Self { labels }
    }

    #[must_use]
    pub fn from_i64(values: Vec<i64>) -> Self {
        Self::new(values.into_iter().map(IndexLabel::from).collect())
    }

    /// A default `0..len` integer index.
    pub fn range(len: usize) -> Result<Self, IndexError> {
        let len_i64 = i64::try_from(len).map_err(|_| IndexError::RangeTooLong { len })?;
        Ok(Self::from_i64((0..len_i64).collect()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn labels(&self) -> &[IndexLabel] {
        &self.labels
    }

    /// For each label of `target`, the first position it has in `self`.
    ///
    /// Drives `reindex`: `None` marks labels that need a fill value.
    #[must_use]
    pub fn get_indexer(&self, target: &Index) -> Vec<Option<usize>> {
        let mut first_seen = HashMap::with_capacity(self.labels.len());
        for (position, label) in self.labels.iter().enumerate() {
            first_seen.entry(label).or_insert(position);
        }
        target
            .labels
            .iter()
            .map(|label| first_seen.get(label).copied())
            .collect()
    }

    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        Self::new(indices.iter().map(|&i| self.labels[i].clone()).collect())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("cannot materialize a range index of length {len} on this platform")]
    RangeTooLong { len: usize },
}
