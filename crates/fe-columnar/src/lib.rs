#![forbid(unsafe_code)]

use fe_types::{
    DType, Scalar, TypeError, cast_scalar, common_dtype, infer_dtype,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    dtype: DType,
    values: Vec<Scalar>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("row position {position} out of bounds for column length {len}")]
    PositionOutOfBounds { position: usize, len: usize },
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl Column {
    /// Construct a column, coercing values to the target dtype.
    ///
    /// Values that already carry the target dtype are moved, not cloned;
    /// every missing marker is normalized to the dtype's own marker.
    pub fn new(dtype: DType, values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let coerced = values
            .into_iter()
            .map(|value| match value {
                Scalar::Null(_) => Ok(Scalar::missing_for_dtype(dtype)),
                other if other.dtype() == dtype => Ok(other),
                other => cast_scalar(other, dtype),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dtype,
            values: coerced,
        })
    }

    pub fn from_values(values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let dtype = infer_dtype(&values)?;
        Self::new(dtype, values)
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, idx: usize) -> Option<&Scalar> {
        self.values.get(idx)
    }

    /// Gather values at `positions`, filling `None` slots with `fill`.
    ///
    /// Matches `reindex(..., fill_value=fill)` when the fill's dtype combines
    /// with the column's: an `Int64` column stays `Int64` under a `0` fill
    /// and widens to `Float64` under `0.5`. A fill that does not combine
    /// (a `0` into a `Utf8` column) keeps the column dtype and fills with
    /// its missing marker instead.
    pub fn reindex_with_fill(
        &self,
        positions: &[Option<usize>],
        fill: &Scalar,
    ) -> Result<Self, ColumnError> {
        let (dtype, fill) = if fill.is_missing() {
            (self.dtype, Scalar::missing_for_dtype(self.dtype))
        } else {
            match common_dtype(self.dtype, fill.dtype()) {
                Ok(dtype) => (dtype, fill.clone()),
                Err(_) => (self.dtype, Scalar::missing_for_dtype(self.dtype)),
            }
        };

        let values = positions
            .iter()
            .map(|slot| match slot {
                Some(idx) => self.values.get(*idx).cloned().ok_or(
                    ColumnError::PositionOutOfBounds {
                        position: *idx,
                        len: self.values.len(),
                    },
                ),
                None => Ok(fill.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(dtype, values)
    }

    /// Gather values at the given row positions, in order.
    pub fn take(&self, positions: &[usize]) -> Result<Self, ColumnError> {
        let values = positions
            .iter()
            .map(|&idx| {
                self.values
                    .get(idx)
                    .cloned()
                    .ok_or(ColumnError::PositionOutOfBounds {
                        position: idx,
                        len: self.values.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(self.dtype, values)
    }

    /// Boolean column marking values contained in `test_values`.
    ///
    /// Missing values never match, so the result has no missing entries.
    pub fn isin(&self, test_values: &[Scalar]) -> Result<Self, ColumnError> {
        let values = self
            .values
            .iter()
            .map(|value| {
                Scalar::Bool(
                    !value.is_missing()
                        && test_values.iter().any(|test| test.semantic_eq(value)),
                )
            })
            .collect();
        Self::new(DType::Bool, values)
    }
}
