use cohort_core::CustomerId;
use serde::{Deserialize, Serialize};

use crate::error::ClusteringError;

/// One customer's normalized feature row.
pub type FeatureVector = Vec<f64>;

/// Feature rows index-aligned with their customer ids.
///
/// Construction validates the batch invariants once: equal id/row counts,
/// identical row width and finite values. Once built the matrix is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    ids: Vec<CustomerId>,
    rows: Vec<FeatureVector>,
    dim: usize,
}

impl FeatureMatrix {
    pub fn new(ids: Vec<CustomerId>, rows: Vec<FeatureVector>) -> Result<Self, ClusteringError> {
        if ids.len() != rows.len() {
            return Err(ClusteringError::MisalignedInput {
                expected: ids.len(),
                found: rows.len(),
            });
        }

        let dim = rows.first().map(Vec::len).unwrap_or(0);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(ClusteringError::DimensionMismatch {
                    expected: dim,
                    found: row.len(),
                });
            }
            if let Some(column) = row.iter().position(|v| !v.is_finite()) {
                return Err(ClusteringError::NonFinite { row: r, column });
            }
        }

        Ok(Self { ids, rows, dim })
    }

    /// Build a matrix with positional ids ("0", "1", ...).
    pub fn from_rows(rows: Vec<FeatureVector>) -> Result<Self, ClusteringError> {
        let ids = (0..rows.len()).map(|i| i.to_string()).collect();
        Self::new(ids, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of every row (0 for an empty matrix).
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn ids(&self) -> &[CustomerId] {
        &self.ids
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }
}
