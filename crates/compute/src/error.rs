/// Input-validation failures raised before any clustering work starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClusteringError {
    #[error("feature matrix is empty")]
    EmptyMatrix,
    #[error("dimension mismatch: expected {expected} features, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid k={k} for {points} points")]
    InvalidK { k: usize, points: usize },
    #[error("invalid eps {0}: must be finite and > 0")]
    InvalidEps(f64),
    #[error("invalid min_pts {0}: must be >= 1")]
    InvalidMinPts(usize),
    #[error("non-finite feature value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
    /// Two index-aligned sequences disagree in length (ids vs rows, labels vs rows).
    #[error("misaligned input: expected {expected} entries, found {found}")]
    MisalignedInput { expected: usize, found: usize },
}
