use std::time::Duration;

use cohort_compute::ClusteringError;

/// Fatal failures of a segmentation run.
///
/// Collaborator failures (copy generation) are not here: they degrade the
/// run instead of failing it.
#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("clustering input rejected: {0}")]
    Clustering(#[from] ClusteringError),
    /// Labels (or matrix rows) and customer records differ in length.
    #[error("misaligned input: {labels} labels for {customers} customers")]
    MisalignedInput { labels: usize, customers: usize },
    /// Matrix row ids are not in customer order.
    #[error("matrix row {row} is '{found}', expected customer '{expected}'")]
    ReorderedInput {
        row: usize,
        expected: String,
        found: String,
    },
    /// The blocking clustering task panicked or was cancelled.
    #[error("clustering task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("segmentation run exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}
