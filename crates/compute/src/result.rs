use serde::{Deserialize, Serialize};

use crate::matrix::FeatureVector;

/// Label reserved for DBSCAN noise / unclustered points.
pub const NOISE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Kmeans,
    Dbscan,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Kmeans => write!(f, "kmeans"),
            Algorithm::Dbscan => write!(f, "dbscan"),
        }
    }
}

/// Output of one clustering run.
///
/// `labels[i]` is the cluster of matrix row `i`: `0..cluster_count`, or
/// [`NOISE`] for DBSCAN outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub algorithm: Algorithm,
    pub cluster_count: usize,
    pub labels: Vec<i32>,
    /// Final centroids (K-Means only).
    pub centroids: Option<Vec<FeatureVector>>,
    /// Mean silhouette in [-1, 1]; 0 when undefined.
    pub quality_score: f64,
    /// Lloyd iterations performed (K-Means only).
    pub iterations: Option<usize>,
    /// Sum of squared distances to assigned centroids (K-Means only).
    pub inertia: Option<f64>,
}

impl ClusteringResult {
    /// Row indices assigned to `cluster`, in matrix order.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l >= 0 && l as usize == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Member count per cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.cluster_count];
        for &l in &self.labels {
            if l >= 0 {
                if let Some(s) = sizes.get_mut(l as usize) {
                    *s += 1;
                }
            }
        }
        sizes
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }
}
