use std::collections::VecDeque;

use rayon::prelude::*;
use tracing::{info, warn};

use super::distance::squared_euclidean;
use super::silhouette::silhouette_score;
use crate::error::ClusteringError;
use crate::matrix::FeatureMatrix;
use crate::result::{Algorithm, ClusteringResult, NOISE};

/// DBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbscanParams {
    /// Neighborhood radius (Euclidean distance).
    pub eps: f64,
    /// Minimum neighborhood size, including the point itself, for a core point.
    pub min_pts: usize,
}

impl Default for DbscanParams {
    fn default() -> Self {
        Self { eps: 0.5, min_pts: 5 }
    }
}

impl DbscanParams {
    pub fn new(eps: f64, min_pts: usize) -> Self {
        Self { eps, min_pts }
    }
}

/// Run DBSCAN density-based clustering.
///
/// Points that end up in no cluster keep the [`NOISE`] label. For the
/// quality score only, noise is folded into label 0; the returned labels
/// are not rewritten.
pub fn dbscan(matrix: &FeatureMatrix, params: &DbscanParams) -> Result<ClusteringResult, ClusteringError> {
    if matrix.is_empty() {
        return Err(ClusteringError::EmptyMatrix);
    }
    if !params.eps.is_finite() || params.eps <= 0.0 {
        return Err(ClusteringError::InvalidEps(params.eps));
    }
    if params.min_pts == 0 {
        return Err(ClusteringError::InvalidMinPts(params.min_pts));
    }

    let rows = matrix.rows();
    let n = rows.len();
    let eps_sq = params.eps * params.eps;

    // Pre-compute pairwise neighbor lists to avoid redundant distance calculations.
    let neighbors: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .filter(|&j| squared_euclidean(&rows[i], &rows[j]) <= eps_sq)
                .collect()
        })
        .collect();
    let is_core = |i: usize| neighbors[i].len() >= params.min_pts;

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut current_cluster = 0usize;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        if !is_core(i) {
            // Tentatively noise; a later expansion may still claim it.
            continue;
        }

        labels[i] = Some(current_cluster);

        let mut queue: VecDeque<usize> = neighbors[i]
            .iter()
            .copied()
            .filter(|&j| j != i)
            .collect();

        while let Some(j) = queue.pop_front() {
            if labels[j].is_none() {
                labels[j] = Some(current_cluster);
            }

            if visited[j] {
                continue;
            }
            visited[j] = true;

            if is_core(j) {
                for &nb in &neighbors[j] {
                    if labels[nb].is_none() {
                        queue.push_back(nb);
                    }
                }
            }
        }

        current_cluster += 1;
    }

    let labels: Vec<i32> = labels
        .iter()
        .map(|l| l.map_or(NOISE, |c| c as i32))
        .collect();

    let scoring: Vec<i32> = labels
        .iter()
        .map(|&l| if l == NOISE { 0 } else { l })
        .collect();
    let quality_score = silhouette_score(matrix, &scoring)?;

    let noise = labels.iter().filter(|&&l| l == NOISE).count();
    if current_cluster == 0 {
        warn!(points = n, eps = params.eps, min_pts = params.min_pts, "DBSCAN found only noise");
    }
    info!(
        clusters = current_cluster,
        noise,
        points = n,
        quality_score,
        "DBSCAN complete"
    );

    Ok(ClusteringResult {
        algorithm: Algorithm::Dbscan,
        cluster_count: current_cluster,
        labels,
        centroids: None,
        quality_score,
        iterations: None,
        inertia: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn single_point_is_noise() {
        let result = dbscan(&matrix(vec![vec![0.0, 0.0]]), &DbscanParams::new(1.0, 2)).unwrap();
        assert_eq!(result.cluster_count, 0);
        assert_eq!(result.labels, vec![NOISE]);
        assert_eq!(result.quality_score, 0.0);
    }

    #[test]
    fn two_clusters_well_separated() {
        let m = matrix(vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![100.0, 100.0],
            vec![101.0, 100.0],
            vec![100.0, 101.0],
        ]);
        let result = dbscan(&m, &DbscanParams::new(2.0, 2)).unwrap();

        assert_eq!(result.cluster_count, 2);
        assert_eq!(result.noise_count(), 0);
        assert_eq!(result.labels, vec![0, 0, 0, 1, 1, 1]);
        assert!(result.quality_score > 0.9);
    }

    #[test]
    fn noise_points_detected() {
        let m = matrix(vec![
            vec![0.0, 0.0],
            vec![0.5, 0.0],
            vec![0.0, 0.5],
            vec![50.0, 50.0], // outlier
            vec![10.0, 10.0],
            vec![10.5, 10.0],
            vec![10.0, 10.5],
        ]);
        let result = dbscan(&m, &DbscanParams::new(1.0, 2)).unwrap();

        assert_eq!(result.cluster_count, 2);
        assert_eq!(result.labels[3], NOISE);
        assert_eq!(result.noise_count(), 1);
    }

    #[test]
    fn scattered_points_are_all_noise() {
        let mut rng = StdRng::seed_from_u64(2024);
        let rows: Vec<Vec<f64>> = (0..15)
            .map(|_| (0..4).map(|_| rng.gen::<f64>()).collect())
            .collect();
        let result = dbscan(&matrix(rows), &DbscanParams::new(0.1, 5)).unwrap();

        assert_eq!(result.cluster_count, 0);
        assert!(result.labels.iter().all(|&l| l == NOISE));
        assert_eq!(result.quality_score, 0.0);
    }

    #[test]
    fn chain_connectivity() {
        // Each point is within eps of its neighbor; endpoints are far apart.
        let rows = (0..10).map(|i| vec![i as f64]).collect();
        let result = dbscan(&matrix(rows), &DbscanParams::new(1.5, 2)).unwrap();

        assert_eq!(result.cluster_count, 1);
        assert_eq!(result.noise_count(), 0);
    }

    #[test]
    fn border_point_assigned_to_cluster() {
        // (2.0) is within eps of the core point (1.0) but is not core itself.
        let m = matrix(vec![vec![0.0], vec![0.5], vec![1.0], vec![2.0]]);
        let result = dbscan(&m, &DbscanParams::new(1.2, 3)).unwrap();
        assert_eq!(result.labels[3], 0, "border point should be assigned to a cluster");
    }

    #[test]
    fn labels_are_noise_or_below_cluster_count() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            let rows: Vec<Vec<f64>> = (0..60)
                .map(|_| (0..2).map(|_| rng.gen::<f64>()).collect())
                .collect();
            let result = dbscan(&matrix(rows), &DbscanParams::new(0.12, 3)).unwrap();
            assert_eq!(result.labels.len(), 60);
            for &l in &result.labels {
                assert!(l == NOISE || (l >= 0 && (l as usize) < result.cluster_count));
            }
            assert!((-1.0..=1.0).contains(&result.quality_score));
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        let m = matrix(vec![vec![0.0]]);
        assert_eq!(
            dbscan(&m, &DbscanParams::new(0.0, 2)).unwrap_err(),
            ClusteringError::InvalidEps(0.0)
        );
        assert!(matches!(
            dbscan(&m, &DbscanParams::new(f64::NAN, 2)),
            Err(ClusteringError::InvalidEps(_))
        ));
        assert_eq!(
            dbscan(&m, &DbscanParams::new(0.5, 0)).unwrap_err(),
            ClusteringError::InvalidMinPts(0)
        );
        let empty = matrix(Vec::new());
        assert_eq!(
            dbscan(&empty, &DbscanParams::default()).unwrap_err(),
            ClusteringError::EmptyMatrix
        );
    }
}
