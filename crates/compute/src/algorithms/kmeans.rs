use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::distance::squared_euclidean;
use super::silhouette::silhouette_score;
use crate::error::ClusteringError;
use crate::matrix::{FeatureMatrix, FeatureVector};
use crate::result::{Algorithm, ClusteringResult};

/// K-Means parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParams {
    /// Number of clusters (must be >= 1 and <= number of points).
    pub k: usize,
    /// Upper bound on Lloyd's iterations.
    pub max_iterations: usize,
    /// Seed for centroid sampling. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Independent restarts; the labeling with the best silhouette is kept.
    pub trials: usize,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 5,
            max_iterations: 100,
            seed: None,
            trials: 1,
        }
    }
}

impl KMeansParams {
    pub fn new(k: usize) -> Self {
        Self { k, ..Self::default() }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Run Lloyd's K-means.
///
/// Centroids are initialized from `k` distinct rows sampled uniformly at
/// random, then refined until the assignment stops changing or
/// `max_iterations` is reached. Only a local optimum is found: fix the seed
/// for reproducible output, or raise `trials` to keep the best of several
/// restarts (trial `t` uses seed `seed + t`).
///
/// A centroid that loses every member is re-seeded onto the point that is
/// currently farthest from its own centroid rather than left in place.
pub fn kmeans(matrix: &FeatureMatrix, params: &KMeansParams) -> Result<ClusteringResult, ClusteringError> {
    let n = matrix.len();
    if n == 0 {
        return Err(ClusteringError::EmptyMatrix);
    }
    if params.k == 0 || params.k > n {
        return Err(ClusteringError::InvalidK { k: params.k, points: n });
    }

    let mut best = kmeans_trial(matrix, params, 0)?;
    for trial in 1..params.trials.max(1) {
        let candidate = kmeans_trial(matrix, params, trial)?;
        if candidate.quality_score > best.quality_score {
            best = candidate;
        }
    }

    info!(
        k = params.k,
        points = n,
        iterations = best.iterations.unwrap_or_default(),
        quality_score = best.quality_score,
        "K-means complete"
    );
    Ok(best)
}

/// One seeded restart of Lloyd's algorithm, scored by silhouette.
fn kmeans_trial(
    matrix: &FeatureMatrix,
    params: &KMeansParams,
    trial: usize,
) -> Result<ClusteringResult, ClusteringError> {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(trial as u64)),
        None => StdRng::from_entropy(),
    };

    let run = lloyd(matrix.rows(), params.k, params.max_iterations.max(1), &mut rng);
    let labels: Vec<i32> = run.labels.iter().map(|&l| l as i32).collect();
    let quality_score = silhouette_score(matrix, &labels)?;

    debug!(
        trial,
        iterations = run.iterations,
        inertia = run.inertia,
        quality_score,
        "k-means trial finished"
    );

    Ok(ClusteringResult {
        algorithm: Algorithm::Kmeans,
        cluster_count: params.k,
        labels,
        centroids: Some(run.centroids),
        quality_score,
        iterations: Some(run.iterations),
        inertia: Some(run.inertia),
    })
}

/// Run K-means for each K in `k_range` and return the result with the best
/// silhouette score.
///
/// K values below 2 or not smaller than the number of points are skipped.
/// When nothing in the range is usable, falls back to `params.k`.
pub fn best_k_means(
    matrix: &FeatureMatrix,
    k_range: std::ops::Range<usize>,
    params: &KMeansParams,
) -> Result<ClusteringResult, ClusteringError> {
    if matrix.is_empty() {
        return Err(ClusteringError::EmptyMatrix);
    }

    let mut best: Option<ClusteringResult> = None;

    for k in k_range {
        if k < 2 || k >= matrix.len() {
            continue;
        }

        let result = kmeans(matrix, &KMeansParams { k, ..params.clone() })?;
        let better = best
            .as_ref()
            .map_or(true, |b| result.quality_score > b.quality_score);
        if better {
            best = Some(result);
        }
    }

    match best {
        Some(result) => Ok(result),
        None => kmeans(matrix, params),
    }
}

/// Label each point with the index of its nearest centroid.
///
/// Ties go to the lowest centroid index, so the output is a pure function of
/// its inputs.
pub fn assign_labels(rows: &[FeatureVector], centroids: &[FeatureVector]) -> Vec<usize> {
    rows.iter().map(|row| nearest_centroid(row, centroids)).collect()
}

/// Outcome of a single Lloyd's run.
#[derive(Debug, Clone)]
pub(crate) struct LloydRun {
    pub labels: Vec<usize>,
    pub centroids: Vec<FeatureVector>,
    pub iterations: usize,
    pub inertia: f64,
    /// Inertia measured right after each assignment step.
    pub inertia_trace: Vec<f64>,
    /// How many times an empty centroid was re-seeded.
    pub reseeded: usize,
}

pub(crate) fn lloyd(
    rows: &[FeatureVector],
    k: usize,
    max_iterations: usize,
    rng: &mut StdRng,
) -> LloydRun {
    let mut centroids = sample_centroids(rows, k, rng);
    let mut labels: Vec<usize> = Vec::new();
    let mut inertia_trace = Vec::new();
    let mut iterations = 0;
    let mut reseeded = 0;

    for _ in 0..max_iterations {
        iterations += 1;

        let assigned = assign_labels(rows, &centroids);
        inertia_trace.push(inertia(rows, &assigned, &centroids));

        // Same labeling as last round: centroids are already its means.
        if assigned == labels {
            break;
        }

        let (mut next, counts) = recompute_centroids(rows, &assigned, k);
        reseeded += reseed_empty(rows, &assigned, &mut next, &counts);

        centroids = next;
        labels = assigned;
    }

    let inertia = inertia(rows, &labels, &centroids);
    LloydRun {
        labels,
        centroids,
        iterations,
        inertia,
        inertia_trace,
        reseeded,
    }
}

// ── Internal helpers ─────────────────────────────────────────

/// Pick `k` distinct rows uniformly at random as initial centroids.
fn sample_centroids(rows: &[FeatureVector], k: usize, rng: &mut StdRng) -> Vec<FeatureVector> {
    rand::seq::index::sample(rng, rows.len(), k)
        .into_iter()
        .map(|i| rows[i].clone())
        .collect()
}

/// Element-wise mean of each cluster's members. Empty clusters come back as
/// zero vectors with a zero count; the caller must re-seed them.
fn recompute_centroids(
    rows: &[FeatureVector],
    labels: &[usize],
    k: usize,
) -> (Vec<FeatureVector>, Vec<usize>) {
    let dim = rows.first().map(Vec::len).unwrap_or(0);
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];

    for (row, &cluster) in rows.iter().zip(labels) {
        counts[cluster] += 1;
        for (acc, &val) in sums[cluster].iter_mut().zip(row) {
            *acc += val;
        }
    }

    for (centroid, &count) in sums.iter_mut().zip(&counts) {
        if count > 0 {
            let count = count as f64;
            for val in centroid.iter_mut() {
                *val /= count;
            }
        }
    }

    (sums, counts)
}

/// Move every empty centroid onto the point farthest from its own centroid.
/// Each point is used at most once. Returns the number of centroids moved.
fn reseed_empty(
    rows: &[FeatureVector],
    labels: &[usize],
    centroids: &mut [FeatureVector],
    counts: &[usize],
) -> usize {
    let empty: Vec<usize> = (0..counts.len()).filter(|&c| counts[c] == 0).collect();
    if empty.is_empty() {
        return 0;
    }

    let mut by_distance: Vec<(usize, f64)> = rows
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(i, (row, &c))| (i, squared_euclidean(row, &centroids[c])))
        .collect();
    // Farthest first; equal distances keep row order.
    by_distance.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (&cluster, &(point, _)) in empty.iter().zip(&by_distance) {
        warn!(cluster, point, "k-means centroid lost all members, re-seeding");
        centroids[cluster] = rows[point].clone();
    }

    empty.len().min(by_distance.len())
}

/// Find the index of the nearest centroid.
fn nearest_centroid(point: &[f64], centroids: &[FeatureVector]) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f64::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_euclidean(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }
    best_idx
}

/// Sum of squared distances from each point to its assigned centroid.
fn inertia(rows: &[FeatureVector], labels: &[usize], centroids: &[FeatureVector]) -> f64 {
    rows.iter()
        .zip(labels)
        .map(|(row, &c)| squared_euclidean(row, &centroids[c]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand_distr::{Distribution, Normal};

    /// Two groups of ten around [0.9,0.9,0.1,0.1] and [0.1,0.1,0.9,0.9].
    fn two_groups(seed: u64) -> FeatureMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.05).unwrap();
        let centers = [[0.9, 0.9, 0.1, 0.1], [0.1, 0.1, 0.9, 0.9]];
        let mut rows = Vec::new();
        for center in centers {
            for _ in 0..10 {
                rows.push(center.iter().map(|c| c + noise.sample(&mut rng)).collect());
            }
        }
        FeatureMatrix::from_rows(rows).unwrap()
    }

    /// Helper: generate points in well-separated clusters for testing.
    fn make_clusters(centers: &[(f64, f64)], points_per_cluster: usize) -> FeatureMatrix {
        let mut rows = Vec::new();
        for &(cx, cy) in centers {
            for i in 0..points_per_cluster {
                let offset = (i as f64) * 0.1;
                rows.push(vec![cx + offset, cy + offset]);
            }
        }
        FeatureMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn separates_two_synthetic_customer_groups() {
        for seed in [1, 2, 3] {
            let m = two_groups(seed);
            let params = KMeansParams::new(2).with_seed(seed).with_trials(5);
            let result = kmeans(&m, &params).unwrap();

            assert_eq!(result.cluster_count, 2);
            assert_eq!(result.labels.len(), 20);
            assert!(result.quality_score > 0.6, "silhouette score = {}", result.quality_score);

            let a = result.labels[0];
            let b = result.labels[10];
            assert_ne!(a, b);
            assert!(result.labels[..10].iter().all(|&l| l == a));
            assert!(result.labels[10..].iter().all(|&l| l == b));
        }
    }

    #[test]
    fn three_clusters() {
        let m = make_clusters(&[(0.0, 0.0), (50.0, 50.0), (100.0, 100.0)], 15);
        let result = kmeans(&m, &KMeansParams::new(3).with_seed(11).with_trials(5)).unwrap();

        let c0 = result.labels[0];
        let c1 = result.labels[15];
        let c2 = result.labels[30];
        assert!(result.labels[..15].iter().all(|&l| l == c0));
        assert!(result.labels[15..30].iter().all(|&l| l == c1));
        assert!(result.labels[30..].iter().all(|&l| l == c2));
        assert_ne!(c0, c1);
        assert_ne!(c1, c2);
        assert_ne!(c0, c2);
        assert_eq!(result.centroids.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn single_cluster_has_zero_quality() {
        let m = make_clusters(&[(5.0, 5.0)], 20);
        let result = kmeans(&m, &KMeansParams::new(1).with_seed(3)).unwrap();
        assert!(result.labels.iter().all(|&l| l == 0));
        assert_eq!(result.quality_score, 0.0);
    }

    #[test]
    fn zero_trials_runs_once_and_more_trials_keep_the_best() {
        let m = two_groups(4);
        let once = kmeans(&m, &KMeansParams::new(3).with_seed(8).with_trials(1)).unwrap();
        let zero = kmeans(&m, &KMeansParams::new(3).with_seed(8).with_trials(0)).unwrap();
        assert_eq!(zero, once);

        let many = kmeans(&m, &KMeansParams::new(3).with_seed(8).with_trials(6)).unwrap();
        assert!(many.quality_score >= once.quality_score);
    }

    #[test]
    fn same_seed_same_result() {
        let m = two_groups(9);
        let params = KMeansParams::new(3).with_seed(42);
        assert_eq!(kmeans(&m, &params).unwrap(), kmeans(&m, &params).unwrap());
    }

    #[test]
    fn assignment_is_deterministic_given_centroids() {
        let m = two_groups(4);
        let centroids = vec![vec![0.5; 4], vec![0.9, 0.9, 0.1, 0.1], vec![0.1, 0.1, 0.9, 0.9]];
        let first = assign_labels(m.rows(), &centroids);
        let second = assign_labels(m.rows(), &centroids);
        assert_eq!(first, second);
    }

    #[test]
    fn assignment_ties_go_to_lowest_index() {
        let rows = vec![vec![0.5, 0.5]];
        let centroids = vec![vec![1.0, 0.5], vec![0.0, 0.5], vec![0.5, 1.0]];
        assert_eq!(assign_labels(&rows, &centroids), vec![0]);
    }

    #[test]
    fn inertia_never_increases_between_iterations() {
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let rows: Vec<FeatureVector> = (0..40)
                .map(|_| (0..4).map(|_| rng.gen::<f64>()).collect())
                .collect();
            let run = lloyd(&rows, 4, 100, &mut rng);
            for pair in run.inertia_trace.windows(2) {
                assert!(
                    pair[1] <= pair[0] + 1e-9,
                    "seed {}: inertia rose {} -> {}",
                    seed,
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn empty_cluster_is_reseeded_onto_a_data_point() {
        // Identical rows: the second centroid loses every tie and goes empty.
        let rows = vec![vec![1.0, 1.0]; 5];
        let mut rng = StdRng::seed_from_u64(0);
        let run = lloyd(&rows, 2, 10, &mut rng);

        assert!(run.reseeded > 0);
        for centroid in &run.centroids {
            assert_eq!(centroid, &vec![1.0, 1.0], "centroid collapsed to {:?}", centroid);
        }
    }

    #[test]
    fn converges_quickly_on_separable_data() {
        let m = make_clusters(&[(0.0, 0.0), (1000.0, 1000.0)], 5);
        let result = kmeans(&m, &KMeansParams::new(2).with_seed(5)).unwrap();
        assert!(result.iterations.unwrap() <= 5, "iterations: {:?}", result.iterations);
        assert!(result.inertia.unwrap() >= 0.0);
    }

    #[test]
    fn best_k_means_finds_correct_k() {
        let m = make_clusters(&[(0.0, 0.0), (100.0, 100.0), (200.0, 0.0)], 20);
        let params = KMeansParams::default().with_seed(1).with_trials(3);
        let result = best_k_means(&m, 2..8, &params).unwrap();
        assert_eq!(result.cluster_count, 3, "expected k=3, got k={}", result.cluster_count);
    }

    #[test]
    fn rejects_invalid_input() {
        let empty = FeatureMatrix::from_rows(Vec::new()).unwrap();
        assert_eq!(kmeans(&empty, &KMeansParams::new(1)).unwrap_err(), ClusteringError::EmptyMatrix);

        let m = FeatureMatrix::from_rows(vec![vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(
            kmeans(&m, &KMeansParams::new(0)).unwrap_err(),
            ClusteringError::InvalidK { k: 0, points: 2 }
        );
        assert_eq!(
            kmeans(&m, &KMeansParams::new(3)).unwrap_err(),
            ClusteringError::InvalidK { k: 3, points: 2 }
        );
    }
}
