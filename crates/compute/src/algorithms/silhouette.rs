use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::warn;

use super::distance::euclidean;
use crate::error::ClusteringError;
use crate::matrix::FeatureMatrix;
use crate::result::NOISE;

/// Compute the mean silhouette score for a labeling.
///
/// For each non-noise point i:
///   a(i) = average distance to other points with the same label
///   b(i) = minimum, over every other label, of the average distance to it
///   s(i) = (b(i) - a(i)) / max(a(i), b(i)), or 0 when both are 0
///
/// Members of singleton clusters score 0.
///
/// Returns the mean s(i) over non-noise points. Range: [-1, 1]. Returns 0
/// when fewer than two distinct non-noise labels exist.
pub fn silhouette_score(matrix: &FeatureMatrix, labels: &[i32]) -> Result<f64, ClusteringError> {
    if labels.len() != matrix.len() {
        return Err(ClusteringError::MisalignedInput {
            expected: matrix.len(),
            found: labels.len(),
        });
    }

    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        if label != NOISE {
            groups.entry(label).or_default().push(i);
        }
    }

    if groups.len() < 2 {
        warn!(labels = groups.len(), "silhouette undefined, fewer than 2 clusters");
        return Ok(0.0);
    }

    let rows = matrix.rows();
    let scored: Vec<usize> = groups.values().flatten().copied().collect();

    // Per-point scores are collected in a fixed order and summed sequentially
    // so the result is bitwise reproducible.
    let per_point: Vec<f64> = scored
        .par_iter()
        .map(|&i| {
            let own = labels[i];
            if groups[&own].len() == 1 {
                return 0.0;
            }
            let mean_to = |members: &[usize], skip_self: bool| -> f64 {
                let (sum, count) = members
                    .iter()
                    .filter(|&&j| !skip_self || j != i)
                    .fold((0.0, 0usize), |(s, c), &j| (s + euclidean(&rows[i], &rows[j]), c + 1));
                if count == 0 { 0.0 } else { sum / count as f64 }
            };

            let a = mean_to(&groups[&own], true);
            let b = groups
                .iter()
                .filter(|(&label, _)| label != own)
                .map(|(_, members)| mean_to(members, false))
                .fold(f64::INFINITY, f64::min);

            let max_ab = a.max(b);
            if max_ab > 0.0 {
                ((b - a) / max_ab).clamp(-1.0, 1.0)
            } else {
                0.0
            }
        })
        .collect();

    Ok(per_point.iter().sum::<f64>() / per_point.len() as f64)
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
    fn well_separated_groups_score_high() {
        let m = matrix(vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
            vec![10.0, 10.1],
        ]);
        let score = silhouette_score(&m, &[0, 0, 0, 1, 1, 1]).unwrap();
        assert!(score > 0.95, "silhouette score = {}", score);
    }

    #[test]
    fn swapped_labels_score_negative() {
        let m = matrix(vec![vec![0.0], vec![0.1], vec![10.0], vec![10.1]]);
        let score = silhouette_score(&m, &[0, 1, 0, 1]).unwrap();
        assert!(score < 0.0, "silhouette score = {}", score);
    }

    #[test]
    fn single_label_is_zero() {
        let m = matrix(vec![vec![0.0], vec![1.0], vec![2.0]]);
        assert_eq!(silhouette_score(&m, &[0, 0, 0]).unwrap(), 0.0);
    }

    #[test]
    fn noise_does_not_count_as_a_cluster() {
        let m = matrix(vec![vec![0.0], vec![1.0], vec![5.0], vec![6.0]]);
        assert_eq!(silhouette_score(&m, &[0, 0, NOISE, NOISE]).unwrap(), 0.0);

        // Noise points are excluded from both the average and the b(i) search.
        let with_noise = silhouette_score(&m, &[0, NOISE, 1, 1]).unwrap();
        let without = silhouette_score(
            &matrix(vec![vec![0.0], vec![5.0], vec![6.0]]),
            &[0, 1, 1],
        )
        .unwrap();
        assert!((with_noise - without).abs() < 1e-12);
    }

    #[test]
    fn coincident_points_in_different_labels_score_zero() {
        let m = matrix(vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
        assert_eq!(silhouette_score(&m, &[0, 1]).unwrap(), 0.0);
    }

    #[test]
    fn stays_within_bounds_for_random_labelings() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..25 {
            let rows: Vec<Vec<f64>> = (0..30)
                .map(|_| (0..3).map(|_| rng.gen::<f64>()).collect())
                .collect();
            let labels: Vec<i32> = (0..30).map(|_| rng.gen_range(-1..4)).collect();
            let score = silhouette_score(&matrix(rows), &labels).unwrap();
            assert!((-1.0..=1.0).contains(&score), "out of range: {}", score);
        }
    }

    #[test]
    fn label_count_must_match_rows() {
        let m = matrix(vec![vec![0.0], vec![1.0]]);
        let err = silhouette_score(&m, &[0]).unwrap_err();
        assert_eq!(err, ClusteringError::MisalignedInput { expected: 2, found: 1 });
    }
}
