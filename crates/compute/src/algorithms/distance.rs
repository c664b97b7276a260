use crate::error::ClusteringError;

/// Euclidean distance between two feature vectors of equal width.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64, ClusteringError> {
    if a.len() != b.len() {
        return Err(ClusteringError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(squared_euclidean(a, b).sqrt())
}

/// Squared Euclidean distance. Callers guarantee equal widths.
#[inline]
pub(crate) fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean distance (with sqrt, for silhouette).
#[inline]
pub(crate) fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_four_five() {
        let d = euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v = [0.2, 0.4, 0.6];
        assert_eq!(euclidean_distance(&v, &v).unwrap(), 0.0);
    }

    #[test]
    fn mismatched_widths_fail() {
        let err = euclidean_distance(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, ClusteringError::DimensionMismatch { expected: 2, found: 1 });
    }
}
