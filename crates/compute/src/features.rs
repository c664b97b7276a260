//! Customer feature vectors (7-dimensional):
//! [engagement_rate, activity_score, support_intensity, account_age,
//!  lifetime_value, churn_risk, channel_code]
//!
//! Rates are clamped to [0, 1]. Account age is scaled against ten years,
//! lifetime value is min-max normalized within the batch and the preferred
//! channel is encoded as its ordinal spread over [0, 1].

use cohort_core::{Channel, CustomerProfile};

use crate::error::ClusteringError;
use crate::matrix::{FeatureMatrix, FeatureVector};

/// Column names, in row order.
pub const FEATURE_NAMES: [&str; 7] = [
    "engagement_rate",
    "activity_score",
    "support_intensity",
    "account_age",
    "lifetime_value",
    "churn_risk",
    "channel_code",
];

/// Account age at which the age feature saturates.
const ACCOUNT_AGE_SCALE_DAYS: f64 = 3650.0;

/// Build the feature matrix for a batch of customers.
pub fn build_feature_matrix(profiles: &[CustomerProfile]) -> Result<FeatureMatrix, ClusteringError> {
    let (min_ltv, max_ltv) = profiles.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        (lo.min(p.lifetime_value), hi.max(p.lifetime_value))
    });
    let ltv_span = max_ltv - min_ltv;

    let ids = profiles.iter().map(|p| p.customer_id.clone()).collect();
    let rows = profiles
        .iter()
        .map(|p| {
            let ltv = if ltv_span > 0.0 {
                (p.lifetime_value - min_ltv) / ltv_span
            } else {
                0.0
            };
            feature_vector(p, ltv)
        })
        .collect();

    FeatureMatrix::new(ids, rows)
}

fn feature_vector(p: &CustomerProfile, normalized_ltv: f64) -> FeatureVector {
    vec![
        unit(p.engagement_rate),
        unit(p.activity_score),
        unit(p.support_intensity),
        unit(p.account_age_days / ACCOUNT_AGE_SCALE_DAYS),
        normalized_ltv,
        unit(p.churn_risk),
        channel_code(p.preferred_channel),
    ]
}

fn channel_code(channel: Channel) -> f64 {
    channel.ordinal() as f64 / (Channel::ALL.len() - 1) as f64
}

/// Clamp to [0, 1]; NaN passes through so the matrix check rejects it.
fn unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_core::PurchaseCadence;

    fn profile(id: &str, ltv: f64, channel: Channel) -> CustomerProfile {
        CustomerProfile {
            customer_id: id.to_string(),
            engagement_rate: 0.8,
            activity_score: 1.4,
            support_intensity: -0.2,
            account_age_days: 1825.0,
            lifetime_value: ltv,
            churn_risk: 0.1,
            purchase_cadence: PurchaseCadence::Regular,
            preferred_channel: channel,
        }
    }

    #[test]
    fn rows_follow_documented_ordering() {
        let m = build_feature_matrix(&[
            profile("a", 100.0, Channel::Email),
            profile("b", 300.0, Channel::Web),
        ])
        .unwrap();

        assert_eq!(m.dim(), FEATURE_NAMES.len());
        assert_eq!(m.ids(), &["a".to_string(), "b".to_string()]);

        let a = m.row(0);
        assert!((a[0] - 0.8).abs() < 1e-12);
        assert_eq!(a[1], 1.0, "activity clamped");
        assert_eq!(a[2], 0.0, "support clamped");
        assert!((a[3] - 0.5).abs() < 1e-12);
        assert_eq!(a[4], 0.0);
        assert_eq!(a[6], 0.0);

        let b = m.row(1);
        assert_eq!(b[4], 1.0);
        assert_eq!(b[6], 1.0);
    }

    #[test]
    fn uniform_lifetime_value_normalizes_to_zero() {
        let m = build_feature_matrix(&[
            profile("a", 500.0, Channel::Sms),
            profile("b", 500.0, Channel::Sms),
        ])
        .unwrap();
        assert_eq!(m.row(0)[4], 0.0);
        assert_eq!(m.row(1)[4], 0.0);
    }

    #[test]
    fn nan_input_is_rejected() {
        let mut bad = profile("a", 1.0, Channel::Push);
        bad.churn_risk = f64::NAN;
        let err = build_feature_matrix(&[bad]).unwrap_err();
        assert_eq!(err, ClusteringError::NonFinite { row: 0, column: 5 });
    }

    #[test]
    fn empty_batch_builds_empty_matrix() {
        assert!(build_feature_matrix(&[]).unwrap().is_empty());
    }
}
