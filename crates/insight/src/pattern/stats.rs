//! Per-cluster aggregates shared by the family detectors.

use std::collections::BTreeMap;

use cohort_core::{CustomerId, CustomerProfile};

use super::{BusinessImpact, PatternType};
use crate::field::CustomerField;

/// Share of lifetime value recoverable through engagement, before headroom.
const BASE_UPLIFT: f64 = 0.1;
/// Extra uplift available when the cluster is completely disengaged.
const ENGAGEMENT_HEADROOM_UPLIFT: f64 = 0.2;

/// Population mean and variance. Both are 0 for an empty slice.
pub fn mean_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

/// One cluster's members plus the aggregates every family needs.
pub struct ClusterStats<'a> {
    pub cluster_id: usize,
    pub members: Vec<&'a CustomerProfile>,
    pub total_lifetime_value: f64,
    pub mean_engagement: f64,
    pub mean_churn_risk: f64,
}

impl<'a> ClusterStats<'a> {
    pub fn new(cluster_id: usize, members: Vec<&'a CustomerProfile>) -> Self {
        let n = members.len().max(1) as f64;
        let total_lifetime_value = members.iter().map(|c| c.lifetime_value).sum();
        let mean_engagement = members.iter().map(|c| c.engagement_rate).sum::<f64>() / n;
        let mean_churn_risk = members.iter().map(|c| c.churn_risk).sum::<f64>() / n;
        Self {
            cluster_id,
            members,
            total_lifetime_value,
            mean_engagement,
            mean_churn_risk,
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn customer_ids(&self) -> Vec<CustomerId> {
        self.members.iter().map(|c| c.customer_id.clone()).collect()
    }

    pub fn mean_lifetime_value(&self) -> f64 {
        self.total_lifetime_value / self.size().max(1) as f64
    }

    /// Mean and standard deviation of a numeric field.
    pub fn mean_std(&self, field: CustomerField) -> (f64, f64) {
        let values: Vec<f64> = self.members.iter().filter_map(|c| field.numeric(c)).collect();
        let (mean, variance) = mean_variance(&values);
        (mean, variance.sqrt())
    }

    /// Most common value of `key` and the share of members holding it.
    ///
    /// Ties resolve to the smallest key so the result does not depend on
    /// member order.
    pub fn majority<K, F>(&self, key: F) -> Option<(K, f64)>
    where
        K: Ord + Copy,
        F: Fn(&CustomerProfile) -> K,
    {
        let mut counts: BTreeMap<K, usize> = BTreeMap::new();
        for member in &self.members {
            *counts.entry(key(*member)).or_default() += 1;
        }
        let (value, count) = counts
            .into_iter()
            .fold(None, |best: Option<(K, usize)>, (k, c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((k, c)),
            })?;
        Some((value, count as f64 / self.size() as f64))
    }

    /// Business impact of acting on this cluster.
    ///
    /// `revenue_opportunity` scales total lifetime value by an uplift that
    /// grows with engagement headroom; `risk_mitigation` is the lifetime value
    /// weighted by mean churn probability. Only `engagement_potential` varies
    /// by family.
    pub fn business_impact(&self, family: PatternType) -> BusinessImpact {
        let headroom = (1.0 - self.mean_engagement).clamp(0.0, 1.0);
        let uplift = BASE_UPLIFT + ENGAGEMENT_HEADROOM_UPLIFT * headroom;
        BusinessImpact {
            revenue_opportunity: self.total_lifetime_value * uplift,
            risk_mitigation: self.total_lifetime_value * self.mean_churn_risk.clamp(0.0, 1.0),
            engagement_potential: family.engagement_potential(),
        }
    }
}
