//! Pattern discovery: turns clusters into labeled, quantified patterns.
//!
//! Each cluster with enough members gets one attempt per pattern family
//! (behavioral, temporal, channel, value). A family only emits a pattern when
//! its signal clears the family's threshold.
//!
//! Sub-modules:
//! - [`stats`]: per-cluster aggregates and business impact
//! - [`families`]: the four family detectors

pub mod families;
pub mod stats;

use cohort_compute::ClusteringResult;
use cohort_core::{Channel, CustomerId, CustomerProfile, PurchaseCadence};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::InsightError;
use crate::field::CustomerField;
use stats::ClusterStats;

/// Clusters smaller than this are too small to generalize from.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Behavioral,
    Temporal,
    Channel,
    Value,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Behavioral => "behavioral",
            PatternType::Temporal => "temporal",
            PatternType::Channel => "channel",
            PatternType::Value => "value",
        }
    }

    /// Heuristic engagement potential attached to every pattern of this family.
    pub fn engagement_potential(&self) -> f64 {
        match self {
            PatternType::Behavioral => 0.8,
            PatternType::Temporal => 0.6,
            PatternType::Channel => 0.7,
            PatternType::Value => 0.5,
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifetime-value tier of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueTier {
    High,
    Medium,
    Low,
}

impl ValueTier {
    pub const HIGH_THRESHOLD: f64 = 5000.0;
    pub const MEDIUM_THRESHOLD: f64 = 1000.0;

    pub fn for_lifetime_value(value: f64) -> Self {
        if value >= Self::HIGH_THRESHOLD {
            ValueTier::High
        } else if value >= Self::MEDIUM_THRESHOLD {
            ValueTier::Medium
        } else {
            ValueTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueTier::High => "high",
            ValueTier::Medium => "medium",
            ValueTier::Low => "low",
        }
    }
}

/// Whether a numeric feature is elevated or depressed within the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    High,
    Low,
}

impl Direction {
    /// Rates and scores live in [0, 1]; the midpoint splits high from low.
    pub fn of_rate(mean: f64) -> Self {
        if mean >= 0.5 { Direction::High } else { Direction::Low }
    }
}

/// A feature a pattern was derived from, with the statistics needed to turn
/// it into a segment rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternFeature {
    Numeric {
        field: CustomerField,
        mean: f64,
        std_dev: f64,
        direction: Direction,
    },
    Cadence { cadence: PurchaseCadence },
    Channel { channel: Channel },
    ValueTier { tier: ValueTier },
}

impl PatternFeature {
    /// Short human label, e.g. `high engagement_rate (0.82)`.
    pub fn label(&self) -> String {
        match self {
            PatternFeature::Numeric { field, mean, direction, .. } => {
                let level = match direction {
                    Direction::High => "high",
                    Direction::Low => "low",
                };
                format!("{} {} ({:.2})", level, field, mean)
            }
            PatternFeature::Cadence { cadence } => format!("{} purchase cadence", cadence),
            PatternFeature::Channel { channel } => format!("prefers {}", channel),
            PatternFeature::ValueTier { tier } => format!("{} lifetime value tier", tier.as_str()),
        }
    }
}

/// Family-specific measurements behind a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum PatternSignal {
    Behavioral {
        engagement_rate: f64,
        activity_score: f64,
        support_intensity: f64,
        /// Mean of the per-customer behavior score.
        mean_score: f64,
        /// Population variance of the per-customer behavior score.
        variance: f64,
    },
    Temporal { cadence: PurchaseCadence, share: f64 },
    Channel { channel: Channel, share: f64 },
    Value {
        tier: ValueTier,
        mean_lifetime_value: f64,
        mean_churn_risk: f64,
    },
}

impl PatternSignal {
    pub fn pattern_type(&self) -> PatternType {
        match self {
            PatternSignal::Behavioral { .. } => PatternType::Behavioral,
            PatternSignal::Temporal { .. } => PatternType::Temporal,
            PatternSignal::Channel { .. } => PatternType::Channel,
            PatternSignal::Value { .. } => PatternType::Value,
        }
    }
}

/// Monetary framing of a pattern. Computed once per cluster with the same
/// formulas for every family so patterns rank against each other fairly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusinessImpact {
    pub revenue_opportunity: f64,
    pub risk_mitigation: f64,
    pub engagement_potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPattern {
    pub pattern_id: String,
    pub pattern_type: PatternType,
    pub cluster_id: usize,
    pub description: String,
    pub signal: PatternSignal,
    pub features: Vec<PatternFeature>,
    /// In [0, 1].
    pub strength: f64,
    /// Number of customers the pattern covers.
    pub frequency: usize,
    pub customer_ids: Vec<CustomerId>,
    pub actionable_insights: Vec<String>,
    pub business_impact: BusinessImpact,
}

/// Runs the four family detectors over every qualifying cluster.
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    min_cluster_size: usize,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CLUSTER_SIZE)
    }
}

impl PatternAnalyzer {
    pub fn new(min_cluster_size: usize) -> Self {
        Self {
            min_cluster_size: min_cluster_size.max(1),
        }
    }

    /// Discover patterns in `clustering`, whose labels are index-aligned with
    /// `customers`.
    ///
    /// Output is ordered by cluster id, then family (behavioral, temporal,
    /// channel, value). Noise points are ignored.
    pub fn analyze(
        &self,
        clustering: &ClusteringResult,
        customers: &[CustomerProfile],
    ) -> Result<Vec<DiscoveredPattern>, InsightError> {
        if clustering.labels.len() != customers.len() {
            return Err(InsightError::MisalignedInput {
                labels: clustering.labels.len(),
                customers: customers.len(),
            });
        }

        let clusters: Vec<(usize, Vec<&CustomerProfile>)> = (0..clustering.cluster_count)
            .map(|c| {
                let members: Vec<&CustomerProfile> =
                    clustering.members(c).into_iter().map(|i| &customers[i]).collect();
                (c, members)
            })
            .filter(|(c, members)| {
                let keep = members.len() >= self.min_cluster_size;
                if !keep {
                    debug!(cluster = c, size = members.len(), "skipping small cluster");
                }
                keep
            })
            .collect();

        let analyzed = clusters.len();
        let patterns: Vec<DiscoveredPattern> = clusters
            .into_par_iter()
            .map(|(cluster_id, members)| {
                let stats = ClusterStats::new(cluster_id, members);
                [
                    families::behavioral(&stats),
                    families::temporal(&stats),
                    families::channel(&stats),
                    families::value(&stats),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        info!(
            clusters = clustering.cluster_count,
            analyzed,
            patterns = patterns.len(),
            "pattern analysis complete"
        );
        Ok(patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_compute::{Algorithm, NOISE};

    fn customer(id: usize, behavior: f64) -> CustomerProfile {
        CustomerProfile {
            customer_id: format!("cust-{id}"),
            engagement_rate: behavior,
            activity_score: behavior,
            support_intensity: behavior,
            account_age_days: 365.0,
            lifetime_value: 2000.0,
            churn_risk: 0.2,
            purchase_cadence: PurchaseCadence::Regular,
            preferred_channel: Channel::Email,
        }
    }

    fn clustering(labels: Vec<i32>, cluster_count: usize) -> ClusteringResult {
        ClusteringResult {
            algorithm: Algorithm::Kmeans,
            cluster_count,
            labels,
            centroids: None,
            quality_score: 0.5,
            iterations: Some(1),
            inertia: Some(0.0),
        }
    }

    #[test]
    fn emits_all_families_for_a_coherent_cluster() {
        let customers: Vec<_> = (0..6).map(|i| customer(i, 0.8)).collect();
        let patterns = PatternAnalyzer::default()
            .analyze(&clustering(vec![0; 6], 1), &customers)
            .unwrap();

        let types: Vec<_> = patterns.iter().map(|p| p.pattern_type).collect();
        assert_eq!(
            types,
            vec![
                PatternType::Behavioral,
                PatternType::Temporal,
                PatternType::Channel,
                PatternType::Value
            ]
        );
        assert!(patterns.iter().all(|p| p.frequency == 6 && p.cluster_id == 0));
        assert_eq!(patterns[0].pattern_id, "c0-behavioral");
    }

    #[test]
    fn skips_clusters_below_min_size() {
        let customers: Vec<_> = (0..9).map(|i| customer(i, 0.8)).collect();
        let labels = vec![0, 0, 0, 0, 0, 1, 1, 1, 1];
        let patterns = PatternAnalyzer::default()
            .analyze(&clustering(labels, 2), &customers)
            .unwrap();
        assert!(!patterns.is_empty());
        assert!(patterns.iter().all(|p| p.cluster_id == 0));
    }

    #[test]
    fn noise_points_are_not_analysed() {
        let customers: Vec<_> = (0..7).map(|i| customer(i, 0.8)).collect();
        let labels = vec![0, 0, 0, 0, 0, NOISE, NOISE];
        let patterns = PatternAnalyzer::default()
            .analyze(&clustering(labels, 1), &customers)
            .unwrap();
        for p in &patterns {
            assert_eq!(p.customer_ids.len(), 5);
            assert!(!p.customer_ids.contains(&"cust-5".to_string()));
        }
    }

    #[test]
    fn output_is_ordered_by_cluster() {
        let customers: Vec<_> = (0..15).map(|i| customer(i, 0.8)).collect();
        let labels = (0..15).map(|i| (2 - i / 5) as i32).collect();
        let patterns = PatternAnalyzer::default()
            .analyze(&clustering(labels, 3), &customers)
            .unwrap();
        let ids: Vec<_> = patterns.iter().map(|p| p.cluster_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn misaligned_labels_are_rejected() {
        let customers: Vec<_> = (0..3).map(|i| customer(i, 0.8)).collect();
        let err = PatternAnalyzer::default()
            .analyze(&clustering(vec![0; 4], 1), &customers)
            .unwrap_err();
        assert!(matches!(err, InsightError::MisalignedInput { labels: 4, customers: 3 }));
    }

    #[test]
    fn feature_labels_are_readable() {
        let f = PatternFeature::Numeric {
            field: CustomerField::EngagementRate,
            mean: 0.823,
            std_dev: 0.1,
            direction: Direction::High,
        };
        assert_eq!(f.label(), "high engagement_rate (0.82)");
        assert_eq!(
            PatternFeature::Channel { channel: Channel::Sms }.label(),
            "prefers sms"
        );
    }
}
