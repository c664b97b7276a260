//! The four pattern-family detectors. Each returns `None` when the cluster
//! carries no usable signal for that family.

use cohort_core::{Channel, PurchaseCadence};

use super::stats::{mean_variance, ClusterStats};
use super::{
    DiscoveredPattern, Direction, PatternFeature, PatternSignal, ValueTier,
};
use crate::field::CustomerField;

/// Behavioral patterns weaker than this are dropped.
pub const MIN_BEHAVIORAL_STRENGTH: f64 = 0.3;
/// Share of the cluster the dominant purchase cadence must cover.
pub const MIN_CADENCE_SHARE: f64 = 0.6;
/// Share of the cluster the dominant channel must cover.
pub const MIN_CHANNEL_SHARE: f64 = 0.5;

const VALUE_WEIGHT: f64 = 0.6;
const RETENTION_WEIGHT: f64 = 0.4;

fn build(
    stats: &ClusterStats<'_>,
    signal: PatternSignal,
    description: String,
    features: Vec<PatternFeature>,
    strength: f64,
    actionable_insights: Vec<String>,
) -> DiscoveredPattern {
    let pattern_type = signal.pattern_type();
    DiscoveredPattern {
        pattern_id: format!("c{}-{}", stats.cluster_id, pattern_type),
        pattern_type,
        cluster_id: stats.cluster_id,
        description,
        signal,
        features,
        strength: strength.clamp(0.0, 1.0),
        frequency: stats.size(),
        customer_ids: stats.customer_ids(),
        actionable_insights,
        business_impact: stats.business_impact(pattern_type),
    }
}

fn numeric_feature(stats: &ClusterStats<'_>, field: CustomerField) -> PatternFeature {
    let (mean, std_dev) = stats.mean_std(field);
    PatternFeature::Numeric {
        field,
        mean,
        std_dev,
        direction: Direction::of_rate(mean),
    }
}

/// Elevated and internally consistent engagement, activity and support use.
///
/// strength = mean / (1 + variance) of the per-customer behavior score, so a
/// cluster only scores well when it is both high and tight.
pub fn behavioral(stats: &ClusterStats<'_>) -> Option<DiscoveredPattern> {
    let scores: Vec<f64> = stats.members.iter().map(|c| c.behavior_score()).collect();
    let (mean_score, variance) = mean_variance(&scores);
    let strength = mean_score / (1.0 + variance);
    if strength < MIN_BEHAVIORAL_STRENGTH {
        return None;
    }

    let (engagement_rate, _) = stats.mean_std(CustomerField::EngagementRate);
    let (activity_score, _) = stats.mean_std(CustomerField::ActivityScore);
    let (support_intensity, _) = stats.mean_std(CustomerField::SupportIntensity);

    let features: Vec<PatternFeature> = [
        CustomerField::EngagementRate,
        CustomerField::ActivityScore,
        CustomerField::SupportIntensity,
    ]
    .into_iter()
    .map(|field| numeric_feature(stats, field))
    .collect();

    let description = format!(
        "{} customers with {} engagement ({:.2}), {} activity ({:.2}) and {} support intensity ({:.2})",
        stats.size(),
        level(engagement_rate),
        engagement_rate,
        level(activity_score),
        activity_score,
        level(support_intensity),
        support_intensity,
    );

    let mut insights = Vec::new();
    if engagement_rate >= 0.5 && activity_score >= 0.5 {
        insights.push("Invite this group to loyalty and referral programmes".to_string());
    } else if engagement_rate < 0.5 {
        insights.push("Test re-engagement content to lift open and click rates".to_string());
    }
    if support_intensity >= 0.5 {
        insights.push("Review support tickets for recurring friction before upselling".to_string());
    }
    if activity_score < 0.5 {
        insights.push("Nudge website visits with personalised product highlights".to_string());
    }

    Some(build(
        stats,
        PatternSignal::Behavioral {
            engagement_rate,
            activity_score,
            support_intensity,
            mean_score,
            variance,
        },
        description,
        features,
        strength,
        insights,
    ))
}

/// A purchase cadence shared by a clear majority of the cluster.
pub fn temporal(stats: &ClusterStats<'_>) -> Option<DiscoveredPattern> {
    let (cadence, share) = stats.majority(|c| c.purchase_cadence)?;
    if share < MIN_CADENCE_SHARE {
        return None;
    }

    let insight = match cadence {
        PurchaseCadence::Regular => "Time replenishment reminders to the regular purchase cycle",
        PurchaseCadence::Seasonal => "Schedule campaigns ahead of the group's seasonal peaks",
        PurchaseCadence::Sporadic => "Use triggered offers to turn sporadic buyers into regulars",
        PurchaseCadence::FirstTime => "Run an onboarding series that drives a second purchase",
    };

    Some(build(
        stats,
        PatternSignal::Temporal { cadence, share },
        format!("{:.0}% of {} customers buy on a {} cadence", share * 100.0, stats.size(), cadence),
        vec![PatternFeature::Cadence { cadence }],
        share,
        vec![insight.to_string()],
    ))
}

/// A preferred communication channel shared by at least half the cluster.
pub fn channel(stats: &ClusterStats<'_>) -> Option<DiscoveredPattern> {
    let (channel, share) = stats.majority(|c| c.preferred_channel)?;
    if share < MIN_CHANNEL_SHARE {
        return None;
    }

    let mut insights = vec![format!("Route campaigns for this group through {}", channel)];
    if matches!(channel, Channel::Sms | Channel::WhatsApp | Channel::Push) {
        insights.push("Keep messages short and time-sensitive for mobile delivery".to_string());
    }

    Some(build(
        stats,
        PatternSignal::Channel { channel, share },
        format!("{:.0}% of {} customers prefer {}", share * 100.0, stats.size(), channel),
        vec![PatternFeature::Channel { channel }],
        share,
        insights,
    ))
}

/// Lifetime-value tier paired with churn risk. Always emitted.
///
/// strength blends normalized value with retention (1 - churn risk).
pub fn value(stats: &ClusterStats<'_>) -> Option<DiscoveredPattern> {
    let mean_lifetime_value = stats.mean_lifetime_value();
    let mean_churn_risk = stats.mean_churn_risk;
    let tier = ValueTier::for_lifetime_value(mean_lifetime_value);

    let normalized_value = (mean_lifetime_value / ValueTier::HIGH_THRESHOLD).clamp(0.0, 1.0);
    let strength =
        VALUE_WEIGHT * normalized_value + RETENTION_WEIGHT * (1.0 - mean_churn_risk.clamp(0.0, 1.0));

    let mut insights = Vec::new();
    match tier {
        ValueTier::High => insights.push("Offer premium service tiers and early access".to_string()),
        ValueTier::Medium => insights.push("Cross-sell complementary products to grow basket size".to_string()),
        ValueTier::Low => insights.push("Promote entry bundles to raise order value".to_string()),
    }
    if mean_churn_risk >= 0.5 {
        insights.push(format!(
            "Prioritise retention: {:.0} in lifetime value is at risk",
            stats.total_lifetime_value * mean_churn_risk
        ));
    }

    Some(build(
        stats,
        PatternSignal::Value {
            tier,
            mean_lifetime_value,
            mean_churn_risk,
        },
        format!(
            "{} value cluster of {} customers: mean lifetime value {:.0}, mean churn risk {:.2}",
            tier.as_str(),
            stats.size(),
            mean_lifetime_value,
            mean_churn_risk
        ),
        vec![
            PatternFeature::ValueTier { tier },
            numeric_feature(stats, CustomerField::ChurnRisk),
        ],
        strength,
        insights,
    ))
}

fn level(v: f64) -> &'static str {
    match Direction::of_rate(v) {
        Direction::High => "high",
        Direction::Low => "low",
    }
}
