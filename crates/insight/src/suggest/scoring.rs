//! Local numeric scoring of suggestions. Nothing here looks at generated copy.

use super::{Complexity, Priority, RiskLevel, SuggestedSegment};

pub fn priority(revenue_opportunity: f64, strength: f64) -> Priority {
    let score = (revenue_opportunity / 1000.0) * strength;
    if score > 5.0 {
        Priority::Critical
    } else if score > 2.0 {
        Priority::High
    } else if score > 0.5 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub fn risk_level(risk_mitigation: f64, revenue_opportunity: f64) -> RiskLevel {
    let ratio = risk_mitigation / revenue_opportunity.max(1.0);
    if ratio > 0.3 {
        RiskLevel::High
    } else if ratio > 0.1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn expected_roi(revenue_opportunity: f64, frequency: usize) -> f64 {
    revenue_opportunity / (frequency as f64 * 10.0).max(1.0)
}

pub fn complexity(rule_count: usize) -> Complexity {
    match rule_count {
        0 | 1 => Complexity::Low,
        2 | 3 => Complexity::Medium,
        _ => Complexity::High,
    }
}

/// Priority descending, then expected ROI descending.
///
/// `sort_by` is stable, so exact ties keep discovery order.
pub fn rank(suggestions: &mut [SuggestedSegment]) {
    suggestions.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.expected_roi.total_cmp(&a.expected_roi))
    });
}
