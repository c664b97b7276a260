//! Segment rules: derived from pattern features, evaluated against customers.

use cohort_core::CustomerProfile;
use serde::{Deserialize, Serialize};

use crate::field::CustomerField;
use crate::pattern::{Direction, PatternFeature, ValueTier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Condition {
    Gte(f64),
    Lte(f64),
    Lt(f64),
    /// Half-open: `min <= v < max`.
    Between { min: f64, max: f64 },
    /// Categorical match against the field's label, e.g. `"sms"`.
    Equals(String),
}

/// One predicate on one customer field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRule {
    pub field: CustomerField,
    pub condition: Condition,
}

impl FeatureRule {
    pub fn new(field: CustomerField, condition: Condition) -> Self {
        Self { field, condition }
    }

    /// Derive the rule that selects customers exhibiting `feature`.
    ///
    /// Elevated numeric features keep customers within one standard deviation
    /// below the cluster mean; depressed ones within one above it.
    pub fn from_feature(feature: &PatternFeature) -> Self {
        match feature {
            PatternFeature::Numeric { field, mean, std_dev, direction } => {
                let condition = match direction {
                    Direction::High => Condition::Gte((mean - std_dev).max(0.0)),
                    Direction::Low => Condition::Lte(mean + std_dev),
                };
                Self::new(*field, condition)
            }
            PatternFeature::Cadence { cadence } => Self::new(
                CustomerField::PurchaseCadence,
                Condition::Equals(cadence.as_str().to_string()),
            ),
            PatternFeature::Channel { channel } => Self::new(
                CustomerField::PreferredChannel,
                Condition::Equals(channel.as_str().to_string()),
            ),
            PatternFeature::ValueTier { tier } => {
                let condition = match tier {
                    ValueTier::High => Condition::Gte(ValueTier::HIGH_THRESHOLD),
                    ValueTier::Medium => Condition::Between {
                        min: ValueTier::MEDIUM_THRESHOLD,
                        max: ValueTier::HIGH_THRESHOLD,
                    },
                    ValueTier::Low => Condition::Lt(ValueTier::MEDIUM_THRESHOLD),
                };
                Self::new(CustomerField::LifetimeValue, condition)
            }
        }
    }

    /// A numeric condition on a categorical field (or vice versa) never matches.
    pub fn matches(&self, customer: &CustomerProfile) -> bool {
        match &self.condition {
            Condition::Equals(expected) => self.field.label(customer) == Some(expected.as_str()),
            numeric => {
                let Some(v) = self.field.numeric(customer) else {
                    return false;
                };
                match numeric {
                    Condition::Gte(t) => v >= *t,
                    Condition::Lte(t) => v <= *t,
                    Condition::Lt(t) => v < *t,
                    Condition::Between { min, max } => v >= *min && v < *max,
                    Condition::Equals(_) => false,
                }
            }
        }
    }
}

impl std::fmt::Display for FeatureRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.condition {
            Condition::Gte(t) => write!(f, "{} >= {:.2}", self.field, t),
            Condition::Lte(t) => write!(f, "{} <= {:.2}", self.field, t),
            Condition::Lt(t) => write!(f, "{} < {:.2}", self.field, t),
            Condition::Between { min, max } => {
                write!(f, "{:.2} <= {} < {:.2}", min, self.field, max)
            }
            Condition::Equals(v) => write!(f, "{} = {}", self.field, v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleLogic {
    And,
    Or,
}

/// The selection criteria of a suggested segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentCriteria {
    pub rules: Vec<FeatureRule>,
    pub logic: RuleLogic,
}

impl SegmentCriteria {
    pub fn all(rules: Vec<FeatureRule>) -> Self {
        Self { rules, logic: RuleLogic::And }
    }

    /// Criteria without rules select nobody.
    pub fn matches(&self, customer: &CustomerProfile) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        match self.logic {
            RuleLogic::And => self.rules.iter().all(|r| r.matches(customer)),
            RuleLogic::Or => self.rules.iter().any(|r| r.matches(customer)),
        }
    }

    /// Customers matching these criteria, in input order.
    pub fn select<'a>(&self, customers: &'a [CustomerProfile]) -> Vec<&'a CustomerProfile> {
        customers.iter().filter(|c| self.matches(c)).collect()
    }
}
