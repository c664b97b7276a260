use cohort_core::CustomerProfile;
use serde::{Deserialize, Serialize};

/// Customer attributes that patterns describe and segment rules test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerField {
    EngagementRate,
    ActivityScore,
    SupportIntensity,
    LifetimeValue,
    ChurnRisk,
    PurchaseCadence,
    PreferredChannel,
}

impl CustomerField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerField::EngagementRate => "engagement_rate",
            CustomerField::ActivityScore => "activity_score",
            CustomerField::SupportIntensity => "support_intensity",
            CustomerField::LifetimeValue => "lifetime_value",
            CustomerField::ChurnRisk => "churn_risk",
            CustomerField::PurchaseCadence => "purchase_cadence",
            CustomerField::PreferredChannel => "preferred_channel",
        }
    }

    /// Numeric reading of this field, `None` for categorical fields.
    pub fn numeric(&self, customer: &CustomerProfile) -> Option<f64> {
        match self {
            CustomerField::EngagementRate => Some(customer.engagement_rate),
            CustomerField::ActivityScore => Some(customer.activity_score),
            CustomerField::SupportIntensity => Some(customer.support_intensity),
            CustomerField::LifetimeValue => Some(customer.lifetime_value),
            CustomerField::ChurnRisk => Some(customer.churn_risk),
            CustomerField::PurchaseCadence | CustomerField::PreferredChannel => None,
        }
    }

    /// Categorical reading of this field, `None` for numeric fields.
    pub fn label(&self, customer: &CustomerProfile) -> Option<&'static str> {
        match self {
            CustomerField::PurchaseCadence => Some(customer.purchase_cadence.as_str()),
            CustomerField::PreferredChannel => Some(customer.preferred_channel.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for CustomerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
