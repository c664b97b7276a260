use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque customer identifier as supplied by the feature source.
pub type CustomerId = String;

/// Preferred communication channel of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    #[serde(rename = "whatsapp", alias = "whats_app")]
    WhatsApp,
    Push,
    Web,
}

impl Channel {
    /// Fixed ordering used when encoding the channel as a numeric feature.
    pub const ALL: [Channel; 5] = [
        Channel::Email,
        Channel::Sms,
        Channel::WhatsApp,
        Channel::Push,
        Channel::Web,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::WhatsApp => "whatsapp",
            Channel::Push => "push",
            Channel::Web => "web",
        }
    }

    /// Position of this channel in [`Channel::ALL`].
    pub fn ordinal(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or(0)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            "whatsapp" | "whats_app" => Ok(Channel::WhatsApp),
            "push" => Ok(Channel::Push),
            "web" => Ok(Channel::Web),
            other => Err(UnknownVariant {
                kind: "channel",
                value: other.to_string(),
            }),
        }
    }
}

/// Purchase cadence label over the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseCadence {
    Regular,
    Seasonal,
    Sporadic,
    FirstTime,
}

impl PurchaseCadence {
    pub const ALL: [PurchaseCadence; 4] = [
        PurchaseCadence::Regular,
        PurchaseCadence::Seasonal,
        PurchaseCadence::Sporadic,
        PurchaseCadence::FirstTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseCadence::Regular => "regular",
            PurchaseCadence::Seasonal => "seasonal",
            PurchaseCadence::Sporadic => "sporadic",
            PurchaseCadence::FirstTime => "first_time",
        }
    }
}

impl fmt::Display for PurchaseCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseCadence {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "regular" => Ok(PurchaseCadence::Regular),
            "seasonal" => Ok(PurchaseCadence::Seasonal),
            "sporadic" => Ok(PurchaseCadence::Sporadic),
            "first_time" | "firsttime" => Ok(PurchaseCadence::FirstTime),
            other => Err(UnknownVariant {
                kind: "purchase cadence",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// One customer's behavioral and value attributes for a single analysis window.
///
/// Rates and scores (`engagement_rate`, `activity_score`, `support_intensity`,
/// `churn_risk`) are expected in `[0, 1]`. `lifetime_value` is in currency
/// units and `account_age_days` in days; both are normalized by the feature
/// builder, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub engagement_rate: f64,
    pub activity_score: f64,
    pub support_intensity: f64,
    pub account_age_days: f64,
    pub lifetime_value: f64,
    pub churn_risk: f64,
    pub purchase_cadence: PurchaseCadence,
    pub preferred_channel: Channel,
}

impl CustomerProfile {
    /// Mean of the three behavioral signals.
    pub fn behavior_score(&self) -> f64 {
        (self.engagement_rate + self.activity_score + self.support_intensity) / 3.0
    }
}
