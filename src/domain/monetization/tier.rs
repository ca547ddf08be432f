//! Subscription tier definitions.
//!
//! A tier is a named plan with a price and a feature set. The set of tier
//! names is fixed; prices and features come from configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::MonetizationError;

/// Name of a subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierName {
    /// Entry plan, also the default referral reward.
    Basic,

    /// Full plan with exclusive content.
    Premium,
}

impl TierName {
    /// All tier names, in declaration order.
    pub const ALL: [TierName; 2] = [TierName::Basic, TierName::Premium];

    /// Returns the wire representation (`basic`, `premium`).
    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Basic => "basic",
            TierName::Premium => "premium",
        }
    }

    /// Returns the human label without price.
    pub fn label(&self) -> &'static str {
        match self {
            TierName::Basic => "Basic",
            TierName::Premium => "Premium",
        }
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TierName {
    type Err = MonetizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(TierName::Basic),
            "premium" => Ok(TierName::Premium),
            _ => Err(MonetizationError::unknown_tier(s)),
        }
    }
}

/// Value attached to a feature in a tier's feature set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Feature switched on or off.
    Flag(bool),

    /// Numeric parameter (quota, limit).
    Limit(i64),

    /// Free-form parameter.
    Text(String),
}

impl FeatureValue {
    /// A feature counts as enabled unless it is an explicit `false` flag.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, FeatureValue::Flag(false))
    }
}

/// A subscription plan.
///
/// # Invariants
///
/// - `price_cents >= 0` (checked by `TierCatalog::new`)
/// - Immutable once loaded into the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: TierName,

    /// Monthly price in cents.
    pub price_cents: i64,

    #[serde(default)]
    pub features: BTreeMap<String, FeatureValue>,
}

impl Tier {
    /// Creates a tier with every listed feature enabled.
    pub fn new<I, S>(name: TierName, price_cents: i64, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            price_cents,
            features: features
                .into_iter()
                .map(|f| (f.into(), FeatureValue::Flag(true)))
                .collect(),
        }
    }

    /// Returns true if the named feature is present and enabled.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features
            .get(feature)
            .map(FeatureValue::is_enabled)
            .unwrap_or(false)
    }

    /// Returns the raw value of a feature, if configured.
    pub fn feature(&self, feature: &str) -> Option<&FeatureValue> {
        self.features.get(feature)
    }

    /// Price formatted as a decimal amount, e.g. `5.00`.
    pub fn price_display(&self) -> String {
        format!("{}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }

    /// Label shown to users, e.g. `Basic - $5/month`.
    pub fn display_name(&self) -> String {
        let amount = if self.price_cents % 100 == 0 {
            format!("{}", self.price_cents / 100)
        } else {
            self.price_display()
        };
        format!("{} - ${}/month", self.name.label(), amount)
    }
}
