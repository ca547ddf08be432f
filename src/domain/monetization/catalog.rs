//! Tier catalog - process-wide reference data for subscription plans.

use std::collections::BTreeMap;

use crate::config::MonetizationConfig;
use crate::domain::foundation::ValidationError;

use super::{MonetizationError, Tier, TierName};

/// Highest accepted monthly price, in cents.
const MAX_PRICE_CENTS: i64 = 1_000_000;

/// Immutable lookup table of configured tiers.
///
/// Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierCatalog {
    tiers: BTreeMap<TierName, Tier>,
    lowest: TierName,
}

impl TierCatalog {
    /// Builds a catalog, rejecting empty sets, duplicates and bad prices.
    pub fn new(tiers: impl IntoIterator<Item = Tier>) -> Result<Self, ValidationError> {
        let mut map = BTreeMap::new();
        for tier in tiers {
            if !(0..=MAX_PRICE_CENTS).contains(&tier.price_cents) {
                return Err(ValidationError::out_of_range(
                    format!("tiers.{}.price_cents", tier.name),
                    0,
                    MAX_PRICE_CENTS,
                    tier.price_cents,
                ));
            }
            let name = tier.name;
            if map.insert(name, tier).is_some() {
                return Err(ValidationError::invalid_format(
                    "tiers",
                    format!("tier '{}' is defined more than once", name),
                ));
            }
        }
        let lowest = map
            .values()
            .min_by_key(|t| (t.price_cents, t.name))
            .map(|t| t.name)
            .ok_or_else(|| ValidationError::empty_field("tiers"))?;
        Ok(Self { tiers: map, lowest })
    }

    /// Builds the catalog from the `monetization.tiers` configuration section.
    pub fn from_config(config: &MonetizationConfig) -> Result<Self, ValidationError> {
        Self::new(config.tiers.iter().cloned())
    }

    /// Looks up a tier by its wire name.
    ///
    /// # Errors
    ///
    /// `UnknownTier` when the name is outside the enumerated set or the tier
    /// is not configured.
    pub fn get(&self, name: &str) -> Result<&Tier, MonetizationError> {
        let tier_name: TierName = name.parse()?;
        self.tier(tier_name)
            .ok_or_else(|| MonetizationError::unknown_tier(name))
    }

    /// Looks up a tier by typed name.
    pub fn tier(&self, name: TierName) -> Option<&Tier> {
        self.tiers.get(&name)
    }

    /// Returns true if the tier is configured.
    pub fn contains(&self, name: TierName) -> bool {
        self.tiers.contains_key(&name)
    }

    /// The cheapest configured tier.
    pub fn lowest_cost(&self) -> &Tier {
        &self.tiers[&self.lowest]
    }

    /// Tiers ordered by price, cheapest first.
    pub fn tiers(&self) -> Vec<&Tier> {
        let mut tiers: Vec<&Tier> = self.tiers.values().collect();
        tiers.sort_by_key(|t| (t.price_cents, t.name));
        tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}
