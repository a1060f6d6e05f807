#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted tier catalog shared by every augment.

use std::collections::HashSet;

use log::error;
use rand::Rng;
use simulacra_core::{TierDefinition, TierId};
use thiserror::Error;

/// Reasons a catalog cannot be built from the provided tiers.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CatalogError {
    /// Two tiers share the same identifier.
    #[error("tier {0:?} is defined more than once")]
    DuplicateTier(TierId),
    /// A tier weight is negative or not finite.
    #[error("tier {tier:?} has an invalid probability of {probability}")]
    InvalidProbability {
        /// Offending tier.
        tier: TierId,
        /// Configured weight.
        probability: f32,
    },
    /// A tier levels down into a tier missing from the catalog.
    #[error("tier {tier:?} levels down into unknown tier {target:?}")]
    UnknownLevelDown {
        /// Tier owning the level-down link.
        tier: TierId,
        /// Missing target of the link.
        target: TierId,
    },
}

/// Ordered tier list used for weighted draws and priority lookups.
#[derive(Clone, Debug, Default)]
pub struct TierCatalog {
    tiers: Vec<TierDefinition>,
}

impl TierCatalog {
    /// Builds a catalog, preserving the insertion order of `tiers`.
    pub fn new(tiers: Vec<TierDefinition>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(tiers.len());
        for tier in &tiers {
            if !seen.insert(tier.id) {
                return Err(CatalogError::DuplicateTier(tier.id));
            }
            if !tier.probability.is_finite() || tier.probability < 0.0 {
                return Err(CatalogError::InvalidProbability {
                    tier: tier.id,
                    probability: tier.probability,
                });
            }
        }

        for tier in &tiers {
            if let Some(target) = tier.level_down {
                if !seen.contains(&target) {
                    return Err(CatalogError::UnknownLevelDown {
                        tier: tier.id,
                        target,
                    });
                }
            }
        }

        Ok(Self { tiers })
    }

    /// Looks up a tier definition by identifier.
    #[must_use]
    pub fn get(&self, tier: TierId) -> Option<&TierDefinition> {
        self.tiers.iter().find(|definition| definition.id == tier)
    }

    /// Iterator over the tiers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TierDefinition> {
        self.tiers.iter()
    }

    /// Number of tiers in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Reports whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Tier the provided tier decays into, if any.
    #[must_use]
    pub fn level_down_of(&self, tier: TierId) -> Option<TierId> {
        self.get(tier).and_then(|definition| definition.level_down)
    }

    /// Reports whether following level-down links from `tier` loops forever.
    #[must_use]
    pub fn has_level_down_cycle(&self, tier: TierId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(tier);
        while let Some(id) = current {
            if !visited.insert(id) {
                return true;
            }
            current = self.level_down_of(id);
        }
        false
    }

    /// Draws a tier with probability proportional to its weight.
    ///
    /// Tiers are walked in insertion order, so a draw landing exactly on a
    /// slice boundary resolves to the earlier tier. Returns `None` (and logs
    /// an error) when no tier could be selected: an empty catalog, weights
    /// summing to zero, or accumulated rounding that never reaches the draw.
    pub fn draw_weighted_tier<R: Rng>(&self, rng: &mut R) -> Option<TierId> {
        let total: f32 = self.tiers.iter().map(|tier| tier.probability).sum();
        if total <= 0.0 {
            error!("no tier has been picked: total probability is {total}");
            return None;
        }

        let draw = rng.gen_range(0.0..total);
        self.select(draw)
    }

    fn select(&self, draw: f32) -> Option<TierId> {
        let mut cumulative = 0.0;
        for tier in &self.tiers {
            cumulative += tier.probability;
            if draw <= cumulative {
                return Some(tier.id);
            }
        }

        error!("no tier has been picked: draw {draw} is over cumulative probability {cumulative}");
        None
    }
}
