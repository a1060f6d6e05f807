//! Registry mapping augment definitions to their runtimes.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    time::Duration,
};

use log::{info, warn};
use rand::Rng;
use simulacra_core::{AugmentDefinition, AugmentId, Command, Event, TierBehaviour, TierId};
use simulacra_system_tier_catalog::TierCatalog;

use crate::{ActivationOutcome, AugmentError, AugmentRuntime};

const MAX_DRAW_ATTEMPTS: u32 = 3;

/// Augment and tier picked by a weighted draw, not yet activated.
///
/// Crystals hold a draw until the player opens them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AugmentDraw {
    /// Augment listing the drawn tier.
    pub augment: AugmentId,
    /// Tier drawn from the catalog.
    pub tier: TierId,
}

/// Summary of a random activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomActivation {
    /// Augment that received the tier.
    pub augment: AugmentId,
    /// Tier drawn from the catalog.
    pub tier: TierId,
    /// Outcome reported by the augment's runtime.
    pub outcome: ActivationOutcome,
}

/// Owns every augment runtime and routes activation requests to them.
#[derive(Clone, Debug)]
pub struct AugmentRegistry {
    catalog: TierCatalog,
    runtimes: BTreeMap<AugmentId, AugmentRuntime>,
    tier_index: BTreeMap<TierId, Vec<AugmentId>>,
}

impl AugmentRegistry {
    /// Builds the registry from the tier catalog, the augment definitions,
    /// and the behaviour hooks bound to each augment.
    pub fn new(
        catalog: TierCatalog,
        definitions: Vec<AugmentDefinition>,
        bindings: Vec<(AugmentId, TierBehaviour)>,
    ) -> Result<Self, AugmentError> {
        let mut runtimes = BTreeMap::new();
        for definition in definitions {
            for &tier in &definition.tiers {
                if catalog.get(tier).is_none() {
                    return Err(AugmentError::UnknownTier {
                        augment: definition.id,
                        tier,
                    });
                }
            }

            match runtimes.entry(definition.id) {
                Entry::Occupied(_) => return Err(AugmentError::DuplicateAugment(definition.id)),
                Entry::Vacant(slot) => {
                    let _ = slot.insert(AugmentRuntime::new(definition)?);
                }
            }
        }

        for (augment, behaviour) in bindings {
            runtimes
                .get_mut(&augment)
                .ok_or(AugmentError::UnknownAugment(augment))?
                .register_behaviour(behaviour)?;
        }

        let mut tier_index: BTreeMap<TierId, Vec<AugmentId>> = BTreeMap::new();
        for tier in catalog.iter() {
            let supporting = tier_index.entry(tier.id).or_default();
            for runtime in runtimes.values() {
                if runtime.definition().supports(tier.id) {
                    supporting.push(runtime.id());
                }
            }

            if catalog.has_level_down_cycle(tier.id) {
                warn!(
                    "tier `{}` levels down in a cycle; augments will end after {} automatic steps",
                    tier.name,
                    catalog.len()
                );
            }
        }

        for runtime in runtimes.values() {
            for &tier in &runtime.definition().tiers {
                if !runtime.has_behaviour(tier) {
                    warn!(
                        "augment `{}` lists tier {tier:?} without a behaviour; activations in it will be refused",
                        runtime.definition().name
                    );
                }
            }
        }

        Ok(Self {
            catalog,
            runtimes,
            tier_index,
        })
    }

    /// Tier catalog shared by every augment.
    #[must_use]
    pub fn catalog(&self) -> &TierCatalog {
        &self.catalog
    }

    /// Looks up the runtime of an augment.
    #[must_use]
    pub fn runtime(&self, augment: AugmentId) -> Option<&AugmentRuntime> {
        self.runtimes.get(&augment)
    }

    /// Iterator over every runtime in identifier order.
    pub fn runtimes(&self) -> impl Iterator<Item = &AugmentRuntime> {
        self.runtimes.values()
    }

    /// Augments listing `tier`, in identifier order.
    #[must_use]
    pub fn augments_for_tier(&self, tier: TierId) -> &[AugmentId] {
        self.tier_index.get(&tier).map_or(&[], Vec::as_slice)
    }

    /// Picks a uniformly random augment among those listing `tier`.
    pub fn random_augment_for_tier<R: Rng>(&self, tier: TierId, rng: &mut R) -> Option<AugmentId> {
        let augments = self.augments_for_tier(tier);
        if augments.is_empty() {
            return None;
        }
        Some(augments[rng.gen_range(0..augments.len())])
    }

    /// Activates `augment` in `tier` as a player facing pickup.
    pub fn activate(
        &mut self,
        augment: AugmentId,
        tier: TierId,
        out: &mut Vec<Event>,
    ) -> Result<ActivationOutcome, AugmentError> {
        let catalog = &self.catalog;
        let Some(runtime) = self.runtimes.get_mut(&augment) else {
            warn!("cannot activate unknown augment {augment:?}");
            return Err(AugmentError::UnknownAugment(augment));
        };
        Ok(runtime.activate(catalog, tier, false, out))
    }

    /// Draws a weighted tier and picks an augment listing it, without
    /// activating anything.
    ///
    /// A failed draw is retried a few times before surfacing as
    /// [`AugmentError::NoTierSelected`].
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Result<AugmentDraw, AugmentError> {
        let tier = (0..MAX_DRAW_ATTEMPTS)
            .find_map(|_| self.catalog.draw_weighted_tier(rng))
            .ok_or(AugmentError::NoTierSelected {
                attempts: MAX_DRAW_ATTEMPTS,
            })?;
        let augment = self
            .random_augment_for_tier(tier, rng)
            .ok_or(AugmentError::NoAugmentForTier(tier))?;
        Ok(AugmentDraw { augment, tier })
    }

    /// Draws a weighted tier, picks an augment listing it, and activates it.
    pub fn activate_random<R: Rng>(
        &mut self,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> Result<RandomActivation, AugmentError> {
        let AugmentDraw { augment, tier } = self.draw(rng)?;
        info!("granting tier {tier:?} of augment {augment:?}");
        let outcome = self.activate(augment, tier, out)?;
        Ok(RandomActivation {
            augment,
            tier,
            outcome,
        })
    }

    /// Ends `augment` immediately.
    pub fn deactivate(&mut self, augment: AugmentId, out: &mut Vec<Event>) -> Result<(), AugmentError> {
        let Some(runtime) = self.runtimes.get_mut(&augment) else {
            warn!("cannot deactivate unknown augment {augment:?}");
            return Err(AugmentError::UnknownAugment(augment));
        };
        runtime.deactivate(out);
        Ok(())
    }

    /// Advances every running countdown by `dt`.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let seconds = dt.as_secs_f32();
        if seconds <= 0.0 {
            return;
        }

        let catalog = &self.catalog;
        for runtime in self.runtimes.values_mut() {
            runtime.tick(catalog, seconds, out);
        }
    }

    /// Consumes augment related commands and emits lifecycle events.
    pub fn handle<R: Rng>(&mut self, commands: &[Command], rng: &mut R, out: &mut Vec<Event>) {
        for command in commands {
            let result = match command {
                Command::Tick { dt } => {
                    self.tick(*dt, out);
                    Ok(())
                }
                Command::ActivateAugment { augment, tier }
                | Command::OpenCrystal { augment, tier } => {
                    self.activate(*augment, *tier, out).map(|_| ())
                }
                Command::ActivateRandomAugment => self.activate_random(rng, out).map(|_| ()),
                Command::DeactivateAugment { augment } => self.deactivate(*augment, out),
                _ => Ok(()),
            };

            if let Err(error) = result {
                warn!("augment command {command:?} failed: {error}");
            }
        }
    }
}
