//! Per-augment activation, tiering, and countdown state machine.

use std::collections::BTreeMap;

use log::{debug, warn};
use simulacra_core::{AugmentDefinition, AugmentId, Event, TierBehaviour, TierId};
use simulacra_system_tier_catalog::TierCatalog;

use crate::AugmentError;

/// Lifecycle state of a single augment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AugmentState {
    /// The augment grants nothing.
    Inactive,
    /// The augment grants the effects of the contained tier.
    Active(TierId),
}

/// Result of an activation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The requested tier became the active tier.
    Activated {
        /// Tier that became active.
        tier: TierId,
    },
    /// A higher priority tier was already active and stayed active.
    Absorbed {
        /// Tier that kept running.
        kept: TierId,
    },
    /// The augment was active and the requested tier has no behaviour, so the
    /// augment ended instead.
    Cancelled,
    /// The augment was inactive and the requested tier has no behaviour.
    Rejected,
}

/// Runtime state owned by the registry for one augment definition.
///
/// The countdown is armed while `remaining_progress > 0`; at most one
/// countdown exists per runtime, re-activation patches its value instead of
/// starting another one.
#[derive(Clone, Debug)]
pub struct AugmentRuntime {
    definition: AugmentDefinition,
    behaviours: BTreeMap<TierId, TierBehaviour>,
    state: AugmentState,
    remaining_progress: f32,
    level_down_steps: usize,
}

impl AugmentRuntime {
    /// Creates an inactive runtime for a validated definition.
    pub fn new(definition: AugmentDefinition) -> Result<Self, AugmentError> {
        definition.validate()?;
        Ok(Self {
            definition,
            behaviours: BTreeMap::new(),
            state: AugmentState::Inactive,
            remaining_progress: 0.0,
            level_down_steps: 0,
        })
    }

    /// Binds a behaviour hook to one of the augment's tiers.
    pub fn register_behaviour(&mut self, behaviour: TierBehaviour) -> Result<(), AugmentError> {
        if !self.definition.supports(behaviour.tier) {
            return Err(AugmentError::TierNotListed {
                augment: self.definition.id,
                tier: behaviour.tier,
            });
        }

        if let Some(previous) = self.behaviours.insert(behaviour.tier, behaviour) {
            warn!(
                "augment `{}` rebinds tier {:?}, dropping effect `{}`",
                self.definition.name, previous.tier, previous.effect
            );
        }
        Ok(())
    }

    /// Definition the runtime was built from.
    #[must_use]
    pub fn definition(&self) -> &AugmentDefinition {
        &self.definition
    }

    /// Identifier of the augment.
    #[must_use]
    pub fn id(&self) -> AugmentId {
        self.definition.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AugmentState {
        self.state
    }

    /// Reports whether the augment is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, AugmentState::Active(_))
    }

    /// Tier currently granted by the augment.
    #[must_use]
    pub fn active_tier(&self) -> Option<TierId> {
        match self.state {
            AugmentState::Active(tier) => Some(tier),
            AugmentState::Inactive => None,
        }
    }

    /// Remaining countdown progress, `1.0` when fresh.
    #[must_use]
    pub fn remaining_progress(&self) -> f32 {
        self.remaining_progress
    }

    /// Reports whether a countdown is running.
    #[must_use]
    pub fn is_counting_down(&self) -> bool {
        self.remaining_progress > 0.0
    }

    /// Reports whether a behaviour hook is bound to `tier`.
    #[must_use]
    pub fn has_behaviour(&self, tier: TierId) -> bool {
        self.behaviours.contains_key(&tier)
    }

    /// Activates the augment in `tier`.
    ///
    /// `force_tier` bypasses the priority race and the pickup announcement;
    /// it is used by automatic level-downs.
    pub fn activate(
        &mut self,
        catalog: &TierCatalog,
        tier: TierId,
        force_tier: bool,
        out: &mut Vec<Event>,
    ) -> ActivationOutcome {
        let augment = self.definition.id;
        let previous = match self.state {
            AugmentState::Active(previous) => {
                out.push(Event::AnyTierDeactivated { augment });
                self.fire_behaviour(previous, false, out);

                if !self.has_behaviour(tier) {
                    warn!(
                        "augment `{}` cannot tier into {tier:?}, cancelling it",
                        self.definition.name
                    );
                    out.push(Event::AugmentDeactivated { augment });
                    self.reset();
                    return ActivationOutcome::Cancelled;
                }
                Some(previous)
            }
            AugmentState::Inactive => {
                if !self.has_behaviour(tier) {
                    warn!(
                        "augment `{}` has no behaviour for tier {tier:?}",
                        self.definition.name
                    );
                    return ActivationOutcome::Rejected;
                }
                out.push(Event::AugmentFirstActivated { augment });
                None
            }
        };

        if !force_tier {
            self.level_down_steps = 0;
        }

        let outcome = match previous {
            Some(kept) if !force_tier && priority(catalog, tier) < priority(catalog, kept) => {
                debug!(
                    "augment `{}` keeps {kept:?} over lower priority {tier:?}",
                    self.definition.name
                );
                ActivationOutcome::Absorbed { kept }
            }
            _ => {
                out.push(Event::AugmentTierChanged { augment, tier });
                ActivationOutcome::Activated { tier }
            }
        };

        let active = match outcome {
            ActivationOutcome::Absorbed { kept } => kept,
            _ => tier,
        };
        self.state = AugmentState::Active(active);

        out.push(Event::AnyTierActivated { augment });
        self.fire_behaviour(active, true, out);

        if !force_tier {
            out.push(Event::TierAnnounced {
                augment,
                tier: active,
            });
        }

        if self.remaining_progress <= 0.0 {
            debug!("augment `{}` starts its countdown", self.definition.name);
        }
        self.remaining_progress = 1.0;

        outcome
    }

    /// Advances the countdown by `dt` seconds.
    ///
    /// On expiry the augment levels down into the active tier's
    /// `level_down` tier, or ends. Consecutive automatic level-downs are
    /// capped at the catalog size so a cyclic chain cannot keep the augment
    /// alive forever.
    pub fn tick(&mut self, catalog: &TierCatalog, dt: f32, out: &mut Vec<Event>) {
        if !self.is_counting_down() {
            return;
        }

        let augment = self.definition.id;
        self.remaining_progress -= dt / self.definition.duration_secs;
        out.push(Event::AugmentProgress {
            augment,
            remaining: self.remaining_progress,
        });

        if self.remaining_progress > 0.0 {
            return;
        }

        let level_down = self.active_tier().and_then(|tier| catalog.level_down_of(tier));
        match level_down {
            Some(next) if self.level_down_steps < catalog.len() => {
                self.level_down_steps += 1;
                let _ = self.activate(catalog, next, true, out);
            }
            Some(next) => {
                warn!(
                    "augment `{}` stopped levelling down into {next:?} after {} steps",
                    self.definition.name, self.level_down_steps
                );
                out.push(Event::AugmentDeactivated { augment });
                self.deactivate(out);
            }
            None => {
                out.push(Event::AugmentDeactivated { augment });
                self.deactivate(out);
            }
        }
    }

    /// Ends the augment. Does nothing when already inactive.
    pub fn deactivate(&mut self, out: &mut Vec<Event>) {
        let AugmentState::Active(tier) = self.state else {
            return;
        };

        out.push(Event::AnyTierDeactivated {
            augment: self.definition.id,
        });
        self.fire_behaviour(tier, false, out);
        self.reset();
    }

    fn reset(&mut self) {
        self.state = AugmentState::Inactive;
        self.remaining_progress = 0.0;
        self.level_down_steps = 0;
    }

    fn fire_behaviour(&self, tier: TierId, activated: bool, out: &mut Vec<Event>) {
        let Some(behaviour) = self.behaviours.get(&tier) else {
            warn!(
                "augment `{}` has no behaviour bound to tier {tier:?}",
                self.definition.name
            );
            return;
        };

        let augment = self.definition.id;
        let effect = behaviour.effect.clone();
        out.push(if activated {
            Event::TierBehaviourActivated {
                augment,
                tier,
                effect,
            }
        } else {
            Event::TierBehaviourDeactivated {
                augment,
                tier,
                effect,
            }
        });
    }
}

fn priority(catalog: &TierCatalog, tier: TierId) -> i32 {
    catalog
        .get(tier)
        .map(|definition| definition.override_priority)
        .unwrap_or_default()
}
