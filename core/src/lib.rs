#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the SIMULACRA augment and wave director.
//!
//! This crate defines the message surface that connects adapters, the
//! top-level simulation loop, and pure systems. Adapters submit [`Command`]
//! values describing external triggers (clock ticks, pickups, entity deaths),
//! systems consume those commands and broadcast [`Event`] values for UI and
//! gameplay collaborators to react to. Definitions are plain data keyed by
//! integer identifiers so scenarios can be loaded from configuration files.

use std::{fmt, num::NonZeroU32, time::Duration};

pub use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier assigned to an augment tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierId(u32);

impl TierId {
    /// Creates a new tier identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an augment definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AugmentId(u32);

impl AugmentId {
    /// Creates a new augment identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifies the type of battler a sequence spawns through the entity pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BattlerKind(u32);

impl BattlerKind {
    /// Creates a new battler kind with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the battler kind.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifies an easing curve registered with the motion library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurveId(u32);

impl CurveId {
    /// Built-in curve mapping `t` onto itself.
    pub const LINEAR: CurveId = CurveId(0);
    /// Built-in curve that eases in and out with flat tangents at both ends.
    pub const EASE_IN_OUT: CurveId = CurveId(1);

    /// Creates a new curve identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl Default for CurveId {
    fn default() -> Self {
        Self::EASE_IN_OUT
    }
}

/// Identifies a path evaluator registered with the motion library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(u32);

impl PathId {
    /// Creates a new path identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifies a named boundary configuration the world can switch to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerspectiveId(u32);

impl PerspectiveId {
    /// Creates a new perspective identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque handle to a live entity owned by the external entity pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Creates a new entity handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "battler#{}", self.0)
    }
}

/// Power-level variant shared by every augment that lists it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierDefinition {
    /// Identifier of the tier.
    pub id: TierId,
    /// Human readable name of the tier.
    pub name: String,
    /// Selection weight used by weighted draws, usually within `0.0..=1.0`.
    pub probability: f32,
    /// Priority compared when a new tier races an already active one.
    #[serde(default)]
    pub override_priority: i32,
    /// Tier the augment decays into once its countdown expires.
    #[serde(default)]
    pub level_down: Option<TierId>,
}

impl TierDefinition {
    /// Creates a tier with zero priority and no level-down target.
    #[must_use]
    pub fn new(id: TierId, name: impl Into<String>, probability: f32) -> Self {
        Self {
            id,
            name: name.into(),
            probability,
            override_priority: 0,
            level_down: None,
        }
    }

    /// Overrides the priority used during tier races.
    #[must_use]
    pub fn with_priority(mut self, override_priority: i32) -> Self {
        self.override_priority = override_priority;
        self
    }

    /// Configures the tier the augment decays into on expiry.
    #[must_use]
    pub fn with_level_down(mut self, tier: TierId) -> Self {
        self.level_down = Some(tier);
        self
    }
}

/// Timed gameplay modifier that can be activated in any of its tiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AugmentDefinition {
    /// Identifier of the augment.
    pub id: AugmentId,
    /// Display name of the augment.
    pub name: String,
    /// Player facing description.
    #[serde(default)]
    pub description: String,
    /// Countdown length in seconds; every tier shares the same duration.
    pub duration_secs: f32,
    /// Tiers the augment can be activated in, in authoring order.
    pub tiers: Vec<TierId>,
}

impl AugmentDefinition {
    /// Creates a new augment definition without a description.
    #[must_use]
    pub fn new(id: AugmentId, name: impl Into<String>, duration_secs: f32, tiers: Vec<TierId>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            duration_secs,
            tiers,
        }
    }

    /// Reports whether the augment lists the provided tier.
    #[must_use]
    pub fn supports(&self, tier: TierId) -> bool {
        self.tiers.contains(&tier)
    }

    /// Validates the definition before a runtime is built for it.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(DefinitionError::NonPositiveDuration {
                augment: self.id,
                duration_secs: self.duration_secs,
            });
        }
        Ok(())
    }
}

/// Tier specific behaviour hook bound to an augment.
///
/// Firing the hook broadcasts the `effect` key; gameplay collaborators match
/// on it to toggle fire rate, move speed, and similar modifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBehaviour {
    /// Tier the hook is registered for.
    pub tier: TierId,
    /// Opaque effect key dispatched to downstream systems.
    pub effect: String,
}

impl TierBehaviour {
    /// Creates a behaviour hook for the provided tier.
    #[must_use]
    pub fn new(tier: TierId, effect: impl Into<String>) -> Self {
        Self {
            tier,
            effect: effect.into(),
        }
    }
}

/// Describes where a motion starts or ends in normalised design space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionSpace {
    /// A single normalised point shared by every spawn of the sequence.
    Point {
        /// Normalised position, nominally within `[-1, 1]` on each axis.
        point: Vec3,
    },
    /// Spawns are distributed along a path evaluated by the motion library.
    Path {
        /// Path evaluator to sample.
        path: PathId,
        /// Normalised offset added to every sampled position.
        #[serde(default)]
        origin: Vec3,
        /// Uniform scale applied to sampled positions before the offset.
        #[serde(default = "default_scale")]
        scale: f32,
    },
}

impl MotionSpace {
    /// Creates a point motion space.
    #[must_use]
    pub const fn point(point: Vec3) -> Self {
        Self::Point { point }
    }
}

fn default_scale() -> f32 {
    1.0
}

/// Travel plan applied to every battler spawned by a sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    /// Where battlers appear.
    pub origin: MotionSpace,
    /// Where battlers travel to.
    pub destination: MotionSpace,
    /// Easing curve applied to the interpolation factor.
    #[serde(default)]
    pub curve: CurveId,
    /// Travel time in seconds.
    #[serde(default = "default_motion_duration")]
    pub duration_secs: f32,
}

impl Motion {
    /// Creates a motion using the default easing curve.
    #[must_use]
    pub fn new(origin: MotionSpace, destination: MotionSpace, duration_secs: f32) -> Self {
        Self {
            origin,
            destination,
            curve: CurveId::default(),
            duration_secs,
        }
    }

    /// Overrides the easing curve.
    #[must_use]
    pub fn with_curve(mut self, curve: CurveId) -> Self {
        self.curve = curve;
        self
    }
}

fn default_motion_duration() -> f32 {
    1.0
}

/// Per-sequence settings forwarded to each spawned battler's behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattlerSettings {
    /// Whether the battler's weapon is ever enabled.
    pub can_shoot: bool,
    /// Seconds after spawning before the weapon is enabled.
    pub delay_before_start_shooting_secs: f32,
    /// Scale applied to the weapon's intermittent shooting offset.
    pub intermittent_shoot_offset: f32,
    /// Whether the spawn invulnerability window is overridden.
    pub override_spawn_iframe: bool,
    /// Length of the spawn invulnerability window in seconds.
    pub invulnerability_at_spawn_secs: f32,
}

impl Default for BattlerSettings {
    fn default() -> Self {
        Self {
            can_shoot: true,
            delay_before_start_shooting_secs: 1.0,
            intermittent_shoot_offset: 1.0,
            override_spawn_iframe: false,
            invulnerability_at_spawn_secs: 0.5,
        }
    }
}

/// One spawn sub-plan within a wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceSpec {
    /// Seconds to wait before the first spawn.
    #[serde(default)]
    pub delay_secs: f32,
    /// Motion applied to spawned battlers.
    pub motion: Motion,
    /// Battler type requested from the pool.
    pub battler: BattlerKind,
    /// Number of battlers spawned by the sequence.
    pub spawn_count: NonZeroU32,
    /// Seconds between two consecutive spawns.
    #[serde(default = "default_spawn_offset")]
    pub spawn_offset_secs: f32,
    /// Settings forwarded to every spawned battler.
    #[serde(default)]
    pub settings: BattlerSettings,
}

impl SequenceSpec {
    /// Creates a sequence without delay, using default battler settings.
    #[must_use]
    pub fn new(battler: BattlerKind, motion: Motion, spawn_count: NonZeroU32, spawn_offset_secs: f32) -> Self {
        Self {
            delay_secs: 0.0,
            motion,
            battler,
            spawn_count,
            spawn_offset_secs,
            settings: BattlerSettings::default(),
        }
    }

    /// Overrides the delay before the first spawn.
    #[must_use]
    pub fn with_delay(mut self, delay_secs: f32) -> Self {
        self.delay_secs = delay_secs;
        self
    }

    /// Overrides the settings forwarded to spawned battlers.
    #[must_use]
    pub fn with_settings(mut self, settings: BattlerSettings) -> Self {
        self.settings = settings;
        self
    }
}

fn default_spawn_offset() -> f32 {
    1.0
}

/// Ordered collection of sequences executed together and possibly repeated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Name of the wave shown by debug tooling.
    pub name: String,
    /// Number of times every sequence is replayed.
    #[serde(default = "default_repeat_count")]
    pub repeat_count: NonZeroU32,
    /// Extra seconds inserted between two cycles.
    #[serde(default = "default_cycle_delay")]
    pub delay_between_cycles_secs: f32,
    /// Sequences dispatched by every cycle.
    pub sequences: Vec<SequenceSpec>,
}

impl WaveDefinition {
    /// Creates a single-cycle wave from the provided sequences.
    #[must_use]
    pub fn new(name: impl Into<String>, sequences: Vec<SequenceSpec>) -> Self {
        Self {
            name: name.into(),
            repeat_count: default_repeat_count(),
            delay_between_cycles_secs: default_cycle_delay(),
            sequences,
        }
    }

    /// Overrides the repeat count and the delay between cycles.
    #[must_use]
    pub fn with_repeat(mut self, repeat_count: NonZeroU32, delay_between_cycles_secs: f32) -> Self {
        self.repeat_count = repeat_count;
        self.delay_between_cycles_secs = delay_between_cycles_secs;
        self
    }

    /// Total number of sequence instances dispatched across all cycles.
    #[must_use]
    pub fn total_sequences(&self) -> usize {
        self.sequences.len() * self.repeat_count.get() as usize
    }

    /// Validates timing values before the wave is scheduled.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.sequences.is_empty() {
            return Err(DefinitionError::EmptyWave {
                wave: self.name.clone(),
            });
        }

        let non_negative = |value: f32| value.is_finite() && value >= 0.0;
        if !non_negative(self.delay_between_cycles_secs) {
            return Err(DefinitionError::InvalidTiming {
                wave: self.name.clone(),
                field: "delay_between_cycles_secs",
            });
        }
        for sequence in &self.sequences {
            if !non_negative(sequence.delay_secs) {
                return Err(DefinitionError::InvalidTiming {
                    wave: self.name.clone(),
                    field: "delay_secs",
                });
            }
            if !non_negative(sequence.spawn_offset_secs) {
                return Err(DefinitionError::InvalidTiming {
                    wave: self.name.clone(),
                    field: "spawn_offset_secs",
                });
            }
            if !non_negative(sequence.motion.duration_secs) {
                return Err(DefinitionError::InvalidTiming {
                    wave: self.name.clone(),
                    field: "duration_secs",
                });
            }
        }
        Ok(())
    }
}

fn default_repeat_count() -> NonZeroU32 {
    NonZeroU32::MIN
}

fn default_cycle_delay() -> f32 {
    1.0
}

/// Reasons a definition is refused before the simulation starts.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DefinitionError {
    /// An augment countdown must last a strictly positive, finite time.
    #[error("augment {augment:?} has a non-positive duration of {duration_secs}s")]
    NonPositiveDuration {
        /// Offending augment.
        augment: AugmentId,
        /// Configured duration.
        duration_secs: f32,
    },
    /// A wave must dispatch at least one sequence.
    #[error("wave `{wave}` has no sequences")]
    EmptyWave {
        /// Name of the offending wave.
        wave: String,
    },
    /// A wave timing value is negative or not finite.
    #[error("wave `{wave}` has an invalid `{field}` value")]
    InvalidTiming {
        /// Name of the offending wave.
        wave: String,
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Commands that express every external trigger the director reacts to.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests activation of an augment in a specific tier.
    ActivateAugment {
        /// Augment to activate.
        augment: AugmentId,
        /// Tier requested by the pickup.
        tier: TierId,
    },
    /// Requests a weighted random tier on a random augment supporting it.
    ActivateRandomAugment,
    /// Reports that the player opened a crystal holding a drawn augment tier.
    OpenCrystal {
        /// Augment stored in the crystal.
        augment: AugmentId,
        /// Tier stored in the crystal.
        tier: TierId,
    },
    /// Requests that an augment ends immediately.
    DeactivateAugment {
        /// Augment to deactivate.
        augment: AugmentId,
    },
    /// Reports shards absorbed by the player.
    AbsorbShards {
        /// Value of the absorbed shards.
        value: f32,
    },
    /// Starts the current wave.
    StartWave,
    /// Stops the current wave and advances to the next one.
    StopWave,
    /// Tears down the current wave and starts the wave at `index`.
    SelectWave {
        /// Index of the wave to start.
        index: usize,
    },
    /// Reports that a spawned entity died.
    EntityDied {
        /// Entity that died.
        entity: EntityHandle,
    },
    /// Reports that a spawned entity was buried or despawned.
    EntityDespawned {
        /// Entity that despawned.
        entity: EntityHandle,
    },
    /// Reports that the player character was buried.
    PlayerBuried,
    /// Reports that the player character came back to life.
    PlayerResurrected,
    /// Requests a switch to another boundary perspective.
    SetPerspective {
        /// Perspective to activate.
        perspective: PerspectiveId,
    },
}

/// Why a battler left the active set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemovalCause {
    /// The battler's health reached zero.
    Died,
    /// The battler was returned to the pool.
    Despawned,
}

/// Events broadcast by systems after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// An inactive augment received its first activation.
    AugmentFirstActivated {
        /// Augment that became active.
        augment: AugmentId,
    },
    /// The active tier of an augment changed.
    AugmentTierChanged {
        /// Augment whose tier changed.
        augment: AugmentId,
        /// Tier that became active.
        tier: TierId,
    },
    /// Any tier of the augment was activated.
    AnyTierActivated {
        /// Augment that was activated.
        augment: AugmentId,
    },
    /// Any tier of the augment was deactivated.
    AnyTierDeactivated {
        /// Augment that was deactivated.
        augment: AugmentId,
    },
    /// A tier specific behaviour hook was activated.
    TierBehaviourActivated {
        /// Augment owning the hook.
        augment: AugmentId,
        /// Tier owning the hook.
        tier: TierId,
        /// Effect key carried by the hook.
        effect: String,
    },
    /// A tier specific behaviour hook was deactivated.
    TierBehaviourDeactivated {
        /// Augment owning the hook.
        augment: AugmentId,
        /// Tier owning the hook.
        tier: TierId,
        /// Effect key carried by the hook.
        effect: String,
    },
    /// A player facing pickup should be announced.
    TierAnnounced {
        /// Augment that was picked up.
        augment: AugmentId,
        /// Tier active after the pickup.
        tier: TierId,
    },
    /// The countdown of an augment advanced.
    AugmentProgress {
        /// Augment counting down.
        augment: AugmentId,
        /// Remaining progress, `1.0` when fresh and `<= 0.0` when expired.
        remaining: f32,
    },
    /// The augment ended without levelling down.
    AugmentDeactivated {
        /// Augment that ended.
        augment: AugmentId,
    },
    /// The accumulated shard value changed.
    ShardValueChanged {
        /// Value accumulated toward the next level-up.
        accumulated: f32,
        /// Value required for a level-up.
        threshold: f32,
    },
    /// Enough shards were absorbed to grant an augment.
    ShardLevelUp,
    /// The active boundary perspective changed.
    PerspectiveChanged {
        /// Perspective that was active before the switch.
        from: Option<PerspectiveId>,
        /// Perspective that became active.
        to: PerspectiveId,
    },
    /// A wave started dispatching its sequences.
    WaveStarted {
        /// Index of the wave.
        wave: usize,
    },
    /// A battler was spawned by a sequence.
    BattlerSpawned {
        /// Handle of the spawned entity.
        entity: EntityHandle,
        /// Battler type that was spawned.
        kind: BattlerKind,
        /// Index of the sequence within its wave.
        sequence: usize,
        /// World-space spawn position.
        position: Vec3,
    },
    /// A battler left the active set.
    BattlerRemoved {
        /// Handle of the removed entity.
        entity: EntityHandle,
        /// Signal that triggered the removal.
        cause: RemovalCause,
    },
    /// A sequence finished dispatching its spawns.
    SequenceCompleted {
        /// Index of the wave.
        wave: usize,
        /// Index of the sequence within the wave.
        sequence: usize,
    },
    /// Every sequence of the wave ran and every battler was removed.
    WaveCompleted {
        /// Index of the wave.
        wave: usize,
    },
    /// The last wave of the collection was stopped.
    AllWavesCompleted,
    /// The player was buried and the battle was torn down.
    GameOver,
}

/// Reasons the entity pool may refuse a request.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No prototype is registered for the requested battler kind.
    #[error("no pooled prototype registered for battler kind {0:?}")]
    UnknownKind(BattlerKind),
    /// The pool cannot hand out more instances of the battler kind.
    #[error("pool exhausted for battler kind {0:?}")]
    Exhausted(BattlerKind),
    /// The acquired entity lacks a proxy the scheduler relies on.
    #[error("{entity} is missing its {proxy} proxy")]
    MissingProxy {
        /// Entity lacking the proxy.
        entity: EntityHandle,
        /// Name of the missing proxy.
        proxy: &'static str,
    },
}

/// External object pool that owns spawned battler instances.
///
/// Death and despawn signals raised by pooled entities are delivered back as
/// [`Command::EntityDied`] and [`Command::EntityDespawned`].
pub trait EntityPool {
    /// Hands out an instance of `kind` placed at `position`.
    fn acquire(&mut self, kind: BattlerKind, position: Vec3) -> Result<EntityHandle, PoolError>;

    /// Returns the instance to the pool.
    fn release(&mut self, entity: EntityHandle);

    /// Forces the instance's health to zero.
    fn kill(&mut self, entity: EntityHandle);

    /// Moves the instance's physics proxy.
    fn set_position(&mut self, entity: EntityHandle, position: Vec3);

    /// Reports whether the instance's health proxy considers it dead.
    fn is_dead(&self, entity: EntityHandle) -> bool;

    /// Forwards per-sequence settings to the instance's behaviour.
    fn apply_settings(&mut self, entity: EntityHandle, settings: &BattlerSettings);
}

/// Opaque easing function evaluated over normalised time.
pub trait EasingCurve: fmt::Debug {
    /// Maps `t` in `[0, 1]` to an interpolation factor in `[0, 1]`.
    fn evaluate(&self, t: f32) -> f32;
}

/// Opaque parametric path evaluated over normalised progress.
pub trait PathEvaluator: fmt::Debug {
    /// Position along the path at normalised progress `t`.
    fn evaluate_position(&self, t: f32) -> Vec3;

    /// Whether the path loops back onto its start.
    fn is_closed(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(delay_secs: f32, spawn_offset_secs: f32) -> SequenceSpec {
        SequenceSpec::new(
            BattlerKind::new(1),
            Motion::new(
                MotionSpace::point(Vec3::ZERO),
                MotionSpace::point(Vec3::ONE),
                1.0,
            ),
            NonZeroU32::new(3).expect("non-zero count"),
            spawn_offset_secs,
        )
        .with_delay(delay_secs)
    }

    #[test]
    fn total_sequences_multiplies_by_repeat_count() {
        let wave = WaveDefinition::new("double", vec![sequence(0.0, 0.5), sequence(1.0, 0.5)])
            .with_repeat(NonZeroU32::new(3).expect("repeat"), 2.0);
        assert_eq!(wave.total_sequences(), 6);
    }

    #[test]
    fn negative_spawn_offset_is_rejected() {
        let wave = WaveDefinition::new("broken", vec![sequence(0.0, -1.0)]);
        assert_eq!(
            wave.validate(),
            Err(DefinitionError::InvalidTiming {
                wave: "broken".to_owned(),
                field: "spawn_offset_secs",
            })
        );
    }

    #[test]
    fn wave_without_sequences_is_rejected() {
        let wave = WaveDefinition::new("hollow", Vec::new());
        assert_eq!(
            wave.validate(),
            Err(DefinitionError::EmptyWave {
                wave: "hollow".to_owned(),
            })
        );
    }

    #[test]
    fn zero_duration_augment_is_rejected() {
        let augment = AugmentDefinition::new(AugmentId::new(4), "haste", 0.0, vec![TierId::new(1)]);
        assert!(augment.validate().is_err());
        let augment = AugmentDefinition::new(AugmentId::new(4), "haste", 3.0, vec![TierId::new(1)]);
        assert!(augment.validate().is_ok());
        assert!(augment.supports(TierId::new(1)));
        assert!(!augment.supports(TierId::new(2)));
    }

    #[test]
    fn battler_settings_defaults_match_authoring_defaults() {
        let settings = BattlerSettings::default();
        assert!(settings.can_shoot);
        assert!(!settings.override_spawn_iframe);
        assert!((settings.invulnerability_at_spawn_secs - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn default_curve_eases_in_and_out() {
        assert_eq!(CurveId::default(), CurveId::EASE_IN_OUT);
    }

    #[test]
    fn wave_fills_authoring_defaults_when_parsed() {
        let source = r#"
            name = "opening"

            [[sequences]]
            battler = 2
            spawn_count = 4

            [sequences.motion]
            origin = { type = "point", point = [0.0, 0.0, 1.5] }
            destination = { type = "path", path = 7, scale = 0.5 }
        "#;
        let wave: WaveDefinition = toml::from_str(source).expect("wave parses");
        assert_eq!(wave.repeat_count.get(), 1);
        assert!((wave.delay_between_cycles_secs - 1.0).abs() < f32::EPSILON);

        let sequence = &wave.sequences[0];
        assert_eq!(sequence.battler, BattlerKind::new(2));
        assert_eq!(sequence.spawn_count.get(), 4);
        assert!((sequence.spawn_offset_secs - 1.0).abs() < f32::EPSILON);
        assert_eq!(sequence.settings, BattlerSettings::default());
        assert_eq!(sequence.motion.curve, CurveId::EASE_IN_OUT);
        assert_eq!(
            sequence.motion.destination,
            MotionSpace::Path {
                path: PathId::new(7),
                origin: Vec3::ZERO,
                scale: 0.5,
            }
        );
    }

    #[test]
    fn zero_spawn_count_is_refused_by_the_parser() {
        let source = r#"
            name = "empty"

            [[sequences]]
            battler = 2
            spawn_count = 0

            [sequences.motion]
            origin = { type = "point", point = [0.0, 0.0, 0.0] }
            destination = { type = "point", point = [0.0, 0.0, 0.0] }
        "#;
        assert!(toml::from_str::<WaveDefinition>(source).is_err());
    }
}
