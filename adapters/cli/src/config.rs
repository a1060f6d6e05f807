//! TOML scenario describing everything a headless run needs.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use simulacra_core::{
    AugmentDefinition, AugmentId, BattlerKind, Command, CurveId, PathId, PerspectiveId,
    TierBehaviour, TierDefinition, TierId, Vec3, WaveDefinition,
};
use simulacra_system_boundary_space::BoundarySpace;
use simulacra_system_wave_scheduler::SchedulerConfig;

const DEFAULT_SHARD_THRESHOLD: f32 = 10.0;

/// Root of a scenario file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) seed: Option<u64>,
    #[serde(default = "default_shard_threshold")]
    pub(crate) shard_threshold: f32,
    #[serde(default)]
    pub(crate) scheduler: SchedulerConfig,
    #[serde(default)]
    pub(crate) pool: PoolConfig,
    pub(crate) tiers: Vec<TierDefinition>,
    #[serde(default)]
    pub(crate) augments: Vec<AugmentDefinition>,
    #[serde(default)]
    pub(crate) behaviours: Vec<BehaviourBinding>,
    #[serde(default)]
    pub(crate) perspectives: Vec<PerspectiveConfig>,
    #[serde(default)]
    pub(crate) initial_perspective: Option<PerspectiveId>,
    #[serde(default)]
    pub(crate) curves: Vec<CurveConfig>,
    #[serde(default)]
    pub(crate) paths: Vec<PathConfig>,
    #[serde(default)]
    pub(crate) waves: Vec<WaveDefinition>,
    #[serde(default)]
    pub(crate) triggers: Vec<Trigger>,
}

impl Scenario {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario at {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse scenario toml contents")
    }
}

fn default_shard_threshold() -> f32 {
    DEFAULT_SHARD_THRESHOLD
}

/// Behaviour hook bound to one tier of an augment.
#[derive(Debug, Deserialize)]
pub(crate) struct BehaviourBinding {
    augment: AugmentId,
    tier: TierId,
    effect: String,
}

impl BehaviourBinding {
    pub(crate) fn into_binding(self) -> (AugmentId, TierBehaviour) {
        (self.augment, TierBehaviour::new(self.tier, self.effect))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PerspectiveConfig {
    pub(crate) id: PerspectiveId,
    #[serde(default)]
    pub(crate) space: BoundarySpace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum CurveKind {
    Linear,
    EaseInOut,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurveConfig {
    pub(crate) id: CurveId,
    pub(crate) kind: CurveKind,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PathConfig {
    pub(crate) id: PathId,
    pub(crate) points: Vec<Vec3>,
    #[serde(default)]
    pub(crate) closed: bool,
}

/// Capacity of the headless pool for one battler kind.
#[derive(Clone, Copy, Debug, Deserialize)]
pub(crate) struct PoolKind {
    pub(crate) kind: BattlerKind,
    pub(crate) capacity: usize,
}

/// Lifecycle of the battlers handed out by the headless pool.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct PoolConfig {
    /// Seconds a battler survives before the pool kills it.
    pub(crate) battler_lifetime_secs: f32,
    /// Seconds between death and despawn.
    pub(crate) burial_secs: f32,
    pub(crate) kinds: Vec<PoolKind>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            battler_lifetime_secs: 4.0,
            burial_secs: 0.5,
            kinds: Vec::new(),
        }
    }
}

/// Command fired once the simulation clock reaches `at_secs`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct Trigger {
    pub(crate) at_secs: f32,
    pub(crate) command: ScriptedCommand,
}

/// Subset of commands a scenario may script.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ScriptedCommand {
    StartWave,
    StopWave,
    SelectWave { index: usize },
    ActivateAugment { augment: AugmentId, tier: TierId },
    ActivateRandomAugment,
    OpenCrystal { augment: AugmentId, tier: TierId },
    DeactivateAugment { augment: AugmentId },
    AbsorbShards { value: f32 },
    SetPerspective { perspective: PerspectiveId },
    PlayerBuried,
    PlayerResurrected,
}

impl From<ScriptedCommand> for Command {
    fn from(command: ScriptedCommand) -> Self {
        match command {
            ScriptedCommand::StartWave => Command::StartWave,
            ScriptedCommand::StopWave => Command::StopWave,
            ScriptedCommand::SelectWave { index } => Command::SelectWave { index },
            ScriptedCommand::ActivateAugment { augment, tier } => {
                Command::ActivateAugment { augment, tier }
            }
            ScriptedCommand::ActivateRandomAugment => Command::ActivateRandomAugment,
            ScriptedCommand::OpenCrystal { augment, tier } => Command::OpenCrystal { augment, tier },
            ScriptedCommand::DeactivateAugment { augment } => Command::DeactivateAugment { augment },
            ScriptedCommand::AbsorbShards { value } => Command::AbsorbShards { value },
            ScriptedCommand::SetPerspective { perspective } => {
                Command::SetPerspective { perspective }
            }
            ScriptedCommand::PlayerBuried => Command::PlayerBuried,
            ScriptedCommand::PlayerResurrected => Command::PlayerResurrected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARENA: &str = include_str!("../scenarios/arena.toml");

    #[test]
    fn bundled_arena_parses() {
        let scenario = Scenario::parse(ARENA).expect("bundled scenario parses");
        assert_eq!(scenario.tiers.len(), 3);
        assert!(!scenario.augments.is_empty());
        assert!(!scenario.waves.is_empty());
        assert!(!scenario.triggers.is_empty());
        assert_eq!(scenario.initial_perspective, Some(PerspectiveId::new(0)));
        assert!(scenario
            .paths
            .iter()
            .any(|path| path.closed && path.points.len() > 2));
    }

    #[test]
    fn minimal_scenario_uses_defaults() {
        let scenario = Scenario::parse(
            r#"
                [[tiers]]
                id = 1
                name = "common"
                probability = 1.0
            "#,
        )
        .expect("minimal scenario parses");

        assert_eq!(scenario.seed, None);
        assert!((scenario.shard_threshold - DEFAULT_SHARD_THRESHOLD).abs() < f32::EPSILON);
        assert_eq!(scenario.scheduler, SchedulerConfig::default());
        assert!(scenario.pool.kinds.is_empty());
        assert!(scenario.waves.is_empty());
    }

    #[test]
    fn scripted_commands_map_onto_commands() {
        let scenario = Scenario::parse(
            r#"
                [[tiers]]
                id = 1
                name = "common"
                probability = 1.0

                [[triggers]]
                at_secs = 2.5
                command = { type = "absorb_shards", value = 12.0 }

                [[triggers]]
                at_secs = 3.0
                command = { type = "select_wave", index = 1 }

                [[triggers]]
                at_secs = 4.0
                command = { type = "open_crystal", augment = 2, tier = 1 }
            "#,
        )
        .expect("scenario parses");

        let commands: Vec<Command> = scenario
            .triggers
            .into_iter()
            .map(|trigger| trigger.command.into())
            .collect();
        assert_eq!(
            commands,
            vec![
                Command::AbsorbShards { value: 12.0 },
                Command::SelectWave { index: 1 },
                Command::OpenCrystal {
                    augment: AugmentId::new(2),
                    tier: TierId::new(1),
                },
            ]
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = Scenario::parse(
            r#"
                shards = 3

                [[tiers]]
                id = 1
                name = "common"
                probability = 1.0
            "#,
        )
        .expect_err("typo is reported");
        assert!(format!("{error:#}").contains("shards"));
    }
}
