//! Entity pool that simulates battler lifecycles without an engine.

use std::collections::BTreeMap;

use log::debug;
use simulacra_core::{
    BattlerKind, BattlerSettings, Command, EntityHandle, EntityPool, PoolError, Vec3,
};

use crate::config::PoolConfig;

#[derive(Debug)]
struct PooledBattler {
    kind: BattlerKind,
    position: Vec3,
    age: f32,
    dead_for: Option<f32>,
    settings: BattlerSettings,
}

/// Hands out battler handles, kills them after a fixed lifetime, and
/// despawns the dead after a burial delay.
#[derive(Debug)]
pub(crate) struct HeadlessPool {
    capacities: BTreeMap<BattlerKind, usize>,
    lifetime_secs: f32,
    burial_secs: f32,
    next_handle: u64,
    battlers: BTreeMap<EntityHandle, PooledBattler>,
    pending: Vec<Command>,
}

impl HeadlessPool {
    pub(crate) fn new(config: &PoolConfig) -> Self {
        Self {
            capacities: config
                .kinds
                .iter()
                .map(|entry| (entry.kind, entry.capacity))
                .collect(),
            lifetime_secs: config.battler_lifetime_secs,
            burial_secs: config.burial_secs,
            next_handle: 0,
            battlers: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    /// Ages every battler by `dt` seconds and returns the death and despawn
    /// signals raised since the previous step.
    pub(crate) fn step(&mut self, dt: f32) -> Vec<Command> {
        let lifetime = self.lifetime_secs;
        let burial = self.burial_secs;
        let mut signals = std::mem::take(&mut self.pending);

        self.battlers.retain(|&entity, battler| match battler.dead_for.as_mut() {
            Some(dead_for) => {
                *dead_for += dt;
                if *dead_for < burial {
                    return true;
                }
                debug!("{entity} buried at {}", battler.position);
                signals.push(Command::EntityDespawned { entity });
                false
            }
            None => {
                battler.age += dt;
                if battler.age >= lifetime {
                    battler.dead_for = Some(0.0);
                    signals.push(Command::EntityDied { entity });
                }
                true
            }
        });

        signals
    }

    /// Battlers currently handed out, dead or alive.
    pub(crate) fn in_use(&self) -> usize {
        self.battlers.len()
    }

    /// Living battlers allowed to shoot.
    pub(crate) fn armed(&self) -> usize {
        self.battlers
            .values()
            .filter(|battler| battler.dead_for.is_none() && battler.settings.can_shoot)
            .count()
    }
}

impl EntityPool for HeadlessPool {
    fn acquire(&mut self, kind: BattlerKind, position: Vec3) -> Result<EntityHandle, PoolError> {
        let capacity = *self
            .capacities
            .get(&kind)
            .ok_or(PoolError::UnknownKind(kind))?;
        let in_use = self
            .battlers
            .values()
            .filter(|battler| battler.kind == kind)
            .count();
        if in_use >= capacity {
            return Err(PoolError::Exhausted(kind));
        }

        self.next_handle += 1;
        let entity = EntityHandle::new(self.next_handle);
        let _ = self.battlers.insert(
            entity,
            PooledBattler {
                kind,
                position,
                age: 0.0,
                dead_for: None,
                settings: BattlerSettings::default(),
            },
        );
        Ok(entity)
    }

    fn release(&mut self, entity: EntityHandle) {
        if self.battlers.remove(&entity).is_some() {
            debug!("{entity} returned to the pool");
        }
    }

    fn kill(&mut self, entity: EntityHandle) {
        let Some(battler) = self.battlers.get_mut(&entity) else {
            return;
        };
        if battler.dead_for.is_none() {
            battler.dead_for = Some(0.0);
            self.pending.push(Command::EntityDied { entity });
        }
    }

    fn set_position(&mut self, entity: EntityHandle, position: Vec3) {
        if let Some(battler) = self.battlers.get_mut(&entity) {
            battler.position = position;
        }
    }

    fn is_dead(&self, entity: EntityHandle) -> bool {
        self.battlers
            .get(&entity)
            .map_or(true, |battler| battler.dead_for.is_some())
    }

    fn apply_settings(&mut self, entity: EntityHandle, settings: &BattlerSettings) {
        if let Some(battler) = self.battlers.get_mut(&entity) {
            battler.settings = settings.clone();
        }
    }
}
