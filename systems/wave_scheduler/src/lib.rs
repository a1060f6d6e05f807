#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave scheduler dispatching timed battler sequences along parametric paths.
//!
//! The scheduler owns no entities: battlers are acquired from an external
//! [`EntityPool`] passed to every call, and their death or despawn signals
//! come back as commands. Sequences and the delayed start of the next wave
//! run as cooperative tasks resumed by [`WaveScheduler::tick`].

mod motion;
mod tasks;

use std::{collections::BTreeMap, time::Duration};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use simulacra_core::{
    BattlerKind, Command, CurveId, DefinitionError, EntityHandle, EntityPool, Event, MotionSpace,
    PathId, PoolError, RemovalCause, SequenceSpec, Vec3, WaveDefinition,
};
use simulacra_system_boundary_space::BoundarySpace;
use thiserror::Error;

use crate::{
    motion::{BattlerMotion, MotionStep},
    tasks::{Task, TaskQueue},
};

pub use motion::{EaseInOutCurve, LinearCurve, MotionLibrary, PolylinePath};

/// Errors reported while scheduling waves.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum WaveError {
    /// The entity pool refused a request.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// A wave definition is invalid.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// The requested wave index is outside the collection.
    #[error("wave {index} does not exist, the collection holds {count} waves")]
    UnknownWave {
        /// Requested index.
        index: usize,
        /// Number of waves in the collection.
        count: usize,
    },
    /// A wave is already running.
    #[error("wave {0} is already running")]
    AlreadyRunning(usize),
    /// A motion references a curve missing from the library.
    #[error("curve {0:?} is not registered")]
    UnknownCurve(CurveId),
    /// A motion references a path missing from the library.
    #[error("path {0:?} is not registered")]
    UnknownPath(PathId),
    /// A path needs at least one point.
    #[error("a path needs at least one point")]
    EmptyPath,
}

/// Behaviour of the scheduler once a wave stops.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Schedules the next wave once the current one stops.
    pub start_next_automatically: bool,
    /// Restarts from the first wave once the last one stops.
    pub loop_on_end: bool,
    /// Seconds between a wave stopping and the next one starting.
    pub delay_between_waves_secs: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start_next_automatically: true,
            loop_on_end: false,
            delay_between_waves_secs: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ActiveBattler {
    kind: BattlerKind,
    sequence: usize,
}

/// Dispatches the sequences of a wave collection and tracks their battlers.
#[derive(Debug)]
pub struct WaveScheduler {
    config: SchedulerConfig,
    waves: Vec<WaveDefinition>,
    library: MotionLibrary,
    boundary: BoundarySpace,
    tasks: TaskQueue,
    motions: Vec<BattlerMotion>,
    active: BTreeMap<EntityHandle, ActiveBattler>,
    current_wave: usize,
    remaining_sequences: usize,
    remaining_entities: usize,
    initialized: bool,
    listening_for_burial: bool,
    now: Duration,
    session: u64,
}

impl WaveScheduler {
    /// Creates a scheduler for `waves`, validating their timings.
    pub fn new(
        waves: Vec<WaveDefinition>,
        library: MotionLibrary,
        config: SchedulerConfig,
    ) -> Result<Self, WaveError> {
        for wave in &waves {
            wave.validate()?;
        }

        Ok(Self {
            config,
            waves,
            library,
            boundary: BoundarySpace::default(),
            tasks: TaskQueue::default(),
            motions: Vec::new(),
            active: BTreeMap::new(),
            current_wave: 0,
            remaining_sequences: 0,
            remaining_entities: 0,
            initialized: false,
            listening_for_burial: true,
            now: Duration::ZERO,
            session: 0,
        })
    }

    /// Replaces the boundary used to remap future spawns.
    pub fn set_boundary_space(&mut self, boundary: BoundarySpace) {
        self.boundary = boundary;
    }

    /// Boundary used to remap spawns.
    #[must_use]
    pub fn boundary_space(&self) -> &BoundarySpace {
        &self.boundary
    }

    /// Scheduler configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Waves dispatched by the scheduler.
    #[must_use]
    pub fn waves(&self) -> &[WaveDefinition] {
        &self.waves
    }

    /// Index of the current wave.
    #[must_use]
    pub fn current_wave(&self) -> usize {
        self.current_wave
    }

    /// Sequences of the current wave that have not finished spawning.
    #[must_use]
    pub fn remaining_sequences(&self) -> usize {
        self.remaining_sequences
    }

    /// Battlers spawned by the current wave and not yet removed.
    #[must_use]
    pub fn remaining_entities(&self) -> usize {
        self.remaining_entities
    }

    /// Handles of the battlers still tracked by the current wave.
    pub fn active_entities(&self) -> impl ExactSizeIterator<Item = EntityHandle> + '_ {
        self.active.keys().copied()
    }

    /// Reports whether a wave session is running.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Simulated time elapsed since the scheduler was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timed tasks waiting to resume.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Starts the current wave and resumes the tasks that are already due.
    pub fn start_wave(
        &mut self,
        pool: &mut dyn EntityPool,
        out: &mut Vec<Event>,
    ) -> Result<(), WaveError> {
        self.begin_wave(out)?;
        self.resume_due_tasks(pool, out)
    }

    /// Stops the current wave, kills its battlers, and moves to the next one.
    ///
    /// Past the last wave, `loop_on_end` restarts wave 0 right away; its due
    /// tasks resume on the next tick.
    pub fn stop_wave(&mut self, pool: &mut dyn EntityPool, out: &mut Vec<Event>) {
        if !self.initialized {
            debug!("wave {} is not running, nothing to stop", self.current_wave);
            return;
        }

        for entity in std::mem::take(&mut self.active).into_keys() {
            pool.kill(entity);
        }
        self.end_session();

        self.current_wave += 1;
        if self.current_wave >= self.waves.len() {
            info!("all {} waves completed", self.waves.len());
            out.push(Event::AllWavesCompleted);
            if self.config.loop_on_end {
                self.current_wave = 0;
                if let Err(error) = self.begin_wave(out) {
                    warn!("failed to loop back to the first wave: {error}");
                }
            }
            return;
        }

        if self.config.start_next_automatically {
            let resume_at = self.now + secs(self.config.delay_between_waves_secs);
            self.tasks.schedule(resume_at, Task::StartWave);
        }
    }

    /// Tears down the running wave without advancing, then starts `index`.
    pub fn select_wave(
        &mut self,
        index: usize,
        pool: &mut dyn EntityPool,
        out: &mut Vec<Event>,
    ) -> Result<(), WaveError> {
        if index >= self.waves.len() {
            return Err(WaveError::UnknownWave {
                index,
                count: self.waves.len(),
            });
        }

        for entity in std::mem::take(&mut self.active).into_keys() {
            pool.kill(entity);
        }
        self.end_session();
        self.current_wave = index;
        self.start_wave(pool, out)
    }

    /// Returns every battler to the pool and ends the battle.
    ///
    /// Further burials are ignored until [`Self::player_resurrected`].
    pub fn player_buried(&mut self, pool: &mut dyn EntityPool, out: &mut Vec<Event>) {
        if !self.listening_for_burial {
            debug!("ignoring burial, the battle is already over");
            return;
        }

        for entity in std::mem::take(&mut self.active).into_keys() {
            pool.release(entity);
        }
        self.end_session();
        self.listening_for_burial = false;
        info!("player buried during wave {}", self.current_wave);
        out.push(Event::GameOver);
    }

    /// Re-arms the burial listener.
    pub fn player_resurrected(&mut self) {
        self.listening_for_burial = true;
    }

    /// Handles a death or despawn signal raised by a battler.
    pub fn remove_entity(
        &mut self,
        entity: EntityHandle,
        cause: RemovalCause,
        pool: &mut dyn EntityPool,
        out: &mut Vec<Event>,
    ) {
        let Some(battler) = self.active.remove(&entity) else {
            debug!("{entity} is not tracked, ignoring {cause:?}");
            return;
        };

        if cause == RemovalCause::Despawned {
            pool.release(entity);
        }
        self.motions.retain(|motion| motion.entity != entity);
        self.remaining_entities = self.remaining_entities.saturating_sub(1);
        debug!(
            "{entity} ({:?}, sequence {}) removed, {} remaining",
            battler.kind, battler.sequence, self.remaining_entities
        );
        out.push(Event::BattlerRemoved { entity, cause });

        self.complete_wave_if_done(pool, out);
    }

    /// Advances the clock, resumes due tasks, then moves battlers, including
    /// the ones spawned by this tick.
    pub fn tick(
        &mut self,
        dt: Duration,
        pool: &mut dyn EntityPool,
        out: &mut Vec<Event>,
    ) -> Result<(), WaveError> {
        self.now += dt;
        let resumed = self.resume_due_tasks(pool, out);
        self.advance_motions(dt.as_secs_f32(), pool, out);
        resumed
    }

    /// Consumes wave related commands.
    pub fn handle(&mut self, commands: &[Command], pool: &mut dyn EntityPool, out: &mut Vec<Event>) {
        for command in commands {
            let result = match command {
                Command::Tick { dt } => self.tick(*dt, pool, out),
                Command::StartWave => self.start_wave(pool, out),
                Command::StopWave => {
                    self.stop_wave(pool, out);
                    Ok(())
                }
                Command::SelectWave { index } => self.select_wave(*index, pool, out),
                Command::EntityDied { entity } => {
                    self.remove_entity(*entity, RemovalCause::Died, pool, out);
                    Ok(())
                }
                Command::EntityDespawned { entity } => {
                    self.remove_entity(*entity, RemovalCause::Despawned, pool, out);
                    Ok(())
                }
                Command::PlayerBuried => {
                    self.player_buried(pool, out);
                    Ok(())
                }
                Command::PlayerResurrected => {
                    self.player_resurrected();
                    Ok(())
                }
                _ => Ok(()),
            };

            if let Err(error) = result {
                warn!("wave command {command:?} failed: {error}");
            }
        }
    }

    fn begin_wave(&mut self, out: &mut Vec<Event>) -> Result<(), WaveError> {
        if self.initialized {
            return Err(WaveError::AlreadyRunning(self.current_wave));
        }

        let index = self.current_wave;
        let wave = self.waves.get(index).ok_or(WaveError::UnknownWave {
            index,
            count: self.waves.len(),
        })?;
        self.check_motion_references(wave)?;

        self.tasks.cancel_wave_starts();
        self.active.clear();
        self.motions.clear();
        self.remaining_entities = 0;
        self.remaining_sequences = wave.total_sequences();
        self.initialized = true;

        let cycle_delay: f32 = wave.sequences.iter().map(|sequence| sequence.delay_secs).sum();
        for cycle in 0..wave.repeat_count.get() {
            let cycle = cycle as f32;
            let offset = cycle * cycle_delay + cycle * wave.delay_between_cycles_secs;
            for (sequence_index, sequence) in wave.sequences.iter().enumerate() {
                let resume_at = self.now + secs(sequence.delay_secs + offset);
                self.tasks.schedule(
                    resume_at,
                    Task::Sequence {
                        wave: index,
                        sequence: sequence_index,
                        next_spawn: 0,
                    },
                );
            }
        }

        info!(
            "wave {index} `{}` started with {} sequences",
            wave.name, self.remaining_sequences
        );
        out.push(Event::WaveStarted { wave: index });
        Ok(())
    }

    fn check_motion_references(&self, wave: &WaveDefinition) -> Result<(), WaveError> {
        for sequence in &wave.sequences {
            let motion = &sequence.motion;
            if self.library.curve(motion.curve).is_none() {
                return Err(WaveError::UnknownCurve(motion.curve));
            }
            for space in [&motion.origin, &motion.destination] {
                if let MotionSpace::Path { path, .. } = space {
                    if self.library.path(*path).is_none() {
                        return Err(WaveError::UnknownPath(*path));
                    }
                }
            }
        }
        Ok(())
    }

    /// Resumes every due task, reporting the first failure once all ran.
    ///
    /// A pass stops as soon as the session ends; tasks of a restarted wave
    /// wait for the next pass.
    fn resume_due_tasks(
        &mut self,
        pool: &mut dyn EntityPool,
        out: &mut Vec<Event>,
    ) -> Result<(), WaveError> {
        let session = self.session;
        let mut first_error = None;
        while self.session == session {
            let Some((resume_at, task)) = self.tasks.pop_due(self.now) else {
                break;
            };
            let result = match task {
                Task::Sequence {
                    wave,
                    sequence,
                    next_spawn,
                } => self.resume_sequence(resume_at, wave, sequence, next_spawn, pool, out),
                Task::StartWave => self.begin_wave(out),
            };

            if let Err(error) = result {
                warn!("scheduled task failed: {error}");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn resume_sequence(
        &mut self,
        resume_at: Duration,
        wave: usize,
        sequence: usize,
        spawn_index: u32,
        pool: &mut dyn EntityPool,
        out: &mut Vec<Event>,
    ) -> Result<(), WaveError> {
        let spec = self
            .waves
            .get(wave)
            .and_then(|definition| definition.sequences.get(sequence))
            .cloned()
            .ok_or(WaveError::UnknownWave {
                index: wave,
                count: self.waves.len(),
            })?;

        let spawned = self.spawn_battler(&spec, sequence, spawn_index, pool, out);

        let next_spawn = spawn_index + 1;
        if next_spawn < spec.spawn_count.get() {
            self.tasks.schedule(
                resume_at + secs(spec.spawn_offset_secs),
                Task::Sequence {
                    wave,
                    sequence,
                    next_spawn,
                },
            );
        } else {
            self.remaining_sequences = self.remaining_sequences.saturating_sub(1);
            debug!(
                "sequence {sequence} of wave {wave} done, {} remaining",
                self.remaining_sequences
            );
            out.push(Event::SequenceCompleted { wave, sequence });
            self.complete_wave_if_done(pool, out);
        }

        spawned
    }

    fn spawn_battler(
        &mut self,
        spec: &SequenceSpec,
        sequence: usize,
        index: u32,
        pool: &mut dyn EntityPool,
        out: &mut Vec<Event>,
    ) -> Result<(), WaveError> {
        let count = spec.spawn_count.get();
        let origin = self.resolve_position(&spec.motion.origin, index, count)?;
        let destination = self.resolve_position(&spec.motion.destination, index, count)?;

        self.remaining_entities += 1;
        let entity = match pool.acquire(spec.battler, origin) {
            Ok(entity) => entity,
            Err(error) => {
                self.remaining_entities -= 1;
                return Err(error.into());
            }
        };
        pool.apply_settings(entity, &spec.settings);

        let _ = self.active.insert(
            entity,
            ActiveBattler {
                kind: spec.battler,
                sequence,
            },
        );
        self.motions.push(BattlerMotion::new(
            entity,
            origin,
            destination,
            spec.motion.curve,
            spec.motion.duration_secs,
            !self.boundary.is_in_boundary(destination),
        ));

        out.push(Event::BattlerSpawned {
            entity,
            kind: spec.battler,
            sequence,
            position: origin,
        });
        Ok(())
    }

    fn resolve_position(&self, space: &MotionSpace, index: u32, count: u32) -> Result<Vec3, WaveError> {
        let normalised = match space {
            MotionSpace::Point { point } => *point,
            MotionSpace::Path {
                path,
                origin,
                scale,
            } => {
                let evaluator = self.library.path(*path).ok_or(WaveError::UnknownPath(*path))?;
                let divisor = if evaluator.is_closed() { count } else { count - 1 };
                let progress = if divisor == 0 {
                    0.0
                } else {
                    index as f32 / divisor as f32
                };
                evaluator.evaluate_position(progress) * *scale + *origin
            }
        };
        Ok(self.boundary.remap_unclamped(normalised))
    }

    fn advance_motions(&mut self, dt: f32, pool: &mut dyn EntityPool, out: &mut Vec<Event>) {
        let library = &self.library;
        let mut arrivals = Vec::new();
        self.motions.retain_mut(|motion| match motion.step(dt, library, pool) {
            MotionStep::Moving => true,
            MotionStep::Aborted => false,
            MotionStep::Arrived => {
                if motion.despawn_at_destination {
                    arrivals.push(motion.entity);
                }
                false
            }
        });

        let session = self.session;
        for entity in arrivals {
            if self.session != session {
                break;
            }
            self.remove_entity(entity, RemovalCause::Despawned, pool, out);
        }
    }

    fn complete_wave_if_done(&mut self, pool: &mut dyn EntityPool, out: &mut Vec<Event>) {
        if !self.initialized || self.remaining_sequences > 0 || self.remaining_entities > 0 {
            return;
        }

        info!("wave {} completed", self.current_wave);
        out.push(Event::WaveCompleted {
            wave: self.current_wave,
        });
        self.stop_wave(pool, out);
    }

    fn end_session(&mut self) {
        self.tasks.clear();
        self.motions.clear();
        self.active.clear();
        self.remaining_sequences = 0;
        self.remaining_entities = 0;
        self.initialized = false;
        self.session = self.session.wrapping_add(1);
    }
}

fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}
