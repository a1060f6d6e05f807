//! Headless loop owning every service and routing commands between them.

use std::{collections::VecDeque, fmt, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use simulacra_core::{Command, Event};
use simulacra_system_augments::{AugmentRegistry, ShardMeter};
use simulacra_system_boundary_space::PerspectiveDirector;
use simulacra_system_tier_catalog::TierCatalog;
use simulacra_system_wave_scheduler::{
    EaseInOutCurve, LinearCurve, MotionLibrary, PolylinePath, WaveScheduler,
};

use crate::{
    config::{CurveKind, Scenario, Trigger},
    pool::HeadlessPool,
};

#[derive(Debug)]
struct ScheduledCommand {
    at: Duration,
    command: Command,
}

/// Every service of a headless run.
#[derive(Debug)]
pub(crate) struct Simulation {
    registry: AugmentRegistry,
    scheduler: WaveScheduler,
    director: PerspectiveDirector,
    shards: ShardMeter,
    pool: HeadlessPool,
    rng: ChaCha8Rng,
    script: VecDeque<ScheduledCommand>,
    now: Duration,
    seed: u64,
}

impl Simulation {
    pub(crate) fn new(scenario: Scenario, seed: u64) -> Result<Self> {
        let catalog = TierCatalog::new(scenario.tiers).context("invalid tier catalog")?;
        let bindings = scenario
            .behaviours
            .into_iter()
            .map(|binding| binding.into_binding())
            .collect();
        let registry = AugmentRegistry::new(catalog, scenario.augments, bindings)
            .context("invalid augment definitions")?;

        let mut library = MotionLibrary::new();
        for curve in scenario.curves {
            match curve.kind {
                CurveKind::Linear => library.register_curve(curve.id, LinearCurve),
                CurveKind::EaseInOut => library.register_curve(curve.id, EaseInOutCurve),
            }
        }
        for path in scenario.paths {
            let polyline = PolylinePath::new(path.points, path.closed)
                .with_context(|| format!("invalid path {:?}", path.id))?;
            library.register_path(path.id, polyline);
        }
        let scheduler = WaveScheduler::new(scenario.waves, library, scenario.scheduler)
            .context("invalid wave definitions")?;

        let mut director = PerspectiveDirector::new();
        for perspective in scenario.perspectives {
            director.register(perspective.id, perspective.space);
        }

        let shards = ShardMeter::new(scenario.shard_threshold).context("invalid shard threshold")?;
        let script = build_script(scenario.initial_perspective, scenario.triggers)?;

        Ok(Self {
            registry,
            scheduler,
            director,
            shards,
            pool: HeadlessPool::new(&scenario.pool),
            rng: ChaCha8Rng::seed_from_u64(seed),
            script,
            now: Duration::ZERO,
            seed,
        })
    }

    /// Steps the simulation until `duration` elapsed, tallying every event.
    pub(crate) fn run(&mut self, duration: Duration, dt: Duration) -> Report {
        let mut report = Report::new(self.seed);
        let mut events = Vec::new();
        while self.now < duration {
            self.step(dt, &mut events);
            for event in events.drain(..) {
                debug!("{event:?}");
                report.record(&event);
            }
        }

        report.simulated = self.now;
        report.current_wave = self.scheduler.current_wave();
        report.battlers_in_pool = self.pool.in_use();
        report.armed_battlers = self.pool.armed();
        report.active_augments = self
            .registry
            .runtimes()
            .filter_map(|runtime| {
                runtime.active_tier().map(|tier| {
                    let tier_name = self
                        .registry
                        .catalog()
                        .get(tier)
                        .map_or("?", |definition| definition.name.as_str());
                    format!("{} ({tier_name})", runtime.definition().name)
                })
            })
            .collect();
        report
    }

    /// Fires due script entries, forwards pool signals, then ticks every
    /// service by `dt`.
    pub(crate) fn step(&mut self, dt: Duration, out: &mut Vec<Event>) {
        while self
            .script
            .front()
            .is_some_and(|entry| entry.at <= self.now)
        {
            if let Some(entry) = self.script.pop_front() {
                info!("scripted {:?} at {:.2}s", entry.command, self.now.as_secs_f32());
                self.apply(entry.command, out);
            }
        }

        for signal in self.pool.step(dt.as_secs_f32()) {
            self.apply(signal, out);
        }

        self.apply(Command::Tick { dt }, out);
        self.now += dt;
    }

    /// Routes a command to the services consuming it.
    pub(crate) fn apply(&mut self, command: Command, out: &mut Vec<Event>) {
        match command {
            Command::Tick { .. } => {
                let commands = [command];
                self.registry.handle(&commands, &mut self.rng, out);
                self.scheduler.handle(&commands, &mut self.pool, out);
            }
            Command::ActivateAugment { .. }
            | Command::ActivateRandomAugment
            | Command::OpenCrystal { .. }
            | Command::DeactivateAugment { .. } => {
                self.registry.handle(&[command], &mut self.rng, out);
            }
            Command::AbsorbShards { value } => {
                let level_ups = self.shards.absorb(value, out);
                for _ in 0..level_ups {
                    self.registry
                        .handle(&[Command::ActivateRandomAugment], &mut self.rng, out);
                }
            }
            Command::SetPerspective { perspective } => {
                if self.director.set_perspective(perspective, out) {
                    self.scheduler
                        .set_boundary_space(self.director.active_space());
                }
            }
            Command::StartWave
            | Command::StopWave
            | Command::SelectWave { .. }
            | Command::EntityDied { .. }
            | Command::EntityDespawned { .. }
            | Command::PlayerBuried
            | Command::PlayerResurrected => {
                self.scheduler.handle(&[command], &mut self.pool, out);
            }
        }
    }
}

fn build_script(
    initial_perspective: Option<simulacra_core::PerspectiveId>,
    triggers: Vec<Trigger>,
) -> Result<VecDeque<ScheduledCommand>> {
    let mut script = Vec::with_capacity(triggers.len() + 1);
    if let Some(perspective) = initial_perspective {
        script.push(ScheduledCommand {
            at: Duration::ZERO,
            command: Command::SetPerspective { perspective },
        });
    }

    for trigger in triggers {
        let at = Duration::try_from_secs_f32(trigger.at_secs)
            .with_context(|| format!("invalid trigger time {}s", trigger.at_secs))?;
        script.push(ScheduledCommand {
            at,
            command: trigger.command.into(),
        });
    }

    // Stable, so simultaneous triggers keep their file order.
    script.sort_by_key(|entry| entry.at);
    Ok(script.into())
}

/// Summary of a headless run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Report {
    seed: u64,
    simulated: Duration,
    waves_started: usize,
    waves_completed: usize,
    all_waves_completed: usize,
    battlers_spawned: usize,
    battlers_removed: usize,
    pickups: usize,
    shard_level_ups: usize,
    perspective_switches: usize,
    game_overs: usize,
    current_wave: usize,
    battlers_in_pool: usize,
    armed_battlers: usize,
    active_augments: Vec<String>,
}

impl Report {
    fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    fn record(&mut self, event: &Event) {
        match event {
            Event::WaveStarted { .. } => self.waves_started += 1,
            Event::WaveCompleted { .. } => self.waves_completed += 1,
            Event::AllWavesCompleted => self.all_waves_completed += 1,
            Event::BattlerSpawned { .. } => self.battlers_spawned += 1,
            Event::BattlerRemoved { .. } => self.battlers_removed += 1,
            Event::TierAnnounced { .. } => self.pickups += 1,
            Event::ShardLevelUp => self.shard_level_ups += 1,
            Event::PerspectiveChanged { .. } => self.perspective_switches += 1,
            Event::GameOver => self.game_overs += 1,
            _ => {}
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "simulated {:.2}s with seed {}",
            self.simulated.as_secs_f32(),
            self.seed
        )?;
        writeln!(
            f,
            "waves: {} started, {} completed, {} full runs, now at wave {}",
            self.waves_started, self.waves_completed, self.all_waves_completed, self.current_wave
        )?;
        writeln!(
            f,
            "battlers: {} spawned, {} removed, {} in pool ({} armed)",
            self.battlers_spawned, self.battlers_removed, self.battlers_in_pool, self.armed_battlers
        )?;
        writeln!(
            f,
            "augments: {} pickups, {} shard level-ups, active: [{}]",
            self.pickups,
            self.shard_level_ups,
            self.active_augments.join(", ")
        )?;
        write!(
            f,
            "perspective switches: {}, game overs: {}",
            self.perspective_switches, self.game_overs
        )
    }
}
