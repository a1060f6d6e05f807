//! Easing curves, paths, and the per-battler motion tasks that use them.

use std::collections::BTreeMap;

use log::warn;
use simulacra_core::{CurveId, EasingCurve, EntityHandle, EntityPool, PathEvaluator, PathId, Vec3};

use crate::WaveError;

/// Constant speed interpolation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinearCurve;

impl EasingCurve for LinearCurve {
    fn evaluate(&self, t: f32) -> f32 {
        t.clamp(0.0, 1.0)
    }
}

/// Hermite ease with flat tangents at both ends (`3t² - 2t³`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EaseInOutCurve;

impl EasingCurve for EaseInOutCurve {
    fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }
}

/// Piecewise linear path evaluated by arc length.
#[derive(Clone, Debug, PartialEq)]
pub struct PolylinePath {
    points: Vec<Vec3>,
    closed: bool,
    length: f32,
}

impl PolylinePath {
    /// Builds a path through `points`, looping back to the first point when
    /// `closed` is set.
    pub fn new(points: Vec<Vec3>, closed: bool) -> Result<Self, WaveError> {
        if points.is_empty() {
            return Err(WaveError::EmptyPath);
        }

        let mut path = Self {
            points,
            closed,
            length: 0.0,
        };
        path.length = path.segments().map(|(a, b)| a.distance(b)).sum();
        Ok(path)
    }

    /// Total arc length of the path.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    fn segments(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        let closing = if self.closed && self.points.len() > 1 {
            self.points.last().copied().zip(self.points.first().copied())
        } else {
            None
        };
        self.points
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .chain(closing)
    }
}

impl PathEvaluator for PolylinePath {
    fn evaluate_position(&self, t: f32) -> Vec3 {
        let start = self.points[0];
        if self.length <= f32::EPSILON {
            return start;
        }

        let t = if self.closed {
            t.rem_euclid(1.0)
        } else {
            t.clamp(0.0, 1.0)
        };
        let mut travelled = 0.0;
        let target = t * self.length;
        let mut last = start;
        for (a, b) in self.segments() {
            let segment = a.distance(b);
            if travelled + segment >= target {
                if segment <= f32::EPSILON {
                    return a;
                }
                return a.lerp(b, (target - travelled) / segment);
            }
            travelled += segment;
            last = b;
        }
        last
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Curves and paths referenced by wave definitions.
#[derive(Debug)]
pub struct MotionLibrary {
    curves: BTreeMap<CurveId, Box<dyn EasingCurve>>,
    paths: BTreeMap<PathId, Box<dyn PathEvaluator>>,
}

impl Default for MotionLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionLibrary {
    /// Creates a library holding the built-in curves.
    #[must_use]
    pub fn new() -> Self {
        let mut library = Self {
            curves: BTreeMap::new(),
            paths: BTreeMap::new(),
        };
        library.register_curve(CurveId::LINEAR, LinearCurve);
        library.register_curve(CurveId::EASE_IN_OUT, EaseInOutCurve);
        library
    }

    /// Registers `curve` under `id`, replacing any previous curve.
    pub fn register_curve(&mut self, id: CurveId, curve: impl EasingCurve + 'static) {
        if self.curves.insert(id, Box::new(curve)).is_some() {
            warn!("curve {id:?} registered twice, keeping the latest one");
        }
    }

    /// Registers `path` under `id`, replacing any previous path.
    pub fn register_path(&mut self, id: PathId, path: impl PathEvaluator + 'static) {
        if self.paths.insert(id, Box::new(path)).is_some() {
            warn!("path {id:?} registered twice, keeping the latest one");
        }
    }

    /// Looks up a curve.
    #[must_use]
    pub fn curve(&self, id: CurveId) -> Option<&dyn EasingCurve> {
        self.curves.get(&id).map(Box::as_ref)
    }

    /// Looks up a path.
    #[must_use]
    pub fn path(&self, id: PathId) -> Option<&dyn PathEvaluator> {
        self.paths.get(&id).map(Box::as_ref)
    }
}

/// Progress of a single battler travelling from its spawn point.
#[derive(Clone, Debug)]
pub(crate) struct BattlerMotion {
    pub(crate) entity: EntityHandle,
    origin: Vec3,
    destination: Vec3,
    curve: CurveId,
    duration_secs: f32,
    progress: f32,
    pub(crate) despawn_at_destination: bool,
}

/// What a motion did during one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MotionStep {
    Moving,
    Arrived,
    Aborted,
}

impl BattlerMotion {
    pub(crate) fn new(
        entity: EntityHandle,
        origin: Vec3,
        destination: Vec3,
        curve: CurveId,
        duration_secs: f32,
        despawn_at_destination: bool,
    ) -> Self {
        Self {
            entity,
            origin,
            destination,
            curve,
            duration_secs,
            progress: 0.0,
            despawn_at_destination,
        }
    }

    pub(crate) fn step(
        &mut self,
        dt: f32,
        library: &MotionLibrary,
        pool: &mut dyn EntityPool,
    ) -> MotionStep {
        if pool.is_dead(self.entity) {
            return MotionStep::Aborted;
        }

        if self.duration_secs > 0.0 {
            self.progress += dt / self.duration_secs;
        } else {
            self.progress = 1.0;
        }

        if self.progress >= 1.0 {
            pool.set_position(self.entity, self.destination);
            return MotionStep::Arrived;
        }

        let curve = library.curve(self.curve).unwrap_or(&LinearCurve);
        let position = self
            .origin
            .lerp(self.destination, curve.evaluate(self.progress));
        pool.set_position(self.entity, position);
        MotionStep::Moving
    }
}
