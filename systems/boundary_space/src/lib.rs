#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Remaps normalised design-space coordinates into world-space boundaries.
//!
//! Designers author spawn points and paths in a normalised cube spanning
//! `[-1, 1]` on every axis. A [`BoundarySpace`] translates those coordinates
//! into the active world range, and the [`PerspectiveDirector`] switches
//! between named boundary configurations at runtime.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};
use simulacra_core::{Event, PerspectiveId, Vec3};

const DEFAULT_UNCLAMPED_PADDING: f32 = 0.25;

/// Inclusive world-space range covered by a single axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    /// Lower bound reached by normalised `-1`.
    pub min: f32,
    /// Upper bound reached by normalised `1`.
    pub max: f32,
}

impl AxisRange {
    /// Creates a new axis range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Midpoint of the range, reached by normalised `0`.
    #[must_use]
    pub fn midpoint(&self) -> f32 {
        lerp_unclamped(self.min, self.max, 0.5)
    }

    /// Reports whether `value` lies inside the inclusive range.
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    fn clamp(&self, value: f32) -> f32 {
        // Inverted ranges must not panic, unlike `f32::clamp`.
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    fn remap(&self, normalised: f32) -> f32 {
        lerp_unclamped(self.min, self.max, inverse_lerp(-1.0, 1.0, normalised))
    }

    fn remap_unclamped(&self, normalised: f32, padding: f32) -> f32 {
        let overshoot = if normalised.abs() > 1.0 {
            normalised.signum() * padding
        } else {
            0.0
        };
        lerp_unclamped(
            self.min,
            self.max,
            inverse_lerp(-1.0, 1.0, normalised) + overshoot,
        )
    }
}

impl Default for AxisRange {
    fn default() -> Self {
        Self::new(-1.0, 1.0)
    }
}

/// Per-axis world-space ranges plus the padding applied past the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundarySpace {
    /// Range covered by the x axis.
    pub x: AxisRange,
    /// Range covered by the y axis.
    pub y: AxisRange,
    /// Range covered by the z axis.
    pub z: AxisRange,
    /// Interpolation offset added to coordinates beyond `[-1, 1]`.
    pub unclamped_padding: f32,
}

impl Default for BoundarySpace {
    fn default() -> Self {
        Self {
            x: AxisRange::default(),
            y: AxisRange::default(),
            z: AxisRange::default(),
            unclamped_padding: DEFAULT_UNCLAMPED_PADDING,
        }
    }
}

impl BoundarySpace {
    /// Creates a boundary space with the default padding.
    #[must_use]
    pub fn new(x: AxisRange, y: AxisRange, z: AxisRange) -> Self {
        Self {
            x,
            y,
            z,
            unclamped_padding: DEFAULT_UNCLAMPED_PADDING,
        }
    }

    /// Overrides the padding applied past the visible boundary.
    #[must_use]
    pub fn with_padding(mut self, unclamped_padding: f32) -> Self {
        self.unclamped_padding = unclamped_padding;
        self
    }

    /// Remaps a normalised point, saturating coordinates outside `[-1, 1]`.
    #[must_use]
    pub fn remap(&self, normalised: Vec3) -> Vec3 {
        Vec3::new(
            self.x.remap(normalised.x),
            self.y.remap(normalised.y),
            self.z.remap(normalised.z),
        )
    }

    /// Remaps a normalised point, pushing coordinates beyond `[-1, 1]` past
    /// the boundary by the configured padding.
    ///
    /// The inverse interpolation saturates at the unit interval, so every
    /// coordinate with `|v| > 1` lands at exactly `padding` past its bound
    /// regardless of how far outside the design cube it was authored.
    #[must_use]
    pub fn remap_unclamped(&self, normalised: Vec3) -> Vec3 {
        let padding = self.unclamped_padding;
        Vec3::new(
            self.x.remap_unclamped(normalised.x, padding),
            self.y.remap_unclamped(normalised.y, padding),
            self.z.remap_unclamped(normalised.z, padding),
        )
    }

    /// Clamps a world-space point into the boundary.
    #[must_use]
    pub fn clamp(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            self.x.clamp(point.x),
            self.y.clamp(point.y),
            self.z.clamp(point.z),
        )
    }

    /// Reports whether a world-space point lies inside every axis range.
    #[must_use]
    pub fn is_in_boundary(&self, point: Vec3) -> bool {
        self.x.contains(point.x) && self.y.contains(point.y) && self.z.contains(point.z)
    }
}

/// Owns the named boundary configurations and tracks the active one.
#[derive(Clone, Debug, Default)]
pub struct PerspectiveDirector {
    perspectives: BTreeMap<PerspectiveId, BoundarySpace>,
    active: Option<PerspectiveId>,
}

impl PerspectiveDirector {
    /// Creates a director without any perspective.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a perspective, replacing any previous space with the same id.
    pub fn register(&mut self, perspective: PerspectiveId, space: BoundarySpace) {
        if self.perspectives.insert(perspective, space).is_some() {
            warn!("perspective {perspective:?} registered twice, keeping the latest space");
        }
    }

    /// Identifier of the active perspective, if any.
    #[must_use]
    pub fn active(&self) -> Option<PerspectiveId> {
        self.active
    }

    /// Boundary space of the active perspective, or the default space.
    #[must_use]
    pub fn active_space(&self) -> BoundarySpace {
        self.active
            .and_then(|id| self.perspectives.get(&id).copied())
            .unwrap_or_default()
    }

    /// Looks up the boundary space registered for `perspective`.
    #[must_use]
    pub fn space(&self, perspective: PerspectiveId) -> Option<&BoundarySpace> {
        self.perspectives.get(&perspective)
    }

    /// Switches to `perspective`, emitting [`Event::PerspectiveChanged`].
    ///
    /// Returns `true` when the active perspective changed. Requests for the
    /// already active perspective or for an unknown one are ignored.
    pub fn set_perspective(&mut self, perspective: PerspectiveId, out: &mut Vec<Event>) -> bool {
        if self.active == Some(perspective) {
            return false;
        }

        if !self.perspectives.contains_key(&perspective) {
            warn!("ignoring switch to unknown perspective {perspective:?}");
            return false;
        }

        out.push(Event::PerspectiveChanged {
            from: self.active,
            to: perspective,
        });
        self.active = Some(perspective);
        true
    }
}

/// Interpolates between `a` and `b` without clamping `t`.
#[must_use]
pub fn lerp_unclamped(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Position of `value` between `a` and `b`, saturated to `[0, 1]`.
///
/// A degenerate range maps every value to `0`.
#[must_use]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}
