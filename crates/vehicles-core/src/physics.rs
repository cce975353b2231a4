//! Differential-drive kinematics, arena boundaries and collision tests.

use crate::config::ArenaConfig;
use crate::entity::{StaticObject, StaticShape};
use crate::geometry::{distance, normalize_angle, point_to_segment_distance};
use crate::species::BodyParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollisionMode {
    /// Object collisions are not detected at all.
    None,
    /// The vehicle is removed at the end of the tick.
    Break,
    /// The vehicle turns around and swaps its motors.
    #[default]
    Bounce,
}

/// Default collision mode plus per-color overrides, keyed by the moving
/// vehicle's color.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollisionBehavior {
    pub default_mode: CollisionMode,
    pub color_overrides: BTreeMap<String, CollisionMode>,
}

impl CollisionBehavior {
    pub fn new(default_mode: CollisionMode) -> Self {
        Self {
            default_mode,
            color_overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, color: impl Into<String>, mode: CollisionMode) -> Self {
        self.color_overrides.insert(color.into(), mode);
        self
    }

    pub fn resolve(&self, color: &str) -> CollisionMode {
        self.color_overrides
            .get(color)
            .copied()
            .unwrap_or(self.default_mode)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: [f64; 2],
    pub heading: f64,
}

impl Pose {
    pub fn is_finite(&self) -> bool {
        self.position[0].is_finite() && self.position[1].is_finite() && self.heading.is_finite()
    }
}

/// Linear and angular velocity for a pair of motor commands.
pub fn velocities(left: f64, right: f64, body: &BodyParams) -> (f64, f64) {
    let v_left = left * body.max_speed;
    let v_right = right * body.max_speed;
    ((v_left + v_right) / 2.0, (v_right - v_left) / body.wheel_base)
}

/// Advance a pose by one step of differential-drive motion. The position is
/// moved along the already-updated heading.
pub fn integrate(pose: Pose, left: f64, right: f64, body: &BodyParams, dt: f64) -> Pose {
    let (linear, angular) = velocities(left, right, body);
    let heading = normalize_angle(pose.heading + angular * dt);
    Pose {
        position: [
            pose.position[0] + linear * heading.cos() * dt,
            pose.position[1] + linear * heading.sin() * dt,
        ],
        heading,
    }
}

/// Reduce `value` into `[0, extent)` by whole arena lengths.
///
/// Repeatedly adding or subtracting `extent` and a single `rem_euclid` give
/// the same result; values more than one extent out take the `rem_euclid`
/// path so the step count stays bounded.
pub fn wrap_axis(value: f64, extent: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let mut v = value;
    if v < -extent || v >= 2.0 * extent {
        v = v.rem_euclid(extent);
    }
    while v < 0.0 {
        v += extent;
    }
    while v >= extent {
        v -= extent;
    }
    v
}

/// Wrap the axes the arena wraps; other axes are left untouched.
pub fn apply_wrap(position: [f64; 2], arena: &ArenaConfig) -> [f64; 2] {
    let mut out = position;
    if arena.wrap_east_west {
        out[0] = wrap_axis(out[0], arena.width);
    }
    if arena.wrap_north_south {
        out[1] = wrap_axis(out[1], arena.height);
    }
    out
}

/// Whether a position has left the arena across a non-wrapping edge.
pub fn crosses_boundary(position: [f64; 2], arena: &ArenaConfig) -> bool {
    let outside_x = !(0.0..arena.width).contains(&position[0]);
    let outside_y = !(0.0..arena.height).contains(&position[1]);
    (!arena.wrap_east_west && outside_x) || (!arena.wrap_north_south && outside_y)
}

pub fn hits_static(position: [f64; 2], radius: f64, object: &StaticObject) -> bool {
    match object.shape {
        StaticShape::Point { radius: object_radius } => {
            distance(position, object.position) < radius + object_radius
        }
        StaticShape::Wall { end } => point_to_segment_distance(position, object.position, end) < radius,
    }
}

pub fn hits_vehicle(a: [f64; 2], radius_a: f64, b: [f64; 2], radius_b: f64) -> bool {
    distance(a, b) < radius_a + radius_b
}

/// Turn around and swap the motors with inverted sign: `(heading, left, right)`.
pub fn bounce(heading: f64, left: f64, right: f64) -> (f64, f64, f64) {
    (normalize_angle(heading + PI), -right, -left)
}
