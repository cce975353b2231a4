//! Angle and distance helpers shared by sensing and physics.
//!
//! Headings live in `[0, 2π)`; bearings relative to a heading live in `[-π, π]`.

use std::f64::consts::{PI, TAU};

/// Reduce an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let reduced = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU.
    if reduced >= TAU {
        0.0
    } else {
        reduced
    }
}

/// Bring an angle into `[-π, π]`. Angles already inside are returned
/// unchanged, so a window edge of exactly -π keeps its sign.
pub fn normalize_signed(angle: f64) -> f64 {
    if (-PI..=PI).contains(&angle) {
        return angle;
    }
    let reduced = normalize_angle(angle);
    if reduced > PI {
        reduced - TAU
    } else {
        reduced
    }
}

/// Whether `angle` lies inside the window running from `from` to `to`.
///
/// All three are reduced with [`normalize_signed`] first. When `from > to` the
/// window wraps through ±π, so a rear sensor spanning 135° to -135° covers the
/// back of the vehicle rather than its front. Both ends are inclusive.
pub fn angle_in_range(angle: f64, from: f64, to: f64) -> bool {
    let angle = normalize_signed(angle);
    let from = normalize_signed(from);
    let to = normalize_signed(to);
    if from <= to {
        angle >= from && angle <= to
    } else {
        angle >= from || angle <= to
    }
}

/// Distance from `point` to the closed segment `a`–`b`.
pub fn point_to_segment_distance(point: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance(point, a);
    }
    let t = (((point[0] - a[0]) * dx + (point[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    distance(point, [a[0] + t * dx, a[1] + t * dy])
}

pub fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub fn radians_to_degrees(radians: f64) -> f64 {
    radians.to_degrees()
}

/// Bearing of `target` as seen from `origin` facing `heading`, in `[-π, π]`.
pub fn relative_bearing(origin: [f64; 2], heading: f64, target: [f64; 2]) -> f64 {
    let absolute = (target[1] - origin[1]).atan2(target[0] - origin[0]);
    normalize_signed(absolute - heading)
}
