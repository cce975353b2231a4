//! Capacitor-style light receptors.
//!
//! A receptor integrates the light of matching-color entities inside its
//! angular window and fires when the stored charge reaches its threshold. A
//! firing removes exactly `threshold` from the charge, so any excess carries
//! over and a sustained bright stimulus can fire it on consecutive ticks.

use crate::geometry::{angle_in_range, distance, relative_bearing};
use serde::{Deserialize, Serialize};

/// Immutable receptor configuration shared by every vehicle of a species.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReceptorDef {
    pub id: String,
    /// Window start relative to the vehicle heading (radians).
    pub angle_from: f64,
    /// Window end relative to the vehicle heading (radians).
    pub angle_to: f64,
    pub max_range: f64,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// Only entities with exactly this color name contribute.
    pub color_filter: String,
    pub threshold: f64,
}

fn default_sensitivity() -> f64 {
    1.0
}

/// Something a receptor can see: a colored, bright position.
#[derive(Clone, Copy, Debug)]
pub struct Luminous<'a> {
    pub position: [f64; 2],
    pub color: &'a str,
    pub brightness: f64,
}

impl ReceptorDef {
    pub fn new(
        id: impl Into<String>,
        angle_from: f64,
        angle_to: f64,
        max_range: f64,
        color_filter: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self {
            id: id.into(),
            angle_from,
            angle_to,
            max_range,
            sensitivity: default_sensitivity(),
            color_filter: color_filter.into(),
            threshold,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Light this receptor gathers from `target` in one tick when mounted on
    /// a vehicle at `origin` facing `heading`; `None` when the target is
    /// filtered out, outside the window, co-located, or out of range.
    pub fn contribution(&self, origin: [f64; 2], heading: f64, target: &Luminous<'_>) -> Option<f64> {
        if target.color != self.color_filter {
            return None;
        }
        let bearing = relative_bearing(origin, heading, target.position);
        if !angle_in_range(bearing, self.angle_from, self.angle_to) {
            return None;
        }
        let d = distance(origin, target.position);
        if d <= 0.0 || d >= self.max_range {
            return None;
        }
        Some(target.brightness * (1.0 - d / self.max_range) * self.sensitivity)
    }
}

/// Per-vehicle receptor charge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReceptorState {
    pub accumulated_light: f64,
    pub will_fire_next_tick: bool,
}

impl ReceptorState {
    pub fn accumulate(&mut self, amount: f64) {
        self.accumulated_light += amount;
    }

    /// Decide whether to fire this tick, discharging by `threshold` if so.
    pub fn check_threshold(&mut self, threshold: f64) -> bool {
        if self.accumulated_light >= threshold {
            self.will_fire_next_tick = true;
            self.accumulated_light -= threshold;
        } else {
            self.will_fire_next_tick = false;
        }
        self.will_fire_next_tick
    }

    /// Run one full sensing pass over `visible` and return the firing decision.
    pub fn sense<'a>(
        &mut self,
        def: &ReceptorDef,
        origin: [f64; 2],
        heading: f64,
        visible: impl IntoIterator<Item = Luminous<'a>>,
    ) -> bool {
        for target in visible {
            if let Some(light) = def.contribution(origin, heading, &target) {
                self.accumulate(light);
            }
        }
        self.check_threshold(def.threshold)
    }
}
