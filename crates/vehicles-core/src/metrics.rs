use crate::entity::{StaticObject, StaticShape, Vehicle};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VehicleState {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub color: String,
    pub brightness: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeKind {
    Point,
    Wall,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StaticObjectState {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub brightness: f64,
    pub shape: ShapeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
}

/// Lightweight per-tick view handed to broadcast listeners.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SimulationState {
    pub tick: u64,
    pub vehicles: Vec<VehicleState>,
    pub static_objects: Vec<StaticObjectState>,
}

impl From<&Vehicle> for VehicleState {
    fn from(v: &Vehicle) -> Self {
        Self {
            id: v.id,
            x: v.position[0],
            y: v.position[1],
            heading: v.heading,
            color: v.color.clone(),
            brightness: v.brightness,
        }
    }
}

impl From<&StaticObject> for StaticObjectState {
    fn from(s: &StaticObject) -> Self {
        let (shape, end) = match s.shape {
            StaticShape::Point { .. } => (ShapeKind::Point, None),
            StaticShape::Wall { end } => (ShapeKind::Wall, Some(end)),
        };
        Self {
            id: s.id,
            x: s.position[0],
            y: s.position[1],
            color: s.color.clone(),
            brightness: s.brightness,
            shape,
            x2: end.map(|e| e[0]),
            y2: end.map(|e| e[1]),
        }
    }
}

pub fn snapshot(tick: u64, vehicles: &[Vehicle], statics: &[StaticObject]) -> SimulationState {
    SimulationState {
        tick,
        vehicles: vehicles.iter().map(VehicleState::from).collect(),
        static_objects: statics.iter().map(StaticObjectState::from).collect(),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReceptorReading {
    pub id: String,
    pub accumulated_light: f64,
    pub will_fire_next_tick: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NeurodeReading {
    pub id: String,
    pub fired_previous_tick: bool,
    pub will_fire_next_tick: bool,
}

/// Full internal state of one vehicle, for debugging hosts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VehicleInspection {
    pub id: u32,
    pub species: String,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub left_motor: f64,
    pub right_motor: f64,
    pub receptors: Vec<ReceptorReading>,
    pub neurodes: Vec<NeurodeReading>,
}

impl From<&Vehicle> for VehicleInspection {
    fn from(v: &Vehicle) -> Self {
        let species = v.species();
        let receptors = species
            .receptors()
            .iter()
            .zip(v.receptors())
            .map(|(def, state)| ReceptorReading {
                id: def.id.clone(),
                accumulated_light: state.accumulated_light,
                will_fire_next_tick: state.will_fire_next_tick,
            })
            .collect();
        let network = v.network();
        let neurodes = network
            .template()
            .units()
            .iter()
            .zip(network.states())
            .map(|(unit, state)| NeurodeReading {
                id: unit.id.clone(),
                fired_previous_tick: state.fired_previous_tick,
                will_fire_next_tick: state.will_fire_next_tick,
            })
            .collect();
        Self {
            id: v.id,
            species: species.id().to_owned(),
            x: v.position[0],
            y: v.position[1],
            heading: v.heading,
            left_motor: v.left_motor,
            right_motor: v.right_motor,
            receptors,
            neurodes,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    /// Step within the experiment run (1-based).
    pub step: usize,
    /// World tick counter after the step.
    pub tick: u64,
    pub vehicle_count: usize,
    pub removed_count: usize,
    pub fault_count: usize,
    pub firing_receptors: usize,
    /// Vehicles with at least one non-zero motor.
    pub active_vehicles: usize,
    /// Mean commanded linear speed in world units per second.
    pub mean_speed: f64,
}

pub fn collect_step_metrics(
    step: usize,
    tick: u64,
    removed_count: usize,
    fault_count: usize,
    vehicles: &[Vehicle],
) -> StepMetrics {
    let firing_receptors = vehicles
        .iter()
        .flat_map(|v| v.receptors())
        .filter(|r| r.will_fire_next_tick)
        .count();
    let active_vehicles = vehicles
        .iter()
        .filter(|v| v.left_motor != 0.0 || v.right_motor != 0.0)
        .count();
    let mean_speed = if vehicles.is_empty() {
        0.0
    } else {
        vehicles
            .iter()
            .map(|v| ((v.left_motor + v.right_motor) / 2.0 * v.species().body().max_speed).abs())
            .sum::<f64>()
            / vehicles.len() as f64
    };
    StepMetrics {
        step,
        tick,
        vehicle_count: vehicles.len(),
        removed_count,
        fault_count,
        firing_receptors,
        active_vehicles,
        mean_speed,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotFrame {
    pub step: usize,
    pub state: SimulationState,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub final_vehicle_count: usize,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub total_removed: usize,
    #[serde(default)]
    pub total_faults: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<SnapshotFrame>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::presets;
    use std::sync::Arc;

    #[test]
    fn wall_state_carries_its_end_point() {
        let wall = StaticObject::wall(5, [1.0, 2.0], [3.0, 4.0], "grey", 0.2);
        let state = StaticObjectState::from(&wall);
        assert_eq!(state.shape, ShapeKind::Wall);
        assert_eq!((state.x2, state.y2), (Some(3.0), Some(4.0)));

        let point = StaticObject::point(6, [1.0, 2.0], 3.0, "white", 1.0);
        let json = serde_json::to_value(StaticObjectState::from(&point)).expect("serialize");
        assert_eq!(json["shape"], "POINT");
        assert!(json.get("x2").is_none());
    }

    #[test]
    fn inspection_lists_every_receptor_and_unit() {
        let species = Arc::new(presets::species("explorer").expect("preset"));
        let vehicle = species.spawn(3, [5.0, 6.0], 0.0, None);
        let view = VehicleInspection::from(&vehicle);
        assert_eq!(view.species, "explorer");
        assert_eq!(view.receptors.len(), 3);
        assert_eq!(view.neurodes.len(), 6);
        assert!(view.neurodes.iter().all(|n| !n.fired_previous_tick));
    }

    #[test]
    fn step_metrics_count_motion_and_firing() {
        let species = Arc::new(presets::species("phototrope").expect("preset"));
        let mut moving = species.spawn(1, [0.0, 0.0], 0.0, None);
        moving.left_motor = 1.0;
        moving.right_motor = 1.0;
        let idle = species.spawn(2, [0.0, 0.0], 0.0, None);
        let metrics = collect_step_metrics(4, 9, 1, 0, &[moving, idle]);
        assert_eq!(metrics.vehicle_count, 2);
        assert_eq!(metrics.active_vehicles, 1);
        assert_eq!(metrics.firing_receptors, 0);
        assert!((metrics.mean_speed - 25.0).abs() < 1e-12);
        assert_eq!(metrics.removed_count, 1);
    }

    #[test]
    fn empty_world_has_zero_mean_speed() {
        let metrics = collect_step_metrics(1, 1, 0, 0, &[]);
        assert_eq!(metrics.mean_speed, 0.0);
    }
}
