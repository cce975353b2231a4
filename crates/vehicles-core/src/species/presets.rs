//! The six classic Braitenberg species.
//!
//! Input units are named after the receptor that drives them, so each sensor
//! feeds its unit directly. Every motor has threshold 1.

use super::{BodyParams, Species, SpeciesDefinition, SpeciesError};
use crate::constants::DEFAULT_VEHICLE_BRIGHTNESS;
use crate::geometry::degrees_to_radians;
use crate::network::{ConnectionDef, NeurodeDef};
use crate::receptor::ReceptorDef;

pub const PRESET_NAMES: [&str; 6] = [
    "phototrope",
    "photophobe",
    "explorer",
    "aggressive",
    "coward",
    "paranoid",
];

const LEFT_MOTOR: &str = "output_left_motor";
const RIGHT_MOTOR: &str = "output_right_motor";
const LIGHT: &str = "white";

pub fn definition(name: &str) -> Result<SpeciesDefinition, SpeciesError> {
    match name {
        "phototrope" => Ok(phototrope()),
        "photophobe" => Ok(photophobe()),
        "explorer" => Ok(explorer()),
        "aggressive" => Ok(aggressive()),
        "coward" => Ok(coward()),
        "paranoid" => Ok(paranoid()),
        other => Err(SpeciesError::UnknownPreset(other.to_owned())),
    }
}

pub fn species(name: &str) -> Result<Species, SpeciesError> {
    Species::from_definition(definition(name)?)
}

pub fn all_definitions() -> Vec<SpeciesDefinition> {
    vec![
        phototrope(),
        photophobe(),
        explorer(),
        aggressive(),
        coward(),
        paranoid(),
    ]
}

fn body(max_speed: f64) -> BodyParams {
    BodyParams {
        radius: 10.0,
        wheel_base: 15.0,
        max_speed,
        brightness: DEFAULT_VEHICLE_BRIGHTNESS,
    }
}

fn eye(id: &str, from_deg: f64, to_deg: f64, max_range: f64, threshold: f64) -> ReceptorDef {
    ReceptorDef::new(
        id,
        degrees_to_radians(from_deg),
        degrees_to_radians(to_deg),
        max_range,
        LIGHT,
        threshold,
    )
}

fn motors() -> [NeurodeDef; 2] {
    [
        NeurodeDef::output(LEFT_MOTOR, 1),
        NeurodeDef::output(RIGHT_MOTOR, 1),
    ]
}

/// Units for a receptor set: one input per receptor, then the motors.
fn units(receptors: &[ReceptorDef], with_bias: bool) -> Vec<NeurodeDef> {
    let mut units = Vec::with_capacity(receptors.len() + 3);
    if with_bias {
        units.push(NeurodeDef::input("bias"));
    }
    units.extend(receptors.iter().map(|r| NeurodeDef::input(r.id.as_str())));
    units.extend(motors());
    units
}

fn bias_drive() -> Vec<ConnectionDef> {
    vec![
        ConnectionDef::exciter("c1", "bias", LEFT_MOTOR),
        ConnectionDef::exciter("c2", "bias", RIGHT_MOTOR),
    ]
}

fn definition_for(
    id: &str,
    name: &str,
    color: &str,
    max_speed: f64,
    receptors: Vec<ReceptorDef>,
    with_bias: bool,
    connections: Vec<ConnectionDef>,
) -> SpeciesDefinition {
    SpeciesDefinition {
        id: id.to_owned(),
        name: name.to_owned(),
        color: color.to_owned(),
        body: body(max_speed),
        neurodes: units(&receptors, with_bias),
        receptors,
        connections,
    }
}

/// Crossed excitation: turns toward light.
fn phototrope() -> SpeciesDefinition {
    definition_for(
        "phototrope",
        "Phototrope",
        "blue",
        50.0,
        vec![
            eye("sensor_left", 45.0, 135.0, 200.0, 10.0),
            eye("sensor_right", -135.0, -45.0, 200.0, 10.0),
        ],
        false,
        vec![
            ConnectionDef::exciter("c1", "sensor_left", RIGHT_MOTOR),
            ConnectionDef::exciter("c2", "sensor_right", LEFT_MOTOR),
        ],
    )
}

/// Parallel excitation: turns away from light.
fn photophobe() -> SpeciesDefinition {
    definition_for(
        "photophobe",
        "Photophobe",
        "red",
        50.0,
        vec![
            eye("sensor_left", 45.0, 135.0, 200.0, 10.0),
            eye("sensor_right", -135.0, -45.0, 200.0, 10.0),
        ],
        false,
        vec![
            ConnectionDef::exciter("c1", "sensor_left", LEFT_MOTOR),
            ConnectionDef::exciter("c2", "sensor_right", RIGHT_MOTOR),
        ],
    )
}

/// Cruises on bias; any sensor hit stalls the motor on its side.
fn explorer() -> SpeciesDefinition {
    let mut connections = bias_drive();
    connections.extend([
        ConnectionDef::inhibitor("c3", "sensor_front", LEFT_MOTOR),
        ConnectionDef::inhibitor("c4", "sensor_front", RIGHT_MOTOR),
        ConnectionDef::inhibitor("c5", "sensor_left", LEFT_MOTOR),
        ConnectionDef::inhibitor("c6", "sensor_right", RIGHT_MOTOR),
    ]);
    definition_for(
        "explorer",
        "Explorer",
        "green",
        40.0,
        vec![
            eye("sensor_front", -30.0, 30.0, 100.0, 8.0),
            eye("sensor_left", 30.0, 90.0, 100.0, 8.0),
            eye("sensor_right", -90.0, -30.0, 100.0, 8.0),
        ],
        true,
        connections,
    )
}

/// Cruises on bias; crossed inhibition swings it toward what it sees.
fn aggressive() -> SpeciesDefinition {
    let mut connections = bias_drive();
    connections.extend([
        ConnectionDef::inhibitor("c3", "sensor_left", RIGHT_MOTOR),
        ConnectionDef::inhibitor("c4", "sensor_right", LEFT_MOTOR),
    ]);
    definition_for(
        "aggressive",
        "Aggressive",
        "red",
        60.0,
        vec![
            eye("sensor_left", 0.0, 45.0, 150.0, 10.0),
            eye("sensor_right", -45.0, 0.0, 150.0, 10.0),
        ],
        true,
        connections,
    )
}

/// Rear sensors with parallel excitation: bolts away from what follows it.
fn coward() -> SpeciesDefinition {
    definition_for(
        "coward",
        "Coward",
        "green",
        55.0,
        vec![
            eye("sensor_rear_left", 90.0, 180.0, 150.0, 10.0),
            eye("sensor_rear_right", -180.0, -90.0, 150.0, 10.0),
        ],
        false,
        vec![
            ConnectionDef::exciter("c1", "sensor_rear_left", LEFT_MOTOR),
            ConnectionDef::exciter("c2", "sensor_rear_right", RIGHT_MOTOR),
        ],
    )
}

/// Cruises on bias and stalls on light from any quarter.
fn paranoid() -> SpeciesDefinition {
    let mut connections = bias_drive();
    connections.extend([
        ConnectionDef::inhibitor("c3", "sensor_front", LEFT_MOTOR),
        ConnectionDef::inhibitor("c4", "sensor_front", RIGHT_MOTOR),
        ConnectionDef::inhibitor("c5", "sensor_rear", LEFT_MOTOR),
        ConnectionDef::inhibitor("c6", "sensor_rear", RIGHT_MOTOR),
        ConnectionDef::inhibitor("c7", "sensor_left", LEFT_MOTOR),
        ConnectionDef::inhibitor("c8", "sensor_right", RIGHT_MOTOR),
    ]);
    definition_for(
        "paranoid",
        "Paranoid",
        "blue",
        45.0,
        vec![
            eye("sensor_front", -45.0, 45.0, 120.0, 8.0),
            eye("sensor_rear", 135.0, -135.0, 120.0, 8.0),
            eye("sensor_left", 45.0, 135.0, 120.0, 8.0),
            eye("sensor_right", -135.0, -45.0, 120.0, 8.0),
        ],
        true,
        connections,
    )
}
