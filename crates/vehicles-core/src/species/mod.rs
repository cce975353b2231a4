//! Species templates and the instancing of vehicles from them.
//!
//! A [`Species`] is validated once and then shared behind an `Arc` by every
//! vehicle spawned from it. Spawning copies nothing but per-vehicle state:
//! receptor charges and unit firing flags start cleared.

pub mod presets;

use crate::constants::DEFAULT_VEHICLE_BRIGHTNESS;
use crate::entity::Vehicle;
use crate::network::{
    ConnectionDef, InputSource, NetworkError, NetworkTemplate, NeuralNetwork, NeurodeDef,
};
use crate::receptor::{ReceptorDef, ReceptorState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::{error::Error, fmt};

/// Physical body shared by all vehicles of a species.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BodyParams {
    /// Collision radius in world units.
    pub radius: f64,
    /// Distance between the two wheels; divides the wheel speed difference.
    pub wheel_base: f64,
    /// Wheel speed at a motor command of 1.0, in world units per second.
    pub max_speed: f64,
    /// Brightness other receptors see on vehicles of this species.
    pub brightness: f64,
}

impl Default for BodyParams {
    fn default() -> Self {
        Self {
            radius: 10.0,
            wheel_base: 15.0,
            max_speed: 50.0,
            brightness: DEFAULT_VEHICLE_BRIGHTNESS,
        }
    }
}

/// Serializable blueprint, validated into a [`Species`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeciesDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub body: BodyParams,
    pub receptors: Vec<ReceptorDef>,
    pub neurodes: Vec<NeurodeDef>,
    pub connections: Vec<ConnectionDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpeciesError {
    Network { species: String, source: NetworkError },
    InvalidWheelBase { species: String },
    InvalidRadius { species: String },
    InvalidMaxSpeed { species: String },
    InvalidBrightness { species: String },
    DuplicateReceptor { species: String, receptor: String },
    InvalidReceptor { species: String, receptor: String },
    UnknownPreset(String),
}

impl fmt::Display for SpeciesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeciesError::Network { species, source } => {
                write!(f, "species {species}: {source}")
            }
            SpeciesError::InvalidWheelBase { species } => {
                write!(f, "species {species}: wheel_base must be positive and finite")
            }
            SpeciesError::InvalidRadius { species } => {
                write!(f, "species {species}: radius must be non-negative and finite")
            }
            SpeciesError::InvalidMaxSpeed { species } => {
                write!(f, "species {species}: max_speed must be non-negative and finite")
            }
            SpeciesError::InvalidBrightness { species } => {
                write!(f, "species {species}: brightness must be within [0,1]")
            }
            SpeciesError::DuplicateReceptor { species, receptor } => {
                write!(f, "species {species}: duplicate receptor id {receptor}")
            }
            SpeciesError::InvalidReceptor { species, receptor } => write!(
                f,
                "species {species}: receptor {receptor} needs a positive finite max_range and a finite non-negative threshold"
            ),
            SpeciesError::UnknownPreset(name) => write!(f, "unknown species preset {name}"),
        }
    }
}

impl Error for SpeciesError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SpeciesError::Network { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A validated, immutable species template.
#[derive(Debug)]
pub struct Species {
    id: String,
    name: String,
    color: String,
    body: BodyParams,
    receptors: Vec<ReceptorDef>,
    template: Arc<NetworkTemplate>,
    input_bindings: Vec<InputSource>,
}

impl Species {
    pub fn from_definition(definition: SpeciesDefinition) -> Result<Self, SpeciesError> {
        let SpeciesDefinition {
            id,
            name,
            color,
            body,
            receptors,
            neurodes,
            connections,
        } = definition;

        if !(body.wheel_base.is_finite() && body.wheel_base > 0.0) {
            return Err(SpeciesError::InvalidWheelBase { species: id });
        }
        if !(body.radius.is_finite() && body.radius >= 0.0) {
            return Err(SpeciesError::InvalidRadius { species: id });
        }
        if !(body.max_speed.is_finite() && body.max_speed >= 0.0) {
            return Err(SpeciesError::InvalidMaxSpeed { species: id });
        }
        if !(0.0..=1.0).contains(&body.brightness) {
            return Err(SpeciesError::InvalidBrightness { species: id });
        }

        let mut seen = HashSet::with_capacity(receptors.len());
        for receptor in &receptors {
            if !seen.insert(receptor.id.as_str()) {
                return Err(SpeciesError::DuplicateReceptor {
                    species: id.clone(),
                    receptor: receptor.id.clone(),
                });
            }
            let range_ok = receptor.max_range.is_finite() && receptor.max_range > 0.0;
            let threshold_ok = receptor.threshold.is_finite() && receptor.threshold >= 0.0;
            if !(range_ok && threshold_ok && receptor.sensitivity.is_finite()) {
                return Err(SpeciesError::InvalidReceptor {
                    species: id.clone(),
                    receptor: receptor.id.clone(),
                });
            }
        }

        let template = match NetworkTemplate::new(neurodes, connections) {
            Ok(template) => template,
            Err(source) => return Err(SpeciesError::Network { species: id, source }),
        };
        let receptor_ids: Vec<&str> = receptors.iter().map(|r| r.id.as_str()).collect();
        let input_bindings = template.bind_inputs(receptor_ids.as_slice());
        let name = if name.is_empty() { id.clone() } else { name };

        Ok(Self {
            id,
            name,
            color,
            body,
            receptors,
            template: Arc::new(template),
            input_bindings,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Color given to spawned vehicles that do not override it.
    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn body(&self) -> &BodyParams {
        &self.body
    }

    pub fn receptors(&self) -> &[ReceptorDef] {
        &self.receptors
    }

    pub fn template(&self) -> &Arc<NetworkTemplate> {
        &self.template
    }

    /// Farthest any receptor of this species can see.
    pub fn sensing_range(&self) -> f64 {
        self.receptors
            .iter()
            .map(|r| r.max_range)
            .fold(0.0, f64::max)
    }

    /// Per-input-unit binding, index-aligned with the template's units.
    pub fn input_bindings(&self) -> &[InputSource] {
        &self.input_bindings
    }

    /// Instantiate a fresh vehicle: cleared receptor charges, cleared unit
    /// state, motors at rest.
    pub fn spawn(
        self: &Arc<Self>,
        id: u32,
        position: [f64; 2],
        heading: f64,
        color: Option<&str>,
    ) -> Vehicle {
        Vehicle::new(
            id,
            Arc::clone(self),
            position,
            heading,
            color.unwrap_or(&self.color).to_owned(),
            vec![ReceptorState::default(); self.receptors.len()],
            NeuralNetwork::new(Arc::clone(&self.template)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ConnectionDef, NeurodeDef};

    fn minimal_definition() -> SpeciesDefinition {
        SpeciesDefinition {
            id: "wanderer".into(),
            name: String::new(),
            color: "yellow".into(),
            body: BodyParams::default(),
            receptors: vec![ReceptorDef::new("eye", -0.5, 0.5, 100.0, "white", 5.0)],
            neurodes: vec![
                NeurodeDef::input("eye"),
                NeurodeDef::output("left_motor", 1),
                NeurodeDef::output("right_motor", 1),
            ],
            connections: vec![ConnectionDef::exciter("c1", "eye", "left_motor")],
        }
    }

    #[test]
    fn definition_builds_species_with_bound_inputs() {
        let species = Species::from_definition(minimal_definition()).expect("valid species");
        assert_eq!(species.name(), "wanderer");
        assert_eq!(species.input_bindings()[0], InputSource::Receptor(0));
        assert_eq!(species.receptors().len(), 1);
    }

    #[test]
    fn zero_wheel_base_is_rejected() {
        let mut def = minimal_definition();
        def.body.wheel_base = 0.0;
        assert!(matches!(
            Species::from_definition(def),
            Err(SpeciesError::InvalidWheelBase { .. })
        ));

        let mut def = minimal_definition();
        def.body.wheel_base = f64::NAN;
        assert!(matches!(
            Species::from_definition(def),
            Err(SpeciesError::InvalidWheelBase { .. })
        ));
    }

    #[test]
    fn network_errors_carry_the_species_id() {
        let mut def = minimal_definition();
        def.neurodes.pop();
        let err = Species::from_definition(def).expect_err("missing right motor");
        assert!(matches!(
            err,
            SpeciesError::Network {
                source: NetworkError::MissingRightMotor,
                ..
            }
        ));
        assert!(err.to_string().starts_with("species wanderer"));
        assert!(err.source().is_some());
    }

    #[test]
    fn duplicate_and_degenerate_receptors_are_rejected() {
        let mut def = minimal_definition();
        def.receptors.push(def.receptors[0].clone());
        assert!(matches!(
            Species::from_definition(def),
            Err(SpeciesError::DuplicateReceptor { .. })
        ));

        let mut def = minimal_definition();
        def.receptors[0].max_range = 0.0;
        assert!(matches!(
            Species::from_definition(def),
            Err(SpeciesError::InvalidReceptor { .. })
        ));
    }

    #[test]
    fn spawned_vehicles_share_template_but_not_state() {
        let species = Arc::new(Species::from_definition(minimal_definition()).expect("valid"));
        let mut a = species.spawn(1, [10.0, 10.0], 0.0, None);
        let b = species.spawn(2, [20.0, 20.0], 1.0, Some("purple"));

        assert!(Arc::ptr_eq(a.network().template(), b.network().template()));
        assert_eq!(a.color, "yellow");
        assert_eq!(b.color, "purple");
        assert_eq!(a.brightness, DEFAULT_VEHICLE_BRIGHTNESS);

        let mut charged = ReceptorState::default();
        charged.accumulate(3.0);
        a.latch_receptors(vec![charged]);
        assert_eq!(a.receptors()[0].accumulated_light, 3.0);
        assert_eq!(b.receptors()[0].accumulated_light, 0.0);
        assert_eq!((b.left_motor, b.right_motor), (0.0, 0.0));
    }

    #[test]
    fn definition_json_fills_body_defaults() {
        let json = r#"{
            "id": "blank",
            "color": "grey",
            "receptors": [],
            "neurodes": [
                {"id": "left_motor", "kind": "OUTPUT", "threshold": 1},
                {"id": "right_motor", "kind": "OUTPUT", "threshold": 1}
            ],
            "connections": []
        }"#;
        let def: SpeciesDefinition = serde_json::from_str(json).expect("parses");
        assert_eq!(def.body, BodyParams::default());
        assert!(Species::from_definition(def).is_ok());
    }
}
