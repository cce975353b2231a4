//! Serializable world setups: configuration, static objects, species and the
//! vehicles to place. Populations are scattered with a seeded RNG so a file
//! always builds the same world.

use crate::config::SimConfig;
use crate::entity::StaticObject;
use crate::rng::derive_population_rng;
use crate::species::{presets, Species, SpeciesDefinition, SpeciesError};
use crate::world::{World, WorldInitError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::{error::Error, fmt};
use tracing::debug;

/// One vehicle at an exact pose.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Placement {
    pub species: String,
    pub position: [f64; 2],
    #[serde(default)]
    pub heading: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// `count` vehicles at random positions and headings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Population {
    pub species: String,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Scenario {
    pub config: SimConfig,
    pub static_objects: Vec<StaticObject>,
    /// Custom species. Names not listed here fall back to the built-in presets.
    pub species: Vec<SpeciesDefinition>,
    pub vehicles: Vec<Placement>,
    pub populations: Vec<Population>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioError {
    Species(SpeciesError),
    World(WorldInitError),
    DuplicateSpecies(String),
    UnknownSpecies(String),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Species(e) => write!(f, "{e}"),
            ScenarioError::World(e) => write!(f, "{e}"),
            ScenarioError::DuplicateSpecies(id) => write!(f, "species {id} is defined twice"),
            ScenarioError::UnknownSpecies(id) => {
                write!(f, "species {id} is neither defined nor a preset")
            }
        }
    }
}

impl Error for ScenarioError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScenarioError::Species(e) => Some(e),
            ScenarioError::World(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpeciesError> for ScenarioError {
    fn from(err: SpeciesError) -> Self {
        ScenarioError::Species(err)
    }
}

impl From<WorldInitError> for ScenarioError {
    fn from(err: WorldInitError) -> Self {
        ScenarioError::World(err)
    }
}

impl Scenario {
    /// A lamp in the middle of the default arena with a few of each preset
    /// around it.
    pub fn demo() -> Self {
        let config = SimConfig::default();
        let center = [config.arena.width / 2.0, config.arena.height / 2.0];
        Self {
            static_objects: vec![StaticObject::point(0, center, 5.0, "white", 1.0)],
            populations: presets::PRESET_NAMES
                .iter()
                .map(|name| Population {
                    species: (*name).to_owned(),
                    count: 3,
                    color: None,
                })
                .collect(),
            config,
            ..Self::default()
        }
    }

    /// Validate every species the scenario mentions, keyed by id.
    pub fn resolve_species(&self) -> Result<BTreeMap<String, Arc<Species>>, ScenarioError> {
        let mut resolved = BTreeMap::new();
        for definition in &self.species {
            if resolved.contains_key(&definition.id) {
                return Err(ScenarioError::DuplicateSpecies(definition.id.clone()));
            }
            let species = Species::from_definition(definition.clone())?;
            resolved.insert(definition.id.clone(), Arc::new(species));
        }
        let referenced = self
            .vehicles
            .iter()
            .map(|p| &p.species)
            .chain(self.populations.iter().map(|p| &p.species));
        for id in referenced {
            if resolved.contains_key(id) {
                continue;
            }
            let species = presets::species(id).map_err(|err| match err {
                SpeciesError::UnknownPreset(name) => ScenarioError::UnknownSpecies(name),
                other => ScenarioError::Species(other),
            })?;
            resolved.insert(id.clone(), Arc::new(species));
        }
        Ok(resolved)
    }

    /// Build the world: explicit placements first, then every population in
    /// order, each drawing from its own RNG stream.
    pub fn build(&self) -> Result<World, ScenarioError> {
        let species = self.resolve_species()?;
        let mut world = World::new(self.config.clone(), self.static_objects.clone(), Vec::new())?;

        for placement in &self.vehicles {
            let template = lookup(&species, &placement.species)?;
            world.spawn(
                template,
                placement.position,
                placement.heading,
                placement.color.as_deref(),
            )?;
        }

        let arena = &self.config.arena;
        for (idx, population) in self.populations.iter().enumerate() {
            let template = lookup(&species, &population.species)?;
            let mut rng = derive_population_rng(self.config.seed, idx);
            for _ in 0..population.count {
                let position = [
                    rng.random::<f64>() * arena.width,
                    rng.random::<f64>() * arena.height,
                ];
                let heading = rng.random::<f64>() * TAU;
                world.spawn(template, position, heading, population.color.as_deref())?;
            }
        }

        debug!(
            species = species.len(),
            vehicles = world.vehicles().len(),
            "scenario built"
        );
        Ok(world)
    }
}

fn lookup<'a>(
    species: &'a BTreeMap<String, Arc<Species>>,
    id: &str,
) -> Result<&'a Arc<Species>, ScenarioError> {
    species
        .get(id)
        .ok_or_else(|| ScenarioError::UnknownSpecies(id.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_builds_every_preset() {
        let world = Scenario::demo().build().expect("demo scenario");
        assert_eq!(world.vehicles().len(), 3 * presets::PRESET_NAMES.len());
        assert_eq!(world.static_objects().len(), 1);
        assert!(world
            .vehicles()
            .iter()
            .all(|v| world.config().arena.contains(v.position)));
    }

    #[test]
    fn same_seed_scatters_identically() {
        let scenario = Scenario::demo();
        let a = scenario.build().expect("first build");
        let b = scenario.build().expect("second build");
        assert_eq!(a.state(), b.state());

        let mut reseeded = scenario.clone();
        reseeded.config.seed += 1;
        let c = reseeded.build().expect("reseeded build");
        assert_ne!(a.state(), c.state());
    }

    #[test]
    fn custom_species_shadow_presets() {
        let mut definition = presets::definition("phototrope").expect("preset");
        definition.color = "purple".into();
        let scenario = Scenario {
            species: vec![definition],
            vehicles: vec![Placement {
                species: "phototrope".into(),
                position: [10.0, 10.0],
                heading: 0.0,
                color: None,
            }],
            ..Scenario::default()
        };
        let world = scenario.build().expect("scenario");
        assert_eq!(world.vehicles()[0].color, "purple");
    }

    #[test]
    fn unknown_and_duplicate_species_are_rejected() {
        let scenario = Scenario {
            populations: vec![Population {
                species: "unicorn".into(),
                count: 1,
                color: None,
            }],
            ..Scenario::default()
        };
        assert_eq!(
            scenario.build().err(),
            Some(ScenarioError::UnknownSpecies("unicorn".into()))
        );

        let definition = presets::definition("coward").expect("preset");
        let scenario = Scenario {
            species: vec![definition.clone(), definition],
            ..Scenario::default()
        };
        assert_eq!(
            scenario.build().err(),
            Some(ScenarioError::DuplicateSpecies("coward".into()))
        );
    }

    #[test]
    fn population_over_capacity_fails() {
        let mut scenario = Scenario::demo();
        scenario.config.max_vehicles = 4;
        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::World(WorldInitError::TooManyVehicles { .. }))
        ));
    }

    #[test]
    fn parses_a_minimal_file() {
        let json = r#"{
            "config": { "arena": { "width": 400.0, "height": 300.0 } },
            "static_objects": [
                { "id": 1, "position": [200.0, 150.0], "color": "white",
                  "brightness": 1.0, "shape": { "type": "POINT", "radius": 5.0 } }
            ],
            "vehicles": [ { "species": "explorer", "position": [50.0, 50.0] } ]
        }"#;
        let scenario: Scenario = serde_json::from_str(json).expect("parse");
        assert_eq!(scenario.config.delta_time, 0.1);
        let world = scenario.build().expect("build");
        assert_eq!(world.vehicles()[0].heading, 0.0);
        assert!(world.config().arena.wrap_east_west);
    }
}
