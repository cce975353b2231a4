pub mod config;
pub mod constants;
pub mod entity;
pub mod geometry;
pub mod metrics;
pub mod network;
pub mod physics;
pub mod receptor;
pub mod rng;
pub mod scenario;
pub mod spatial;
pub mod species;
pub mod world;

pub use config::{ArenaConfig, SimConfig, SimConfigError};
pub use entity::{StaticObject, StaticShape, Vehicle};
pub use metrics::{RunSummary, SimulationState, SnapshotFrame, StepMetrics, VehicleInspection};
pub use physics::{CollisionBehavior, CollisionMode};
pub use scenario::{Scenario, ScenarioError};
pub use species::{Species, SpeciesDefinition, SpeciesError};
pub use world::{StateListener, TickReport, World, WorldInitError};
