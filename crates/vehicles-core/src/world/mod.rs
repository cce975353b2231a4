use crate::config::{SimConfig, SimConfigError};
use crate::entity::{StaticObject, Vehicle};
use crate::metrics::{self, RunSummary, SimulationState, SnapshotFrame, VehicleInspection};
use crate::physics::Pose;
use crate::spatial;
use crate::species::Species;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use std::{error::Error, fmt};
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct StepTimings {
    pub spatial_build_us: u64,
    pub sense_us: u64,
    pub advance_us: u64,
    pub think_us: u64,
    pub act_us: u64,
    pub broadcast_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// Wheel speeds overflowed to a non-finite linear or angular velocity.
    NonFiniteVelocity,
    /// Integration produced a non-finite position or heading.
    NonFinitePose,
}

/// A per-vehicle numerical fault. The vehicle kept its previous pose and
/// motors for the tick; the rest of the world was unaffected.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleFault {
    pub vehicle: u32,
    pub tick: u64,
    pub kind: FaultKind,
}

impl fmt::Display for VehicleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            FaultKind::NonFiniteVelocity => "non-finite wheel velocity",
            FaultKind::NonFinitePose => "non-finite integrated pose",
        };
        write!(f, "vehicle {} at tick {}: {what}", self.vehicle, self.tick)
    }
}

impl Error for VehicleFault {}

/// Receives the snapshot produced by every tick's broadcast phase.
pub trait StateListener {
    fn on_state_update(
        &mut self,
        state: &SimulationState,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Everything one call to [`World::step`] produced.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub state: SimulationState,
    /// Ids of vehicles removed at the end of this tick.
    pub removed: Vec<u32>,
    pub faults: Vec<VehicleFault>,
    pub timings: StepTimings,
}

impl TickReport {
    pub fn fault_count(&self) -> usize {
        self.faults.len()
    }
}

pub struct World {
    vehicles: Vec<Vehicle>,
    static_objects: Vec<StaticObject>,
    config: SimConfig,
    tick: u64,
    next_vehicle_id: u32,
    listeners: Vec<Box<dyn StateListener>>,
    total_removed: usize,
    total_faults: usize,

    // Buffers for avoiding allocation in the act phase
    pose_buffer: Vec<Pose>,
    faulted_buffer: Vec<bool>,
    // Motor commands from before the think phase, restored on a fault
    motor_buffer: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    TooManyVehicles { max: usize, actual: usize },
    DuplicateVehicleId(u32),
    DuplicateStaticObjectId(u32),
    VehicleIdExhausted,
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::TooManyVehicles { max, actual } => {
                write!(f, "vehicle count ({actual}) exceeds max_vehicles ({max})")
            }
            WorldInitError::DuplicateVehicleId(id) => write!(f, "duplicate vehicle id {id}"),
            WorldInitError::DuplicateStaticObjectId(id) => {
                write!(f, "duplicate static object id {id}")
            }
            WorldInitError::VehicleIdExhausted => write!(f, "no free vehicle id left"),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
    TooManySnapshots { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
            ExperimentError::TooManySnapshots { max, actual } => {
                write!(
                    f,
                    "snapshot count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for ExperimentError {}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;
    pub const MAX_EXPERIMENT_SNAPSHOTS: usize = 1_000;

    pub fn new(
        config: SimConfig,
        static_objects: Vec<StaticObject>,
        vehicles: Vec<Vehicle>,
    ) -> Result<Self, WorldInitError> {
        config.validate()?;
        if vehicles.len() > config.max_vehicles {
            return Err(WorldInitError::TooManyVehicles {
                max: config.max_vehicles,
                actual: vehicles.len(),
            });
        }
        let mut vehicle_ids = HashSet::with_capacity(vehicles.len());
        for v in &vehicles {
            if !vehicle_ids.insert(v.id) {
                return Err(WorldInitError::DuplicateVehicleId(v.id));
            }
        }
        let mut static_ids = HashSet::with_capacity(static_objects.len());
        for s in &static_objects {
            if !static_ids.insert(s.id) {
                return Err(WorldInitError::DuplicateStaticObjectId(s.id));
            }
        }

        let next_vehicle_id = vehicles
            .iter()
            .map(|v| v.id.saturating_add(1))
            .max()
            .unwrap_or(0);
        debug!(
            vehicles = vehicles.len(),
            static_objects = static_objects.len(),
            "world constructed"
        );
        Ok(Self {
            vehicles,
            static_objects,
            config,
            tick: 0,
            next_vehicle_id,
            listeners: Vec::new(),
            total_removed: 0,
            total_faults: 0,
            pose_buffer: Vec::new(),
            faulted_buffer: Vec::new(),
            motor_buffer: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace the configuration. Vehicles and static objects are kept.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), WorldInitError> {
        config.validate()?;
        if self.vehicles.len() > config.max_vehicles {
            return Err(WorldInitError::TooManyVehicles {
                max: config.max_vehicles,
                actual: self.vehicles.len(),
            });
        }
        self.config = config;
        Ok(())
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: u32) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    /// Mutable access for hosts that steer vehicles between ticks.
    pub fn vehicle_mut(&mut self, id: u32) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }

    pub fn static_objects(&self) -> &[StaticObject] {
        &self.static_objects
    }

    pub fn total_removed(&self) -> usize {
        self.total_removed
    }

    pub fn total_faults(&self) -> usize {
        self.total_faults
    }

    fn next_vehicle_id_checked(&mut self) -> Option<u32> {
        let mut id = self.next_vehicle_id;
        while self.vehicles.iter().any(|v| v.id == id) {
            id = id.checked_add(1)?;
        }
        self.next_vehicle_id = id.checked_add(1).unwrap_or(u32::MAX);
        Some(id)
    }

    fn ensure_capacity(&self) -> Result<(), WorldInitError> {
        if self.vehicles.len() >= self.config.max_vehicles {
            return Err(WorldInitError::TooManyVehicles {
                max: self.config.max_vehicles,
                actual: self.vehicles.len() + 1,
            });
        }
        Ok(())
    }

    /// Instance `species` into the world under a fresh id.
    pub fn spawn(
        &mut self,
        species: &Arc<Species>,
        position: [f64; 2],
        heading: f64,
        color: Option<&str>,
    ) -> Result<u32, WorldInitError> {
        self.ensure_capacity()?;
        let id = self
            .next_vehicle_id_checked()
            .ok_or(WorldInitError::VehicleIdExhausted)?;
        self.vehicles.push(species.spawn(id, position, heading, color));
        Ok(id)
    }

    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> Result<(), WorldInitError> {
        self.ensure_capacity()?;
        if self.vehicles.iter().any(|v| v.id == vehicle.id) {
            return Err(WorldInitError::DuplicateVehicleId(vehicle.id));
        }
        self.vehicles.push(vehicle);
        Ok(())
    }

    pub fn remove_vehicle(&mut self, id: u32) -> Option<Vehicle> {
        let idx = self.vehicles.iter().position(|v| v.id == id)?;
        Some(self.vehicles.remove(idx))
    }

    pub fn add_static_object(&mut self, object: StaticObject) -> Result<(), WorldInitError> {
        if self.static_objects.iter().any(|s| s.id == object.id) {
            return Err(WorldInitError::DuplicateStaticObjectId(object.id));
        }
        self.static_objects.push(object);
        Ok(())
    }

    pub fn remove_static_object(&mut self, id: u32) -> Option<StaticObject> {
        let idx = self.static_objects.iter().position(|s| s.id == id)?;
        Some(self.static_objects.remove(idx))
    }

    pub fn add_listener(&mut self, listener: Box<dyn StateListener>) {
        self.listeners.push(listener);
    }

    /// Drop every vehicle and rewind the tick counter. Static objects,
    /// configuration and listeners are kept.
    pub fn reset(&mut self) {
        self.vehicles.clear();
        self.tick = 0;
        self.next_vehicle_id = 0;
        self.total_removed = 0;
        self.total_faults = 0;
    }

    pub fn state(&self) -> SimulationState {
        metrics::snapshot(self.tick, &self.vehicles, &self.static_objects)
    }

    pub fn inspect_vehicle(&self, id: u32) -> Option<VehicleInspection> {
        self.vehicle(id).map(VehicleInspection::from)
    }

    fn check_experiment_limits(
        steps: usize,
        sample_every: usize,
        snapshot_count: usize,
    ) -> Result<usize, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        if snapshot_count > Self::MAX_EXPERIMENT_SNAPSHOTS {
            return Err(ExperimentError::TooManySnapshots {
                max: Self::MAX_EXPERIMENT_SNAPSHOTS,
                actual: snapshot_count,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }
        Ok(estimated_samples)
    }

    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        self.try_run_experiment_with_snapshots(steps, sample_every, &[])
    }

    /// Run an experiment like `try_run_experiment`, but also keep the full
    /// world snapshot at the specified steps.
    pub fn try_run_experiment_with_snapshots(
        &mut self,
        steps: usize,
        sample_every: usize,
        snapshot_steps: &[usize],
    ) -> Result<RunSummary, ExperimentError> {
        let estimated_samples =
            Self::check_experiment_limits(steps, sample_every, snapshot_steps.len())?;

        let removed_before = self.total_removed;
        let faults_before = self.total_faults;
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut snapshots = Vec::with_capacity(snapshot_steps.len());
        let snapshot_steps_set: HashSet<usize> = snapshot_steps.iter().copied().collect();

        for step in 1..=steps {
            let report = self.step();
            if step % sample_every == 0 || step == steps {
                samples.push(metrics::collect_step_metrics(
                    step,
                    self.tick,
                    report.removed.len(),
                    report.fault_count(),
                    &self.vehicles,
                ));
            }
            if snapshot_steps_set.contains(&step) {
                snapshots.push(SnapshotFrame {
                    step,
                    state: report.state,
                });
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            final_vehicle_count: self.vehicles.len(),
            samples,
            total_removed: self.total_removed - removed_before,
            total_faults: self.total_faults - faults_before,
            snapshots,
        })
    }

    /// Advance the world by exactly one tick:
    /// sense, advance, think, act, broadcast.
    pub fn step(&mut self) -> TickReport {
        let total_start = Instant::now();

        let t0 = Instant::now();
        let light_index = spatial::build_light_index(&self.vehicles, &self.static_objects);
        let spatial_build_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.step_sense_phase(&light_index);
        let sense_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        self.step_advance_phase();
        let advance_us = t2.elapsed().as_micros() as u64;

        let t3 = Instant::now();
        self.step_think_phase();
        let think_us = t3.elapsed().as_micros() as u64;

        let t4 = Instant::now();
        let (removed, faults) = self.step_act_phase();
        let act_us = t4.elapsed().as_micros() as u64;
        self.total_removed += removed.len();
        self.total_faults += faults.len();

        self.tick = self.tick.saturating_add(1);

        let t5 = Instant::now();
        let state = self.step_broadcast_phase();
        let broadcast_us = t5.elapsed().as_micros() as u64;

        TickReport {
            state,
            removed,
            faults,
            timings: StepTimings {
                spatial_build_us,
                sense_us,
                advance_us,
                think_us,
                act_us,
                broadcast_us,
                total_us: total_start.elapsed().as_micros() as u64,
            },
        }
    }
}

mod phases;
