use super::super::{FaultKind, VehicleFault, World};
use crate::physics::{self, CollisionMode, Pose};
use crate::spatial::{self, EntityRef};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Stay,
    Bounce,
    Break,
}

impl World {
    /// Move every vehicle, then resolve boundaries and collisions against the
    /// complete set of new positions. Broken vehicles leave at the very end.
    ///
    /// Returns the removed vehicle ids and any numerical faults.
    pub(in crate::world) fn step_act_phase(&mut self) -> (Vec<u32>, Vec<VehicleFault>) {
        let dt = self.config.delta_time;
        let tick = self.tick;
        let mut faults = Vec::new();

        self.pose_buffer.clear();
        self.faulted_buffer.clear();
        for (idx, vehicle) in self.vehicles.iter_mut().enumerate() {
            let body = vehicle.species().body();
            let current = Pose {
                position: vehicle.position,
                heading: vehicle.heading,
            };
            let (linear, angular) =
                physics::velocities(vehicle.left_motor, vehicle.right_motor, body);
            let fault = if !(linear.is_finite() && angular.is_finite()) {
                Some(FaultKind::NonFiniteVelocity)
            } else {
                None
            };
            let next = physics::integrate(current, vehicle.left_motor, vehicle.right_motor, body, dt);
            let fault = fault.or((!next.is_finite()).then_some(FaultKind::NonFinitePose));
            if let Some(kind) = fault {
                warn!(vehicle = vehicle.id, tick, ?kind, "vehicle fault; keeping previous pose and motors");
                faults.push(VehicleFault {
                    vehicle: vehicle.id,
                    tick,
                    kind,
                });
                if let Some(&(left, right)) = self.motor_buffer.get(idx) {
                    vehicle.left_motor = left;
                    vehicle.right_motor = right;
                }
                self.pose_buffer.push(current);
                self.faulted_buffer.push(true);
                continue;
            }
            self.pose_buffer.push(Pose {
                position: physics::apply_wrap(next.position, &self.config.arena),
                heading: next.heading,
            });
            self.faulted_buffer.push(false);
        }

        let positions: Vec<[f64; 2]> = self.pose_buffer.iter().map(|p| p.position).collect();
        let radii: Vec<f64> = self.vehicles.iter().map(|v| v.radius()).collect();
        let body_index = spatial::build_body_index(&positions, &radii, &self.static_objects);

        let mut outcomes = vec![Outcome::Stay; self.vehicles.len()];
        for (idx, vehicle) in self.vehicles.iter().enumerate() {
            if self.faulted_buffer[idx] {
                continue;
            }
            let position = positions[idx];
            // Leaving through a solid edge always breaks, whatever the mode.
            if physics::crosses_boundary(position, &self.config.arena) {
                outcomes[idx] = Outcome::Break;
                continue;
            }
            let mode = self.config.collision.resolve(&vehicle.color);
            if mode == CollisionMode::None {
                continue;
            }
            let radius = radii[idx];
            let hit = spatial::candidates(&body_index, position, radius)
                .into_iter()
                .any(|entity| match entity {
                    EntityRef::Vehicle(other) => {
                        other != idx
                            && physics::hits_vehicle(position, radius, positions[other], radii[other])
                    }
                    EntityRef::Static(obj) => {
                        physics::hits_static(position, radius, &self.static_objects[obj])
                    }
                });
            if hit {
                outcomes[idx] = match mode {
                    CollisionMode::Break => Outcome::Break,
                    CollisionMode::Bounce => Outcome::Bounce,
                    CollisionMode::None => Outcome::Stay,
                };
            }
        }

        let mut removed = Vec::new();
        for ((vehicle, pose), outcome) in self
            .vehicles
            .iter_mut()
            .zip(&self.pose_buffer)
            .zip(&outcomes)
        {
            vehicle.position = pose.position;
            vehicle.heading = pose.heading;
            match outcome {
                Outcome::Stay => {}
                Outcome::Bounce => {
                    let (heading, left, right) =
                        physics::bounce(vehicle.heading, vehicle.left_motor, vehicle.right_motor);
                    vehicle.heading = heading;
                    vehicle.left_motor = left;
                    vehicle.right_motor = right;
                }
                Outcome::Break => {
                    debug!(vehicle = vehicle.id, tick, "vehicle removed due to collision");
                    removed.push(vehicle.id);
                }
            }
        }

        if !removed.is_empty() {
            let mut outcomes = outcomes.iter();
            self.vehicles
                .retain(|_| outcomes.next() != Some(&Outcome::Break));
        }

        (removed, faults)
    }
}
