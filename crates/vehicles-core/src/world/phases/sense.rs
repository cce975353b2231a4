use super::super::World;
use crate::receptor::Luminous;
use crate::spatial::{self, EntityLocation, EntityRef};
use rstar::RTree;

impl World {
    /// Charge every receptor from last tick's positions. Vehicles never see
    /// themselves, and results are latched only after every vehicle has sensed.
    pub(in crate::world) fn step_sense_phase(&mut self, light_index: &RTree<EntityLocation>) {
        let mut sensed = Vec::with_capacity(self.vehicles.len());
        for (idx, vehicle) in self.vehicles.iter().enumerate() {
            let range = vehicle.species().sensing_range();
            let visible: Vec<Luminous<'_>> = spatial::candidates(light_index, vehicle.position, range)
                .into_iter()
                .filter_map(|entity| match entity {
                    EntityRef::Vehicle(other) if other == idx => None,
                    EntityRef::Vehicle(other) => Some(self.vehicles[other].luminous()),
                    EntityRef::Static(obj) => self.static_objects[obj].luminous(),
                })
                .collect();
            sensed.push(vehicle.sense(&visible));
        }

        for (vehicle, states) in self.vehicles.iter_mut().zip(sensed) {
            vehicle.latch_receptors(states);
        }
    }
}
