use super::super::World;

impl World {
    /// Latch inputs from the receptors and move every unit of every network
    /// to the new instant.
    pub(in crate::world) fn step_advance_phase(&mut self) {
        for vehicle in &mut self.vehicles {
            vehicle.advance();
        }
    }
}
