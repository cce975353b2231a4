use super::super::World;

impl World {
    /// Evaluate every network and copy the motor units onto the wheels. The
    /// previous commands are kept so a faulting vehicle can fall back to them.
    pub(in crate::world) fn step_think_phase(&mut self) {
        self.motor_buffer.clear();
        for vehicle in &mut self.vehicles {
            self.motor_buffer
                .push((vehicle.left_motor, vehicle.right_motor));
            let out = vehicle.think();
            vehicle.left_motor = out.left;
            vehicle.right_motor = out.right;
        }
    }
}
