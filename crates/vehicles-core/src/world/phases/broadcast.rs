use super::super::World;
use crate::metrics::SimulationState;
use tracing::warn;

impl World {
    /// Snapshot the world and hand it to every listener. A failing listener
    /// is logged and skipped.
    pub(in crate::world) fn step_broadcast_phase(&mut self) -> SimulationState {
        let state = self.state();
        for (idx, listener) in self.listeners.iter_mut().enumerate() {
            if let Err(error) = listener.on_state_update(&state) {
                warn!(listener = idx, tick = state.tick, %error, "state listener failed");
            }
        }
        state
    }
}
