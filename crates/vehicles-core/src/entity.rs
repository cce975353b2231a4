use crate::network::{MotorOutput, NeuralNetwork};
use crate::receptor::{Luminous, ReceptorState};
use crate::species::Species;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A mobile differential-drive vehicle instanced from a [`Species`].
#[derive(Clone, Debug)]
pub struct Vehicle {
    pub id: u32,
    pub position: [f64; 2],
    /// Radians in `[0, 2π)`, zero along +x, counter-clockwise positive.
    pub heading: f64,
    /// Signed motor commands; the kernel does not clamp them.
    pub left_motor: f64,
    pub right_motor: f64,
    pub color: String,
    pub brightness: f64,
    species: Arc<Species>,
    receptors: Vec<ReceptorState>,
    network: NeuralNetwork,
}

impl Vehicle {
    pub(crate) fn new(
        id: u32,
        species: Arc<Species>,
        position: [f64; 2],
        heading: f64,
        color: String,
        receptors: Vec<ReceptorState>,
        network: NeuralNetwork,
    ) -> Self {
        Self {
            id,
            position,
            heading: crate::geometry::normalize_angle(heading),
            left_motor: 0.0,
            right_motor: 0.0,
            color,
            brightness: species.body().brightness,
            species,
            receptors,
            network,
        }
    }

    pub fn species(&self) -> &Arc<Species> {
        &self.species
    }

    pub fn radius(&self) -> f64 {
        self.species.body().radius
    }

    pub fn receptors(&self) -> &[ReceptorState] {
        &self.receptors
    }

    pub fn network(&self) -> &NeuralNetwork {
        &self.network
    }

    /// How this vehicle appears to other vehicles' receptors.
    pub fn luminous(&self) -> Luminous<'_> {
        Luminous {
            position: self.position,
            color: &self.color,
            brightness: self.brightness,
        }
    }

    /// Receptor states after charging from `visible`. The vehicle itself is
    /// untouched so every vehicle can sense the same instant.
    pub fn sense(&self, visible: &[Luminous<'_>]) -> Vec<ReceptorState> {
        self.receptors
            .iter()
            .zip(self.species.receptors())
            .map(|(state, def)| {
                let mut next = *state;
                next.sense(def, self.position, self.heading, visible.iter().copied());
                next
            })
            .collect()
    }

    pub(crate) fn latch_receptors(&mut self, states: Vec<ReceptorState>) {
        debug_assert_eq!(states.len(), self.receptors.len());
        self.receptors = states;
    }

    /// Feed the latched receptor decisions to the input units and move the
    /// network to the next instant.
    pub fn advance(&mut self) {
        let fired: Vec<bool> = self
            .receptors
            .iter()
            .map(|r| r.will_fire_next_tick)
            .collect();
        self.network.set_inputs(self.species.input_bindings(), &fired);
        self.network.advance();
    }

    /// Evaluate the network and return the motor command it settles on.
    pub fn think(&mut self) -> MotorOutput {
        self.network.think()
    }

    /// Clear receptor charges, unit state and motors.
    pub fn reset_state(&mut self) {
        self.receptors.fill(ReceptorState::default());
        self.network.reset();
        self.left_motor = 0.0;
        self.right_motor = 0.0;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaticShape {
    Point {
        #[serde(default)]
        radius: f64,
    },
    /// A segment from the object's position to `end`; walls have no radius.
    Wall { end: [f64; 2] },
}

fn default_emits() -> bool {
    true
}

/// An immovable light source or obstacle.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StaticObject {
    pub id: u32,
    pub position: [f64; 2],
    pub color: String,
    pub brightness: f64,
    #[serde(default = "default_emits")]
    pub emits_brightness: bool,
    pub shape: StaticShape,
}

impl StaticObject {
    pub fn point(
        id: u32,
        position: [f64; 2],
        radius: f64,
        color: impl Into<String>,
        brightness: f64,
    ) -> Self {
        Self {
            id,
            position,
            color: color.into(),
            brightness,
            emits_brightness: true,
            shape: StaticShape::Point { radius },
        }
    }

    pub fn wall(
        id: u32,
        start: [f64; 2],
        end: [f64; 2],
        color: impl Into<String>,
        brightness: f64,
    ) -> Self {
        Self {
            id,
            position: start,
            color: color.into(),
            brightness,
            emits_brightness: true,
            shape: StaticShape::Wall { end },
        }
    }

    pub fn dark(mut self) -> Self {
        self.emits_brightness = false;
        self
    }

    pub fn radius(&self) -> f64 {
        match self.shape {
            StaticShape::Point { radius } => radius,
            StaticShape::Wall { .. } => 0.0,
        }
    }

    /// Light seen by receptors; walls shine from their first endpoint.
    pub fn luminous(&self) -> Option<Luminous<'_>> {
        self.emits_brightness.then_some(Luminous {
            position: self.position,
            color: &self.color,
            brightness: self.brightness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::presets;

    #[test]
    fn dark_objects_are_invisible() {
        let lamp = StaticObject::point(1, [0.0, 0.0], 5.0, "white", 1.0);
        assert!(lamp.luminous().is_some());
        assert!(lamp.dark().luminous().is_none());
    }

    #[test]
    fn walls_have_zero_radius() {
        let wall = StaticObject::wall(2, [0.0, 0.0], [10.0, 0.0], "grey", 0.5);
        assert_eq!(wall.radius(), 0.0);
        assert_eq!(wall.luminous().map(|l| l.position), Some([0.0, 0.0]));
    }

    #[test]
    fn shape_serializes_with_type_tag() {
        let wall = StaticObject::wall(3, [1.0, 2.0], [3.0, 4.0], "grey", 0.0);
        let json = serde_json::to_value(&wall).expect("serialize");
        assert_eq!(json["shape"]["type"], "WALL");
        let point: StaticObject = serde_json::from_str(
            r#"{"id":4,"position":[5.0,5.0],"color":"white","brightness":1.0,"shape":{"type":"POINT"}}"#,
        )
        .expect("deserialize");
        assert_eq!(point.shape, StaticShape::Point { radius: 0.0 });
        assert!(point.emits_brightness);
    }

    #[test]
    fn sensing_then_thinking_drives_the_crossed_motor() {
        let species = Arc::new(presets::species("phototrope").expect("preset"));
        let mut vehicle = species.spawn(1, [100.0, 100.0], 0.0, None);
        // Very bright light on the left: brightness 30 at half range gives 15 per tick.
        let light = Luminous {
            position: [100.0, 200.0],
            color: "white",
            brightness: 30.0,
        };
        let sensed = vehicle.sense(&[light]);
        assert!(sensed[0].will_fire_next_tick);
        assert!(!sensed[1].will_fire_next_tick);
        assert_eq!(vehicle.receptors()[0].accumulated_light, 0.0);
        vehicle.latch_receptors(sensed);

        // Input fires now; the motor one tick later.
        vehicle.advance();
        assert_eq!(vehicle.think(), MotorOutput::default());
        let sensed = vehicle.sense(&[]);
        vehicle.latch_receptors(sensed);
        vehicle.advance();
        let out = vehicle.think();
        assert_eq!((out.left, out.right), (0.0, 1.0));

        vehicle.reset_state();
        assert_eq!(vehicle.receptors()[0].accumulated_light, 0.0);
        assert!(vehicle.network().states().iter().all(|s| !s.fired_previous_tick));
    }
}
