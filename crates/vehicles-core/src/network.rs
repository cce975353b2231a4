//! Binary threshold network with wave-based synchronous evaluation.
//!
//! A [`NetworkTemplate`] is the immutable, index-based topology shared by every
//! vehicle of a species. Each vehicle owns a [`NeuralNetwork`]: a handle to the
//! template plus two boolean arrays laid out in parallel with the template's
//! units. One call to [`NeuralNetwork::evaluate`] advances every unit by exactly
//! one tick, reading only the previous tick's firing states, so cycles and
//! self-loops need no special handling: each edge is a one-tick delay.

use crate::constants::{BIAS_MARKER, LEFT_MARKER, MOTOR_MARKER, RIGHT_MARKER};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::{error::Error, fmt};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NeurodeKind {
    Input,
    Hidden,
    Output,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionKind {
    Exciter,
    Inhibitor,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NeurodeDef {
    pub id: String,
    pub kind: NeurodeKind,
    /// Number of simultaneously firing exciter inputs required to fire.
    #[serde(default)]
    pub threshold: u32,
}

impl NeurodeDef {
    pub fn new(id: impl Into<String>, kind: NeurodeKind, threshold: u32) -> Self {
        Self {
            id: id.into(),
            kind,
            threshold,
        }
    }

    pub fn input(id: impl Into<String>) -> Self {
        Self::new(id, NeurodeKind::Input, 0)
    }

    pub fn hidden(id: impl Into<String>, threshold: u32) -> Self {
        Self::new(id, NeurodeKind::Hidden, threshold)
    }

    pub fn output(id: impl Into<String>, threshold: u32) -> Self {
        Self::new(id, NeurodeKind::Output, threshold)
    }

    pub fn is_bias(&self) -> bool {
        self.kind == NeurodeKind::Input && self.id.to_lowercase().contains(BIAS_MARKER)
    }

    fn motor_side(&self) -> Option<MotorSide> {
        if self.kind != NeurodeKind::Output {
            return None;
        }
        let id = self.id.to_lowercase();
        if !id.contains(MOTOR_MARKER) {
            return None;
        }
        match (id.contains(LEFT_MARKER), id.contains(RIGHT_MARKER)) {
            (true, false) => Some(MotorSide::Left),
            (false, true) => Some(MotorSide::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConnectionDef {
    pub id: String,
    pub from: String,
    pub to: String,
    pub kind: ConnectionKind,
    /// Carried for forward compatibility; firing is a pure count/veto and
    /// never reads it.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl ConnectionDef {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: ConnectionKind,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            kind,
            weight: default_weight(),
        }
    }

    pub fn exciter(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(id, from, to, ConnectionKind::Exciter)
    }

    pub fn inhibitor(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::new(id, from, to, ConnectionKind::Inhibitor)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MotorSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    DuplicateNeurode(String),
    UnknownSource { connection: String, neurode: String },
    UnknownDestination { connection: String, neurode: String },
    MissingLeftMotor,
    MissingRightMotor,
    DuplicateMotor(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::DuplicateNeurode(id) => write!(f, "duplicate neurode id '{id}'"),
            NetworkError::UnknownSource {
                connection,
                neurode,
            } => write!(
                f,
                "connection '{connection}' references non-existent from neurode '{neurode}'"
            ),
            NetworkError::UnknownDestination {
                connection,
                neurode,
            } => write!(
                f,
                "connection '{connection}' references non-existent to neurode '{neurode}'"
            ),
            NetworkError::MissingLeftMotor => {
                write!(f, "network must have an OUTPUT neurode marked left motor")
            }
            NetworkError::MissingRightMotor => {
                write!(f, "network must have an OUTPUT neurode marked right motor")
            }
            NetworkError::DuplicateMotor(id) => {
                write!(f, "motor neurode '{id}' duplicates an existing motor output")
            }
        }
    }
}

impl Error for NetworkError {}

/// Where an INPUT neurode takes its pending value from each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Index into the owning vehicle's receptor array.
    Receptor(usize),
    Bias,
    Unbound,
}

/// Validated, immutable network topology.
#[derive(Clone, Debug)]
pub struct NetworkTemplate {
    units: Vec<NeurodeDef>,
    connections: Vec<ConnectionDef>,
    index: HashMap<String, usize>,
    // Per connection: resolved endpoints.
    sources: Vec<usize>,
    destinations: Vec<usize>,
    // Per unit: connection indices.
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
    left_motor: usize,
    right_motor: usize,
}

impl NetworkTemplate {
    pub fn new(
        units: Vec<NeurodeDef>,
        connections: Vec<ConnectionDef>,
    ) -> Result<Self, NetworkError> {
        let mut index = HashMap::with_capacity(units.len());
        let mut left_motor = None;
        let mut right_motor = None;
        for (i, unit) in units.iter().enumerate() {
            if index.insert(unit.id.clone(), i).is_some() {
                return Err(NetworkError::DuplicateNeurode(unit.id.clone()));
            }
            let slot = match unit.motor_side() {
                Some(MotorSide::Left) => &mut left_motor,
                Some(MotorSide::Right) => &mut right_motor,
                None => continue,
            };
            if slot.replace(i).is_some() {
                return Err(NetworkError::DuplicateMotor(unit.id.clone()));
            }
        }
        let left_motor = left_motor.ok_or(NetworkError::MissingLeftMotor)?;
        let right_motor = right_motor.ok_or(NetworkError::MissingRightMotor)?;

        let mut sources = Vec::with_capacity(connections.len());
        let mut destinations = Vec::with_capacity(connections.len());
        let mut incoming = vec![Vec::new(); units.len()];
        let mut outgoing = vec![Vec::new(); units.len()];
        for (c, conn) in connections.iter().enumerate() {
            let from = *index
                .get(&conn.from)
                .ok_or_else(|| NetworkError::UnknownSource {
                    connection: conn.id.clone(),
                    neurode: conn.from.clone(),
                })?;
            let to = *index
                .get(&conn.to)
                .ok_or_else(|| NetworkError::UnknownDestination {
                    connection: conn.id.clone(),
                    neurode: conn.to.clone(),
                })?;
            sources.push(from);
            destinations.push(to);
            outgoing[from].push(c);
            incoming[to].push(c);
        }

        Ok(Self {
            units,
            connections,
            index,
            sources,
            destinations,
            incoming,
            outgoing,
            left_motor,
            right_motor,
        })
    }

    pub fn units(&self) -> &[NeurodeDef] {
        &self.units
    }

    pub fn connections(&self) -> &[ConnectionDef] {
        &self.connections
    }

    pub fn unit_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn incoming(&self, unit: usize) -> &[usize] {
        &self.incoming[unit]
    }

    pub fn outgoing(&self, unit: usize) -> &[usize] {
        &self.outgoing[unit]
    }

    pub fn connection_endpoints(&self, connection: usize) -> (usize, usize) {
        (self.sources[connection], self.destinations[connection])
    }

    pub fn left_motor(&self) -> usize {
        self.left_motor
    }

    pub fn right_motor(&self) -> usize {
        self.right_motor
    }

    /// Resolve every INPUT neurode against the receptor ids of a species.
    ///
    /// The returned vector is parallel to [`Self::units`]; non-INPUT units are
    /// `Unbound` and never read.
    pub fn bind_inputs<S: AsRef<str>>(&self, receptor_ids: &[S]) -> Vec<InputSource> {
        self.units
            .iter()
            .map(|unit| {
                if unit.kind != NeurodeKind::Input {
                    return InputSource::Unbound;
                }
                if let Some(r) = receptor_ids.iter().position(|id| id.as_ref() == unit.id) {
                    InputSource::Receptor(r)
                } else if unit.is_bias() {
                    InputSource::Bias
                } else {
                    InputSource::Unbound
                }
            })
            .collect()
    }
}

/// Binary motor command read from the two motor neurodes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotorOutput {
    pub left: f64,
    pub right: f64,
}

/// One unit's two-bit firing history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeurodeState {
    pub fired_previous_tick: bool,
    pub will_fire_next_tick: bool,
}

/// Per-vehicle network instance: shared topology plus private firing state.
#[derive(Clone, Debug)]
pub struct NeuralNetwork {
    template: Arc<NetworkTemplate>,
    states: Vec<NeurodeState>,
}

impl NeuralNetwork {
    pub fn new(template: Arc<NetworkTemplate>) -> Self {
        let states = vec![NeurodeState::default(); template.units.len()];
        Self { template, states }
    }

    pub fn template(&self) -> &Arc<NetworkTemplate> {
        &self.template
    }

    pub fn states(&self) -> &[NeurodeState] {
        &self.states
    }

    pub fn state(&self, id: &str) -> Option<NeurodeState> {
        self.template.unit_index(id).map(|i| self.states[i])
    }

    pub fn reset(&mut self) {
        self.states.fill(NeurodeState::default());
    }

    /// Advance one tick with INPUT values resolved through `bindings` against
    /// the owning vehicle's receptor firing flags.
    pub fn evaluate(&mut self, bindings: &[InputSource], receptor_fired: &[bool]) -> MotorOutput {
        self.set_inputs(bindings, receptor_fired);
        self.advance();
        self.think()
    }

    /// Latch INPUT units for the coming tick.
    pub fn set_inputs(&mut self, bindings: &[InputSource], receptor_fired: &[bool]) {
        for (state, (unit, source)) in self
            .states
            .iter_mut()
            .zip(self.template.units.iter().zip(bindings))
        {
            if unit.kind != NeurodeKind::Input {
                continue;
            }
            state.will_fire_next_tick = match *source {
                InputSource::Receptor(r) => receptor_fired.get(r).copied().unwrap_or(false),
                InputSource::Bias => true,
                InputSource::Unbound => false,
            };
        }
    }

    /// Advance one tick with INPUT values looked up by neurode id.
    ///
    /// Used where no receptor array exists (standalone networks, tests). Bias
    /// units fire unless the map says otherwise.
    pub fn evaluate_named(&mut self, inputs: &HashMap<String, bool>) -> MotorOutput {
        for (state, unit) in self.states.iter_mut().zip(self.template.units.iter()) {
            if unit.kind != NeurodeKind::Input {
                continue;
            }
            state.will_fire_next_tick = match inputs.get(&unit.id) {
                Some(&fired) => fired,
                None => unit.is_bias(),
            };
        }
        self.advance();
        self.think()
    }

    /// Move every unit to the new instant. Must run for all units before any
    /// unit is evaluated.
    pub fn advance(&mut self) {
        for state in &mut self.states {
            state.fired_previous_tick = state.will_fire_next_tick;
            state.will_fire_next_tick = false;
        }
    }

    /// Evaluate HIDDEN and OUTPUT units from the previous instant and read the
    /// motors.
    pub fn think(&mut self) -> MotorOutput {
        let template = &*self.template;
        for (unit_idx, unit) in template.units.iter().enumerate() {
            if unit.kind == NeurodeKind::Input {
                continue;
            }
            let mut exciters = 0u32;
            let mut inhibited = false;
            for &c in &template.incoming[unit_idx] {
                if !self.states[template.sources[c]].fired_previous_tick {
                    continue;
                }
                match template.connections[c].kind {
                    ConnectionKind::Exciter => exciters += 1,
                    ConnectionKind::Inhibitor => {
                        inhibited = true;
                        break;
                    }
                }
            }
            self.states[unit_idx].will_fire_next_tick = !inhibited && exciters >= unit.threshold;
        }

        self.read_outputs()
    }

    fn read_outputs(&self) -> MotorOutput {
        let level = |i: usize| {
            if self.states[i].fired_previous_tick {
                1.0
            } else {
                0.0
            }
        };
        MotorOutput {
            left: level(self.template.left_motor),
            right: level(self.template.right_motor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motors() -> Vec<NeurodeDef> {
        vec![
            NeurodeDef::output("output_left_motor", 1),
            NeurodeDef::output("output_right_motor", 1),
        ]
    }

    fn network(extra: Vec<NeurodeDef>, connections: Vec<ConnectionDef>) -> NeuralNetwork {
        let mut units = extra;
        units.extend(motors());
        let template = NetworkTemplate::new(units, connections).expect("valid network");
        NeuralNetwork::new(Arc::new(template))
    }

    fn inputs(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn fired(net: &NeuralNetwork, id: &str) -> bool {
        net.state(id).expect("unit exists").fired_previous_tick
    }

    #[test]
    fn missing_motor_is_rejected() {
        let err = NetworkTemplate::new(
            vec![NeurodeDef::output("output_left_motor", 1)],
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, NetworkError::MissingRightMotor);

        let err = NetworkTemplate::new(
            vec![NeurodeDef::output("output_right_motor", 1)],
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, NetworkError::MissingLeftMotor);
    }

    #[test]
    fn hidden_unit_named_like_a_motor_is_not_a_motor() {
        let err = NetworkTemplate::new(
            vec![
                NeurodeDef::hidden("left_motor_relay", 1),
                NeurodeDef::output("output_right_motor", 1),
            ],
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, NetworkError::MissingLeftMotor);
    }

    #[test]
    fn second_left_motor_is_rejected() {
        let mut units = motors();
        units.push(NeurodeDef::output("Left_Motor_2", 1));
        let err = NetworkTemplate::new(units, Vec::new()).unwrap_err();
        assert_eq!(err, NetworkError::DuplicateMotor("Left_Motor_2".into()));
    }

    #[test]
    fn dangling_connection_endpoints_are_rejected() {
        let err = NetworkTemplate::new(
            motors(),
            vec![ConnectionDef::exciter("c1", "ghost", "output_left_motor")],
        )
        .unwrap_err();
        assert!(matches!(err, NetworkError::UnknownSource { .. }));

        let err = NetworkTemplate::new(
            motors(),
            vec![ConnectionDef::exciter("c1", "output_left_motor", "ghost")],
        )
        .unwrap_err();
        assert!(matches!(err, NetworkError::UnknownDestination { .. }));
    }

    #[test]
    fn duplicate_neurode_ids_are_rejected() {
        let mut units = motors();
        units.push(NeurodeDef::input("a"));
        units.push(NeurodeDef::input("a"));
        assert_eq!(
            NetworkTemplate::new(units, Vec::new()).unwrap_err(),
            NetworkError::DuplicateNeurode("a".into())
        );
    }

    #[test]
    fn chain_propagates_one_unit_per_tick() {
        let mut net = network(
            vec![
                NeurodeDef::input("a"),
                NeurodeDef::hidden("b", 1),
                NeurodeDef::hidden("c", 1),
            ],
            vec![
                ConnectionDef::exciter("ab", "a", "b"),
                ConnectionDef::exciter("bc", "b", "c"),
            ],
        );

        net.evaluate_named(&inputs(&[("a", true)]));
        assert!(fired(&net, "a"));
        assert!(!fired(&net, "b"));
        assert!(!fired(&net, "c"));

        net.evaluate_named(&inputs(&[("a", false)]));
        assert!(!fired(&net, "a"));
        assert!(fired(&net, "b"));
        assert!(!fired(&net, "c"));

        net.evaluate_named(&inputs(&[("a", false)]));
        assert!(!fired(&net, "b"));
        assert!(fired(&net, "c"));

        net.evaluate_named(&inputs(&[("a", false)]));
        assert!(!fired(&net, "c"));
    }

    #[test]
    fn ring_oscillates_with_period_three_forever() {
        let mut net = network(
            vec![
                NeurodeDef::input("kick"),
                NeurodeDef::hidden("a", 1),
                NeurodeDef::hidden("b", 1),
                NeurodeDef::hidden("c", 1),
            ],
            vec![
                ConnectionDef::exciter("ka", "kick", "a"),
                ConnectionDef::exciter("ab", "a", "b"),
                ConnectionDef::exciter("bc", "b", "c"),
                ConnectionDef::exciter("ca", "c", "a"),
            ],
        );

        net.evaluate_named(&inputs(&[("kick", true)]));
        let quiet = inputs(&[("kick", false)]);
        let ring = ["a", "b", "c"];
        for tick in 0..3000usize {
            net.evaluate_named(&quiet);
            let firing: Vec<bool> = ring.iter().map(|id| fired(&net, id)).collect();
            assert_eq!(
                firing.iter().filter(|f| **f).count(),
                1,
                "exactly one ring unit fires at tick {tick}"
            );
            assert!(firing[tick % 3], "unit {} should fire at tick {tick}", ring[tick % 3]);
        }
    }

    #[test]
    fn single_inhibitor_vetoes_any_exciter_count() {
        let mut net = network(
            vec![
                NeurodeDef::input("e1"),
                NeurodeDef::input("e2"),
                NeurodeDef::input("inh"),
                NeurodeDef::hidden("target", 1),
            ],
            vec![
                ConnectionDef::exciter("c1", "e1", "target"),
                ConnectionDef::exciter("c2", "e2", "target"),
                ConnectionDef::inhibitor("c3", "inh", "target"),
            ],
        );

        net.evaluate_named(&inputs(&[("e1", true), ("e2", true), ("inh", true)]));
        net.evaluate_named(&HashMap::new());
        assert!(!fired(&net, "target"));

        net.evaluate_named(&inputs(&[("e1", true), ("e2", true), ("inh", false)]));
        net.evaluate_named(&HashMap::new());
        assert!(fired(&net, "target"));
    }

    #[test]
    fn threshold_counts_simultaneous_exciters() {
        let mut net = network(
            vec![
                NeurodeDef::input("x"),
                NeurodeDef::input("y"),
                NeurodeDef::hidden("and", 2),
            ],
            vec![
                ConnectionDef::exciter("c1", "x", "and"),
                ConnectionDef::exciter("c2", "y", "and"),
            ],
        );
        net.evaluate_named(&inputs(&[("x", true)]));
        net.evaluate_named(&HashMap::new());
        assert!(!fired(&net, "and"));

        net.evaluate_named(&inputs(&[("x", true), ("y", true)]));
        net.evaluate_named(&HashMap::new());
        assert!(fired(&net, "and"));
    }

    #[test]
    fn self_loop_latches_after_one_pulse() {
        let mut net = network(
            vec![NeurodeDef::input("set"), NeurodeDef::hidden("latch", 1)],
            vec![
                ConnectionDef::exciter("c1", "set", "latch"),
                ConnectionDef::exciter("c2", "latch", "latch"),
            ],
        );
        net.evaluate_named(&inputs(&[("set", true)]));
        for _ in 0..50 {
            net.evaluate_named(&HashMap::new());
            assert!(fired(&net, "latch"));
        }
    }

    #[test]
    fn bias_drives_motors_one_tick_later() {
        let mut net = network(
            vec![NeurodeDef::input("bias")],
            vec![
                ConnectionDef::exciter("c1", "bias", "output_left_motor"),
                ConnectionDef::exciter("c2", "bias", "output_right_motor"),
            ],
        );
        let bindings = net.template().bind_inputs::<&str>(&[]);
        assert_eq!(bindings[0], InputSource::Bias);

        let first = net.evaluate(&bindings, &[]);
        assert_eq!(first, MotorOutput::default());
        let second = net.evaluate(&bindings, &[]);
        assert_eq!(second, MotorOutput { left: 1.0, right: 1.0 });
    }

    #[test]
    fn receptor_binding_takes_precedence_over_bias_marker() {
        let template = NetworkTemplate::new(
            vec![
                NeurodeDef::input("bias_sensor"),
                NeurodeDef::input("unwired"),
                NeurodeDef::output("output_left_motor", 1),
                NeurodeDef::output("output_right_motor", 1),
            ],
            Vec::new(),
        )
        .expect("valid network");
        let bindings = template.bind_inputs(&["bias_sensor"]);
        assert_eq!(bindings[0], InputSource::Receptor(0));
        assert_eq!(bindings[1], InputSource::Unbound);
        assert_eq!(bindings[2], InputSource::Unbound);
    }

    #[test]
    fn weight_does_not_change_firing() {
        let mut light = ConnectionDef::exciter("c1", "x", "output_left_motor");
        light.weight = 0.0;
        let mut net = network(vec![NeurodeDef::input("x")], vec![light]);
        net.evaluate_named(&inputs(&[("x", true)]));
        let out = net.evaluate_named(&HashMap::new());
        assert_eq!(out.left, 1.0);
        assert_eq!(net.template().connections()[0].weight, 0.0);
    }

    #[test]
    fn instances_do_not_share_state() {
        let template = Arc::new(
            NetworkTemplate::new(
                vec![
                    NeurodeDef::input("x"),
                    NeurodeDef::output("output_left_motor", 1),
                    NeurodeDef::output("output_right_motor", 1),
                ],
                vec![ConnectionDef::exciter("c1", "x", "output_left_motor")],
            )
            .expect("valid network"),
        );
        let mut a = NeuralNetwork::new(Arc::clone(&template));
        let b = NeuralNetwork::new(template);
        a.evaluate_named(&inputs(&[("x", true)]));
        assert!(fired(&a, "x"));
        assert!(!fired(&b, "x"));
        assert!(b.states().iter().all(|s| *s == NeurodeState::default()));

        a.reset();
        assert!(a.states().iter().all(|s| *s == NeurodeState::default()));
    }

    #[test]
    fn adjacency_lists_are_cached_per_unit() {
        let template = NetworkTemplate::new(
            vec![
                NeurodeDef::input("x"),
                NeurodeDef::output("output_left_motor", 1),
                NeurodeDef::output("output_right_motor", 1),
            ],
            vec![
                ConnectionDef::exciter("c1", "x", "output_left_motor"),
                ConnectionDef::inhibitor("c2", "x", "output_right_motor"),
            ],
        )
        .expect("valid network");
        assert_eq!(template.outgoing(0), &[0, 1]);
        assert_eq!(template.incoming(template.left_motor()), &[0]);
        assert_eq!(template.incoming(template.right_motor()), &[1]);
        assert_eq!(template.connection_endpoints(1), (0, template.right_motor()));
    }
}
