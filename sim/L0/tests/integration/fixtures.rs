//! Shared model builders and monitors.

use nalgebra::{Vector3, Vector6};
use sim_flex::{
    ElementProperties, ExternalForceProperties, Frame, JointProperties, Model, Node, NodeId,
    RigidBodyProperties, RigidLinkProperties, SolveSummary, StepObserver, StepReport,
};
use sim_types::Result;

/// Gravitational acceleration.
pub const GRAVITY: f64 = 9.81;

/// Pendulum mass.
pub const MASS: f64 = 2.0;

/// Pendulum arm length.
pub const LENGTH: f64 = 1.0;

/// Rigid body used for every pendulum bob.
pub fn bob() -> RigidBodyProperties {
    RigidBodyProperties::with_principal_inertia(MASS, Vector3::new(0.02, 0.03, 0.04))
}

/// Weight of the bob as a constant, non-follower nodal load.
pub fn weight() -> ExternalForceProperties {
    ExternalForceProperties::constant(Vector6::new(0.0, 0.0, -MASS * GRAVITY, 0.0, 0.0, 0.0))
}

/// Nodes of a pendulum model.
#[derive(Debug, Clone, Copy)]
pub struct Pendulum {
    /// Node carrying the joint to the ground.
    pub pivot: NodeId,
    /// Node carrying the bob.
    pub bob: NodeId,
}

/// Horizontal pendulum released from rest: a massless pivot node at the
/// origin held by `joint`, rigidly linked to a bob at `(L, 0, 0)`.
pub fn pendulum(joint: JointProperties) -> (Model, Pendulum) {
    let mut model = Model::new();
    let pivot = model
        .add_node(Node::frame(Frame::identity()).with_name("pivot"))
        .expect("pivot node");
    let bob_node = model
        .add_node(
            Node::frame(Frame::from_position(Vector3::new(LENGTH, 0.0, 0.0))).with_name("bob"),
        )
        .expect("bob node");

    model
        .add_element(ElementProperties::GroundJoint(joint), &[pivot])
        .expect("ground joint");
    model
        .add_element(RigidLinkProperties::default(), &[pivot, bob_node])
        .expect("rigid link");
    model.add_element(bob(), &[bob_node]).expect("rigid body");
    model.add_element(weight(), &[bob_node]).expect("weight");

    (
        model,
        Pendulum {
            pivot,
            bob: bob_node,
        },
    )
}

/// Kinetic plus gravitational energy of a bob node.
pub fn bob_energy(model: &Model, node: NodeId) -> f64 {
    let velocity = model.nodal_velocity(node).expect("bob velocity");
    let twist = Vector6::from_column_slice(velocity.as_slice());
    let height = model.frame(node).expect("bob frame").position.z;
    bob().kinetic_energy(&twist) + MASS * GRAVITY * height
}

/// Observer tracking the total energy of a set of bobs at every step.
#[derive(Debug, Default)]
pub struct EnergyMonitor {
    /// Bob nodes.
    pub bobs: Vec<NodeId>,
    /// Energy after each reported step, starting with the initial state.
    pub energy: Vec<f64>,
    /// Whether `finalize` was called.
    pub finalized: bool,
}

impl EnergyMonitor {
    pub fn new(bobs: Vec<NodeId>) -> Self {
        Self {
            bobs,
            ..Self::default()
        }
    }

    /// Largest deviation from the initial energy.
    pub fn drift(&self) -> f64 {
        let initial = self.energy.first().copied().unwrap_or_default();
        self.energy
            .iter()
            .map(|e| (e - initial).abs())
            .fold(0.0, f64::max)
    }
}

impl StepObserver for EnergyMonitor {
    fn log_step(&mut self, model: &Model, _report: &StepReport) -> Result<()> {
        let total = self.bobs.iter().map(|&node| bob_energy(model, node)).sum();
        self.energy.push(total);
        Ok(())
    }

    fn finalize(&mut self, _model: &Model, _summary: &SolveSummary) -> Result<()> {
        self.finalized = true;
        Ok(())
    }
}
