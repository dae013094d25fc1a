//! Pendulum Tests.
//!
//! Rigid bobs hung from massless joint nodes through rigid links. With
//! `ρ∞ = 1` the integrator has no numerical dissipation, so the total
//! energy must stay close to its initial value and the link lengths must
//! hold to the Newton tolerance.

use approx::assert_relative_eq;
use nalgebra::{DVector, Vector3};
use sim_flex::{
    AnalysisType, ElementProperties, Frame, GeneralizedAlpha, JointProperties, Model, NodalField,
    Node, Recorder, RigidLinkProperties, SensorNode, TimeIntegrationParameters,
};

use crate::fixtures::{bob, pendulum, weight, EnergyMonitor, GRAVITY, LENGTH, MASS};

fn conservative(step_size: f64, final_time: f64) -> GeneralizedAlpha {
    GeneralizedAlpha::new(
        TimeIntegrationParameters::default()
            .rho(1.0)
            .step_size(step_size)
            .final_time(final_time),
    )
    .expect("valid parameters")
}

// ============================================================================
// Single pendulum
// ============================================================================

#[test]
fn test_spherical_pendulum_conserves_energy() {
    let (mut model, nodes) = pendulum(JointProperties::spherical());
    let mut monitor = EnergyMonitor::new(vec![nodes.bob]);

    let summary = conservative(1e-3, 1.0)
        .solve_observed(&mut model, &mut monitor)
        .expect("dynamic solve");

    assert_eq!(summary.steps, 1000);
    assert_eq!(summary.unconverged_steps, 0);
    assert_eq!(monitor.energy.len(), 1001);
    assert!(monitor.finalized);

    let scale = MASS * GRAVITY * LENGTH;
    assert!(
        monitor.drift() < 1e-3 * scale,
        "energy drift {:e} exceeds {:e}",
        monitor.drift(),
        1e-3 * scale
    );

    // The bob is below the pivot and stays on the sphere of radius L.
    let position = model.frame(nodes.bob).unwrap().position;
    assert!(position.z < 0.0);
    assert_relative_eq!(position.norm(), LENGTH, epsilon = 1e-5);
    assert_relative_eq!(model.frame(nodes.pivot).unwrap().position.norm(), 0.0, epsilon = 1e-5);
}

#[test]
fn test_released_pendulum_starts_in_free_fall() {
    let (mut model, nodes) = pendulum(JointProperties::spherical());
    conservative(1e-3, 0.0).solve(&mut model).expect("initial state");

    // Released horizontally, the bob accelerates straight down. Its node
    // frame still coincides with the global axes.
    let acceleration = model.nodal_acceleration(nodes.bob).unwrap();
    assert!(acceleration[2] < 0.0);
    assert!(acceleration[2] > -GRAVITY);
    assert_relative_eq!(acceleration[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(acceleration[1], 0.0, epsilon = 1e-9);
}

#[test]
fn test_recorder_samples_every_periodic_step() {
    let (mut model, nodes) = pendulum(JointProperties::hinge(Vector3::y()));
    let mut recorder = Recorder::new(10)
        .with_sensor(SensorNode::new(nodes.bob, NodalField::Motion))
        .with_sensor(SensorNode::new(nodes.bob, NodalField::Velocity));

    conservative(1e-2, 0.5)
        .solve_observed(&mut model, &mut recorder)
        .expect("dynamic solve");

    let steps: Vec<usize> = recorder.records().iter().map(|r| r.step).collect();
    assert_eq!(steps, vec![0, 10, 20, 30, 40, 50]);
    assert_eq!(recorder.sensors()[0].group_name(&model).unwrap(), "bob");
    assert_eq!(recorder.sensors()[1].dataset_name(), NodalField::Velocity.label());

    let motion: Vec<_> = recorder.series(0).collect();
    assert_eq!(motion.len(), 6);
    assert_eq!(motion[0].0, 0.0);
    assert_eq!(motion[0].1.len(), 7);
    assert_eq!(motion[0].1[0], LENGTH);
    assert_relative_eq!(motion[5].0, 0.5, epsilon = 1e-12);

    // Planar motion about the hinge axis: no out-of-plane position.
    for (_, sample) in recorder.series(0) {
        assert!(sample[1].abs() < 1e-9);
    }
    let velocity: Vec<_> = recorder.series(1).collect();
    assert_eq!(velocity[0].1.len(), 6);
    assert!(velocity[0].1.iter().all(|v| *v == 0.0));
}

// ============================================================================
// Double pendulum
// ============================================================================

#[test]
fn test_double_pendulum_keeps_links_and_energy() {
    let mut model = Model::new();
    let pivot = model.add_node(Node::frame(Frame::identity())).unwrap();
    let first = model
        .add_node(Node::frame(Frame::from_position(Vector3::new(LENGTH, 0.0, 0.0))))
        .unwrap();
    let elbow = model
        .add_node(Node::frame(Frame::from_position(Vector3::new(LENGTH, 0.0, 0.0))))
        .unwrap();
    let second = model
        .add_node(Node::frame(Frame::from_position(Vector3::new(2.0 * LENGTH, 0.0, 0.0))))
        .unwrap();

    model
        .add_element(ElementProperties::GroundJoint(JointProperties::hinge(Vector3::y())), &[pivot])
        .unwrap();
    model.add_element(RigidLinkProperties::default(), &[pivot, first]).unwrap();
    model
        .add_element(
            ElementProperties::KinematicJoint(JointProperties::hinge(Vector3::y())),
            &[first, elbow],
        )
        .unwrap();
    model.add_element(RigidLinkProperties::default(), &[elbow, second]).unwrap();
    for bob_node in [first, second] {
        model.add_element(bob(), &[bob_node]).unwrap();
        model.add_element(weight(), &[bob_node]).unwrap();
    }

    let mut monitor = EnergyMonitor::new(vec![first, second]);
    let summary = conservative(1e-3, 0.5)
        .solve_observed(&mut model, &mut monitor)
        .expect("dynamic solve");
    assert_eq!(summary.unconverged_steps, 0);

    let p1 = model.frame(first).unwrap().position;
    let p2 = model.frame(second).unwrap().position;
    assert_relative_eq!(p1.norm(), LENGTH, epsilon = 1e-5);
    assert_relative_eq!((p2 - p1).norm(), LENGTH, epsilon = 1e-5);
    assert_relative_eq!(
        (model.frame(elbow).unwrap().position - p1).norm(),
        0.0,
        epsilon = 1e-5
    );
    assert!(p1.y.abs() < 1e-9 && p2.y.abs() < 1e-9);
    assert!(p1.z + p2.z < -0.1);

    let scale = 2.0 * MASS * GRAVITY * LENGTH;
    assert!(monitor.drift() < 1e-2 * scale, "energy drift {:e}", monitor.drift());
}

#[test]
fn test_initial_spin_is_fitted_to_the_joint() {
    // A node spinning about the hinge axis: the relative velocity of the
    // joint is the least-squares fit of the nodal twist.
    let mut model = Model::new();
    let pivot = model
        .add_node(
            Node::frame(Frame::identity())
                .with_initial_velocity(DVector::from_column_slice(&[0.0, 0.0, 0.0, 0.0, 0.0, 3.0])),
        )
        .unwrap();
    let joint = model
        .add_element(ElementProperties::GroundJoint(JointProperties::hinge(Vector3::z())), &[pivot])
        .unwrap();
    model.add_element(bob(), &[pivot]).unwrap();
    model.initialize(AnalysisType::Dynamic).unwrap();

    let relative = model.element(joint).unwrap().relative_node().unwrap();
    let velocity = model.nodal_velocity(relative).unwrap();
    assert_eq!(velocity.len(), 1);
    assert_relative_eq!(velocity[0], 3.0, epsilon = 1e-12);
    assert_eq!(model.nodal_velocity(pivot).unwrap()[5], 3.0);
}
