//! Servo Tests.
//!
//! A rigid body on a ground hinge about `z`, driven by a servo imposing the
//! hinge rotation `f(t) = 2t`.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use sim_flex::{
    ConstraintElement, ElementId, ElementKind, ElementProperties, Field, Frame, GeneralizedAlpha,
    JointProperties, Model, Node, NodeId, RigidBodyProperties, ServoConstraintProperties,
    TimeIntegrationParameters,
};

fn driven_hinge() -> (Model, NodeId, ElementId) {
    let mut model = Model::new();
    let node = model.add_node(Node::frame(Frame::identity())).unwrap();
    model
        .add_element(
            RigidBodyProperties::with_principal_inertia(1.0, Vector3::new(0.1, 0.1, 0.1)),
            &[node],
        )
        .unwrap();
    let hinge = model
        .add_element(ElementProperties::GroundJoint(JointProperties::hinge(Vector3::z())), &[node])
        .unwrap();
    let servo = model
        .add_element(ServoConstraintProperties::new(hinge, |t| 2.0 * t), &[])
        .unwrap();
    (model, node, servo)
}

/// Rotation angle about `z` of a frame rotating in the `xy` plane.
fn angle_about_z(frame: &Frame) -> f64 {
    let r = frame.rotation_matrix();
    r[(1, 0)].atan2(r[(0, 0)])
}

#[test]
fn test_servo_imposes_hinge_rotation() {
    let (mut model, node, servo) = driven_hinge();
    let integrator = GeneralizedAlpha::new(
        TimeIntegrationParameters::default()
            .rho(0.5)
            .step_size(1e-2)
            .final_time(0.5),
    )
    .expect("valid parameters");
    let summary = integrator.solve(&mut model).expect("dynamic solve");

    assert_eq!(summary.steps, 50);
    assert_eq!(summary.unconverged_steps, 0);

    let frame = model.frame(node).unwrap();
    assert_relative_eq!(angle_about_z(frame), 1.0, epsilon = 1e-4);
    assert_relative_eq!(frame.position.norm(), 0.0, epsilon = 1e-9);

    let imposed = match model.element(servo).unwrap().kind() {
        ElementKind::Constraint(ConstraintElement::ServoConstraint(servo), _) => {
            *servo.imposed_frame()
        }
        other => panic!("unexpected element kind {other:?}"),
    };
    assert_relative_eq!(angle_about_z(&imposed), 1.0, epsilon = 1e-4);
}

#[test]
fn test_servo_drives_the_relative_node() {
    let (mut model, _, servo) = driven_hinge();
    model.mesh().unwrap();

    let relative = model.element(ElementId::new(1)).unwrap().relative_node().unwrap();
    let servo = model.element(servo).unwrap();
    assert_eq!(servo.number_of_constraints(), 1);
    assert_eq!(servo.connectivity().nodes(Field::RelativeMotion), &[relative]);
}
