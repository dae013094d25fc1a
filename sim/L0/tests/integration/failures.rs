//! Failure Mode Tests.
//!
//! Numerical failures surface as errors naming the step where they occur.

use nalgebra::{Vector3, Vector6};
use sim_flex::{
    discretize_beam, BeamProperties, ClampedFrameProperties, CrossSection,
    ExternalForceProperties, Frame, GeneralizedAlpha, Model, Node, SimError, SolverParameters,
    StaticSolver, TimeIntegrationParameters,
};

#[test]
fn test_massless_free_node_is_singular_at_start() {
    let mut model = Model::new();
    let node = model.add_node(Node::frame(Frame::identity())).unwrap();
    model
        .add_element(
            ExternalForceProperties::constant(Vector6::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0)),
            &[node],
        )
        .unwrap();

    let err = GeneralizedAlpha::new(TimeIntegrationParameters::default())
        .unwrap()
        .solve(&mut model)
        .expect_err("no mass, no constraint");

    assert!(err.is_numerical());
    assert!(matches!(err, SimError::SingularMatrix { step: 0, .. }));
}

#[test]
fn test_excessive_load_breaks_the_rotation_parametrization() {
    let mut model = Model::new();
    let root = model.add_node(Node::frame(Frame::identity())).unwrap();
    let tip = model
        .add_node(Node::frame(Frame::from_position(Vector3::new(1.0, 0.0, 0.0))))
        .unwrap();
    let section = CrossSection::square(0.01, 2.1e11, 0.3, 7800.0);
    discretize_beam(&mut model, root, tip, 16, BeamProperties::from_cross_section(&section))
        .unwrap();
    model.add_element(ClampedFrameProperties::default(), &[root]).unwrap();
    model
        .add_element(
            ExternalForceProperties::constant(Vector6::new(0.0, 0.0, -1.0e6, 0.0, 0.0, 0.0)),
            &[tip],
        )
        .unwrap();

    let err = StaticSolver::new(SolverParameters::default().step_size(0.5).final_time(1.0))
        .unwrap()
        .solve(&mut model)
        .expect_err("tip rotation of the first correction is far beyond range");
    assert!(err.is_numerical());
    match err {
        SimError::Parametrization { step, time, source } => {
            assert_eq!(step, 1);
            assert_eq!(time, 0.5);
            assert!(source.is_out_of_range());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_invalid_parameters_are_rejected_before_solving() {
    assert!(StaticSolver::new(SolverParameters::default().step_size(0.0))
        .unwrap_err()
        .is_config_error());
    assert!(GeneralizedAlpha::new(TimeIntegrationParameters::default().rho(1.5))
        .unwrap_err()
        .is_config_error());
    assert!(GeneralizedAlpha::new(TimeIntegrationParameters::default().nit_max(0))
        .unwrap_err()
        .is_config_error());
}
