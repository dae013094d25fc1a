//! Beam Tests.
//!
//! A cantilever of unit length with a square section, clamped at the root
//! and loaded at the tip by `P = 1 N`. The reference deflection adds the
//! shear contribution to the Euler-Bernoulli value:
//!
//! ```text
//! δ = P L³ / (3 E I) + P L / (G A_s) = 1.90489e-3 m
//! ```

use approx::assert_relative_eq;
use nalgebra::{Vector3, Vector6};
use sim_flex::{
    discretize_beam, BeamProperties, ClampedFrameProperties, CrossSection,
    ExternalForceProperties, Frame, GeneralizedAlpha, Model, NodeId, Node, SolverParameters,
    StaticSolver, TimeIntegrationParameters,
};

const YOUNG_MODULUS: f64 = 2.1e11;
const SHEAR_MODULUS: f64 = 8.0e10;
const SIDE: f64 = 0.01;
const REFERENCE_DEFLECTION: f64 = 1.90489e-3;

fn section() -> CrossSection {
    let poisson_ratio = YOUNG_MODULUS / (2.0 * SHEAR_MODULUS) - 1.0;
    CrossSection::square(SIDE, YOUNG_MODULUS, poisson_ratio, 7800.0)
}

/// Clamped beam from the origin to `(1, 0, 0)`, returning the tip node.
fn cantilever(segments: usize, tip_load: Option<Vector6<f64>>) -> (Model, NodeId) {
    let mut model = Model::new();
    let root = model.add_node(Node::frame(Frame::identity())).unwrap();
    let tip = model
        .add_node(Node::frame(Frame::from_position(Vector3::new(1.0, 0.0, 0.0))).with_name("tip"))
        .unwrap();
    discretize_beam(
        &mut model,
        root,
        tip,
        segments,
        BeamProperties::from_cross_section(&section()),
    )
    .unwrap();
    model.add_element(ClampedFrameProperties::default(), &[root]).unwrap();
    if let Some(load) = tip_load {
        model
            .add_element(ExternalForceProperties::constant(load), &[tip])
            .unwrap();
    }
    (model, tip)
}

// ============================================================================
// Statics
// ============================================================================

#[test]
fn test_cantilever_tip_deflection() {
    let load = Vector6::new(0.0, 0.0, -1.0, 0.0, 0.0, 0.0);
    let (mut model, tip) = cantilever(16, Some(load));

    let solver = StaticSolver::new(SolverParameters::default().step_size(1.0).final_time(1.0))
        .expect("valid parameters");
    let summary = solver.solve(&mut model).expect("static solve");

    assert_eq!(summary.steps, 1);
    assert_eq!(summary.unconverged_steps, 0);
    assert!(summary.total_iterations >= 1);

    let tip_frame = model.frame(tip).unwrap();
    let deflection = -tip_frame.position.z;
    let error = (deflection - REFERENCE_DEFLECTION).abs() / REFERENCE_DEFLECTION;
    assert!(
        error < 0.01,
        "tip deflection {deflection:e} differs from {REFERENCE_DEFLECTION:e} by {:.3}%",
        error * 100.0
    );
    assert!(tip_frame.position.y.abs() < 1e-12);
    assert_relative_eq!(tip_frame.position.x, 1.0, epsilon = 1e-5);
}

#[test]
fn test_cantilever_converges_under_mesh_refinement() {
    let load = Vector6::new(0.0, 0.0, -1.0, 0.0, 0.0, 0.0);
    let params = SolverParameters::default().step_size(1.0).final_time(1.0);
    let error = |segments| {
        let (mut model, tip) = cantilever(segments, Some(load));
        StaticSolver::new(params.clone()).unwrap().solve(&mut model).unwrap();
        let deflection = -model.frame(tip).unwrap().position.z;
        (deflection - REFERENCE_DEFLECTION).abs()
    };

    assert!(error(8) < error(2));
}

#[test]
fn test_load_stepping_reaches_the_same_equilibrium() {
    let load = Vector6::new(0.0, 0.0, -1.0, 0.0, 0.0, 0.0);
    let (mut single, tip_single) = cantilever(8, Some(load));
    let (mut stepped, tip_stepped) = cantilever(8, Some(load));

    StaticSolver::new(SolverParameters::default().step_size(1.0).final_time(1.0))
        .unwrap()
        .solve(&mut single)
        .unwrap();
    let summary = StaticSolver::new(SolverParameters::default().step_size(0.25).final_time(1.0))
        .unwrap()
        .solve(&mut stepped)
        .unwrap();

    assert_eq!(summary.steps, 4);
    assert_relative_eq!(summary.final_time, 1.0, epsilon = 1e-12);
    assert_relative_eq!(
        single.frame(tip_single).unwrap().position.z,
        stepped.frame(tip_stepped).unwrap().position.z,
        max_relative = 1e-4
    );
}

// ============================================================================
// Dynamics
// ============================================================================

#[test]
fn test_unloaded_clamped_beam_stays_at_rest() {
    let (mut model, tip) = cantilever(30, None);
    let integrator = GeneralizedAlpha::new(
        TimeIntegrationParameters::default()
            .rho(0.95)
            .step_size(1e-3)
            .final_time(0.5)
            .tolerances(1e-5, 1e-6),
    )
    .expect("valid parameters");
    let summary = integrator.solve(&mut model).expect("dynamic solve");

    assert_eq!(summary.steps, 500);
    assert_eq!(summary.total_iterations, 0);
    assert_eq!(summary.unconverged_steps, 0);
    assert_eq!(model.residual_norms(), (0.0, 0.0));
    assert_eq!(model.frame(tip).unwrap().position, Vector3::new(1.0, 0.0, 0.0));
    assert!(model.nodal_velocity(tip).unwrap().iter().all(|v| *v == 0.0));
}
