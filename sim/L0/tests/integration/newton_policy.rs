//! Newton Policy Tests.
//!
//! With an unreachable tolerance and a single correction per step, every
//! step ends unconverged. `Abort` turns that into an error, while
//! `AcceptUnconverged` keeps integrating and counts the steps.

use nalgebra::Vector3;
use sim_flex::{
    ConvergencePolicy, GeneralizedAlpha, JointProperties, SimError, TimeIntegrationParameters,
};

use crate::fixtures::pendulum;

fn strict(policy: ConvergencePolicy) -> GeneralizedAlpha {
    GeneralizedAlpha::new(
        TimeIntegrationParameters::default()
            .rho(0.8)
            .step_size(1e-2)
            .final_time(0.1)
            .nit_max(1)
            .tolerances(1e-15, 1e-15)
            .convergence_policy(policy),
    )
    .expect("valid parameters")
}

#[test]
fn test_abort_reports_the_first_unconverged_step() {
    let (mut model, _) = pendulum(JointProperties::hinge(Vector3::y()));
    let err = strict(ConvergencePolicy::Abort)
        .solve(&mut model)
        .expect_err("tolerance cannot be met");

    assert!(err.is_not_converged());
    assert!(!err.is_config_error());
    match err {
        SimError::NotConverged {
            step, iterations, ..
        } => {
            assert_eq!(step, 1);
            assert_eq!(iterations, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_accept_unconverged_counts_steps() {
    let (mut model, _) = pendulum(JointProperties::hinge(Vector3::y()));
    let summary = strict(ConvergencePolicy::AcceptUnconverged)
        .solve(&mut model)
        .expect("unconverged steps are accepted");

    assert_eq!(summary.steps, 10);
    assert_eq!(summary.unconverged_steps, 10);
    assert_eq!(summary.max_iterations, 1);
    assert_eq!(summary.total_iterations, 10);
    assert_eq!(summary.mean_iterations(), 1.0);
}

#[test]
fn test_iterations_stay_within_budget() {
    let (mut model, _) = pendulum(JointProperties::spherical());
    let integrator = GeneralizedAlpha::new(
        TimeIntegrationParameters::default()
            .rho(0.8)
            .step_size(1e-2)
            .final_time(0.2)
            .nit_max(6),
    )
    .expect("valid parameters");
    let summary = integrator.solve(&mut model).expect("dynamic solve");

    assert_eq!(summary.steps, 20);
    assert!(summary.max_iterations <= 6);
    assert!(summary.max_iterations >= 1);
    assert_eq!(summary.unconverged_steps, 0);
}
