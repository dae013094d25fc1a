//! Solvers driving the Newton loop against the model.
//!
//! Both solvers share the same corrector: assemble, test convergence,
//! solve the iteration matrix for a correction, apply it, update the
//! configuration. They differ in the predictor and in how a correction
//! propagates to the velocity and acceleration.
//!
//! Convergence is tested on the force part (motion and relative-motion
//! rows) and on the constraint part separately, each relative to the sum of
//! the element norms of the same assembly:
//!
//! ```text
//! |r_f| <= tol_f (1 + ref_f)   and   |r_c| <= tol_c (1 + ref_c)
//! ```

mod generalized_alpha;
mod static_solver;

pub use generalized_alpha::{AlphaCoefficients, GeneralizedAlpha};
pub use static_solver::StaticSolver;

use nalgebra::DVector;
use sim_types::{ConvergencePolicy, Field, Result, SimError, SolverParameters};
use tracing::{debug, warn};

use crate::element::AssemblyCoefficients;
use crate::linalg;
use crate::model::{Model, SolutionState};
use crate::sensor::StepObserver;

/// Diagnostics of one accepted step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Step index, 0 for the initial state.
    pub step: usize,
    /// Time at the end of the step.
    pub time: f64,
    /// Newton corrections performed.
    pub iterations: usize,
    /// Whether the tolerances were met.
    pub converged: bool,
    /// Force residual norm at the accepted state.
    pub norm_res_forces: f64,
    /// Constraint residual norm at the accepted state.
    pub norm_res_constraints: f64,
    /// Mechanical power at the accepted state.
    pub mechanical_power: f64,
}

impl StepReport {
    fn initial(model: &Model) -> Self {
        let (norm_res_forces, norm_res_constraints) = model.residual_norms();
        Self {
            step: 0,
            time: model.time(),
            iterations: 0,
            converged: true,
            norm_res_forces,
            norm_res_constraints,
            mechanical_power: model.mechanical_power(),
        }
    }
}

/// Aggregate diagnostics of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveSummary {
    /// Number of time steps taken.
    pub steps: usize,
    /// Newton corrections over all steps.
    pub total_iterations: usize,
    /// Largest number of corrections in one step.
    pub max_iterations: usize,
    /// Steps accepted without meeting the tolerances.
    pub unconverged_steps: usize,
    /// Time at the end of the run.
    pub final_time: f64,
}

impl SolveSummary {
    /// Mean number of corrections per step.
    #[must_use]
    pub fn mean_iterations(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.total_iterations as f64 / self.steps as f64
        }
    }

    fn record(&mut self, report: &StepReport) {
        self.steps += 1;
        self.total_iterations += report.iterations;
        self.max_iterations = self.max_iterations.max(report.iterations);
        if !report.converged {
            self.unconverged_steps += 1;
        }
        self.final_time = report.time;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct NewtonOutcome {
    iterations: usize,
    converged: bool,
    norm_forces: f64,
    norm_constraints: f64,
}

fn singular(step: usize, model: &Model) -> SimError {
    SimError::SingularMatrix {
        step,
        time: model.time(),
    }
}

/// Solve the assembled system `S x = r` for the correction `x`.
fn solve_correction(model: &Model, step: usize) -> Result<DVector<f64>> {
    linalg::solve(&model.build_iteration_matrix(), model.residual()).map_err(|pivot| {
        debug!(step, column = pivot.column, "zero pivot in iteration matrix");
        singular(step, model)
    })
}

/// Newton corrector, bounded by `nit_max` corrections. `apply` subtracts a
/// correction from the unknowns.
///
/// Every correction is followed by an assembly, so the reported norms, the
/// convergence flag and the mechanical power describe the final state even
/// when the budget runs out.
fn newton<F>(
    model: &mut Model,
    coefs: &AssemblyCoefficients,
    params: &SolverParameters,
    step: usize,
    mut apply: F,
) -> Result<NewtonOutcome>
where
    F: FnMut(&mut SolutionState, &DVector<f64>),
{
    let time = model.time();
    let mut outcome = NewtonOutcome::default();
    loop {
        let reference = model
            .assemble_res_st(coefs)
            .map_err(|e| e.at_step(step, time))?;
        let (forces, constraints) = model.residual_norms();
        outcome.norm_forces = forces;
        outcome.norm_constraints = constraints;
        debug!(
            step,
            iteration = outcome.iterations,
            norm_res_forces = forces,
            ref_forces = reference.forces,
            norm_res_constraints = constraints,
            ref_constraints = reference.constraints,
            "newton iteration"
        );

        if forces <= params.tol_res_forces * (1.0 + reference.forces)
            && constraints <= params.tol_res_constraints * (1.0 + reference.constraints)
        {
            outcome.converged = true;
            return Ok(outcome);
        }
        if outcome.iterations >= params.nit_max {
            return Ok(outcome);
        }

        let correction = solve_correction(model, step)?;
        apply(model.state_mut(), &correction);
        model
            .kinematic_update(&Field::ALL)
            .map_err(|e| e.at_step(step, time))?;
        outcome.iterations += 1;
    }
}

/// Build the step report and apply the convergence policy.
fn conclude_step(
    model: &Model,
    params: &SolverParameters,
    step: usize,
    outcome: NewtonOutcome,
) -> Result<StepReport> {
    if !outcome.converged {
        match params.convergence_policy {
            ConvergencePolicy::Abort => {
                return Err(SimError::NotConverged {
                    step,
                    time: model.time(),
                    iterations: outcome.iterations,
                    norm_forces: outcome.norm_forces,
                    norm_constraints: outcome.norm_constraints,
                })
            }
            ConvergencePolicy::AcceptUnconverged => warn!(
                step,
                time = model.time(),
                iterations = outcome.iterations,
                norm_res_forces = outcome.norm_forces,
                norm_res_constraints = outcome.norm_constraints,
                "step accepted without convergence"
            ),
        }
    }
    Ok(StepReport {
        step,
        time: model.time(),
        iterations: outcome.iterations,
        converged: outcome.converged,
        norm_res_forces: outcome.norm_forces,
        norm_res_constraints: outcome.norm_constraints,
        mechanical_power: model.mechanical_power(),
    })
}

/// Observer used by the plain `solve` entry points.
struct NoObserver;

impl StepObserver for NoObserver {
    fn log_step(&mut self, _model: &Model, _report: &StepReport) -> Result<()> {
        Ok(())
    }
}
